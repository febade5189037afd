// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse configuration {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("no instances configured")]
    Empty,
    #[error("[{instance}] Error: Missing parameter '{field}' for {instance}.")]
    MissingField { instance: String, field: &'static str },
    #[error("[{instance}] Error: Invalid parameter '{field}' for {instance}: {reason}.")]
    InvalidField {
        instance: String,
        field: &'static str,
        reason: String,
    },
    #[error("[{instance}] Error: Invalid RCon configuration for {instance}: port and password must both be set.")]
    PartialRcon { instance: String },
}

/// The update tool returned a non-success status.
#[derive(Error, Debug)]
#[error("update tool failed for {package_id} with status {code}")]
pub struct UpdateError {
    pub package_id: String,
    pub code: i32,
    pub output: String,
}
