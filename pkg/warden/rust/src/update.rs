// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::UpdateError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, info};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// External tool that knows whether a package has an update and how to install it.
///
/// A failing tool is reported as [`UpdateError`] (wrapped in `anyhow::Error`)
/// carrying the tool's exit status.
#[async_trait]
pub trait Updater: Send + Sync {
    async fn check(&self, package_id: &str) -> Result<bool>;
    async fn apply(&self, package_id: &str) -> Result<()>;
}

/// Report whether an update should be installed. `force` short-circuits the collaborator.
pub async fn is_update_available(
    updater: &dyn Updater,
    tag: &str,
    package_id: &str,
    force: bool,
) -> Result<bool> {
    if force {
        return Ok(true);
    }
    match updater.check(package_id).await {
        Ok(true) => {
            info!("[{tag}] Update available.");
            Ok(true)
        }
        Ok(false) => {
            info!("[{tag}] No update available.");
            Ok(false)
        }
        Err(e) => {
            error!("[{tag}] Error: Check for Update failed.");
            log_tool_output(tag, &e);
            Err(e)
        }
    }
}

pub async fn apply_update(updater: &dyn Updater, tag: &str, package_id: &str) -> Result<()> {
    info!("[{tag}] Update server.");
    if let Err(e) = updater.apply(package_id).await {
        error!("[{tag}] Error: Installation/Update failed.");
        log_tool_output(tag, &e);
        return Err(e);
    }
    Ok(())
}

fn log_tool_output(tag: &str, err: &anyhow::Error) {
    if let Some(update_err) = err.downcast_ref::<UpdateError>() {
        for line in update_err.output.lines() {
            error!("[{tag}] {line}");
        }
    }
}

/// Exit code a failed update should propagate, if `err` came from the update tool.
pub fn exit_code(err: &anyhow::Error) -> Option<i32> {
    err.downcast_ref::<UpdateError>().map(|e| e.code)
}

/// The SteamCMD console client, logged in anonymously.
#[derive(Debug, Clone)]
pub struct SteamCmd {
    program: PathBuf,
}

impl SteamCmd {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, package_id: &str, action: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args([
                "+@ShutdownOnFailedCommand",
                "1",
                "+@NoPromptForPassword",
                "1",
                "+login",
                "anonymous",
            ])
            .args(action)
            .arg("+quit")
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(UpdateError {
                package_id: package_id.to_string(),
                code: output.status.code().unwrap_or(1),
                output: stdout,
            }
            .into());
        }
        Ok(stdout)
    }
}

#[async_trait]
impl Updater for SteamCmd {
    async fn check(&self, package_id: &str) -> Result<bool> {
        let stdout = self
            .run(
                package_id,
                &["+app_info_update", "1", "+app_status", package_id],
            )
            .await?;
        Ok(status_reports_update(&stdout))
    }

    async fn apply(&self, package_id: &str) -> Result<()> {
        self.run(package_id, &["+app_update", package_id]).await?;
        Ok(())
    }
}

/// Only the first `install state` line counts.
fn status_reports_update(stdout: &str) -> bool {
    stdout
        .lines()
        .find(|line| line.contains("install state"))
        .is_some_and(|line| line.to_lowercase().contains("update"))
}
