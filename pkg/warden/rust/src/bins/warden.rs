// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use warden::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let log_level = args.log_level();
    simple_logger::init_with_level(log_level)?;
    info!("warden starting (version {})", env!("CARGO_PKG_VERSION"));
    debug!("Log level set to: {log_level:?}");

    let code = cli::execute(args).await?;
    info!("warden exiting with status {code}");
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
