// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::backup::LocalClock;
use crate::config::{InstanceConfig, RawBackup, RawInstance, RawRcon, Scalar, load_config};
use crate::errors::ConfigError;
use crate::orchestrator::run_all;
use crate::rcon::RconConsole;
use crate::shutdown::Shutdown;
use crate::supervisor::Collaborators;
use crate::timings::Timings;
use crate::update::{self, SteamCmd, Updater, apply_update, is_update_available};
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{Level, error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const LOG_LEVEL_ENV: &str = "WARDEN_LOG_LEVEL";

/// Tag for lines not tied to a configured instance.
const CLI_TAG: &str = "!";

#[derive(Parser, Debug)]
#[command(name = "warden", version)]
#[command(about = "Keeps dedicated game servers installed, updated, backed up and running", long_about = None)]
pub struct Cli {
    /// Path to the SteamCMD binary
    #[arg(long, global = true, env = "WARDEN_STEAMCMD", default_value = "steamcmd")]
    pub steamcmd: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install (or reinstall) a package
    Install { package_id: String },
    /// Install a package if the update tool reports a newer build
    Update {
        /// Skip the check and install unconditionally
        #[arg(short, long)]
        force: bool,
        package_id: String,
    },
    /// Supervise the servers in a configuration file, or a single server
    /// whose command follows the package id
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Configuration file (JSON or YAML), or a package id when a command follows
    pub target: String,

    /// Instance name in single-server mode (defaults to the package id)
    #[arg(long)]
    pub name: Option<String>,

    /// Working directory of the server
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    #[arg(long)]
    pub rcon_port: Option<i64>,

    #[arg(long)]
    pub rcon_pw: Option<String>,

    /// Directory that receives the daily backups; backups are off without it
    #[arg(long)]
    pub backup_location: Option<PathBuf>,

    /// File or directory to back up; repeatable
    #[arg(long = "backup-data")]
    pub backup_data: Vec<PathBuf>,

    /// Server command and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Validated instances: loaded from the file, or built from the flags.
    pub fn instances(self) -> Result<Vec<InstanceConfig>, ConfigError> {
        if self.command.is_empty() {
            return load_config(Path::new(&self.target));
        }

        let name = self.name.unwrap_or_else(|| self.target.clone());
        let rcon = (self.rcon_port.is_some() || self.rcon_pw.is_some()).then(|| RawRcon {
            port: self.rcon_port,
            password: self.rcon_pw.map(Scalar::String),
        });
        let raw = RawInstance {
            package_id: Some(Scalar::String(self.target)),
            command: Some(self.command),
            working_directory: self.cwd,
            environment: Default::default(),
            rcon,
            backup: (self.backup_location.is_some() || !self.backup_data.is_empty()).then(|| {
                RawBackup {
                    location: self.backup_location,
                    data: (!self.backup_data.is_empty()).then_some(self.backup_data),
                }
            }),
        };
        Ok(vec![raw.validate_standalone(&name)?])
    }
}

impl Cli {
    pub fn log_level(&self) -> Level {
        log_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref(), self.verbose)
    }
}

fn log_level(env_override: Option<&str>, verbose: bool) -> Level {
    env_override
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(if verbose { Level::Debug } else { Level::Info })
}

/// Run the selected subcommand and return the process exit code.
pub async fn execute(cli: Cli) -> Result<i32> {
    let updater = SteamCmd::new(cli.steamcmd);
    match cli.command {
        Command::Install { package_id } => Ok(install(&updater, &package_id).await),
        Command::Update { force, package_id } => Ok(update(&updater, &package_id, force).await),
        Command::Run(args) => run(args, updater).await,
    }
}

async fn install(updater: &dyn Updater, package_id: &str) -> i32 {
    match apply_update(updater, CLI_TAG, package_id).await {
        Ok(()) => {
            info!("[+] App {package_id} installed.");
            0
        }
        Err(e) => failure_code(&e),
    }
}

async fn update(updater: &dyn Updater, package_id: &str, force: bool) -> i32 {
    match is_update_available(updater, CLI_TAG, package_id, force).await {
        Ok(false) => {
            info!("[+] No update available.");
            0
        }
        Ok(true) => match apply_update(updater, CLI_TAG, package_id).await {
            Ok(()) => {
                info!("[+] App {package_id} updated.");
                0
            }
            Err(e) => failure_code(&e),
        },
        Err(e) => failure_code(&e),
    }
}

fn failure_code(err: &anyhow::Error) -> i32 {
    error!("[{CLI_TAG}] {err:#}");
    update::exit_code(err).unwrap_or(1)
}

async fn run(args: RunArgs, updater: SteamCmd) -> Result<i32> {
    let instances = match args.instances() {
        Ok(instances) => instances,
        Err(e) => {
            error!("{e}");
            return Ok(1);
        }
    };

    let shutdown = Shutdown::new();
    shutdown.install_signals()?;

    let deps = Collaborators {
        updater: Arc::new(updater),
        console: Arc::new(RconConsole::default()),
        clock: Arc::new(LocalClock),
        timings: Timings::from_env(),
    };
    let outcome = run_all(instances, deps, shutdown).await;
    Ok(outcome.exit_code())
}
