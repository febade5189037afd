// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::backup::{Clock, backup_due, perform_backup};
use crate::config::InstanceConfig;
use crate::console::{
    Console, ConsoleSession, announce_forced_shutdown, announce_restart, close_session,
};
use crate::process::ManagedProcess;
use crate::shutdown::Shutdown;
use crate::state::SupervisorState;
use crate::timings::Timings;
use crate::update::{Updater, apply_update, is_update_available};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// External collaborators shared by every worker.
#[derive(Clone)]
pub struct Collaborators {
    pub updater: Arc<dyn Updater>,
    pub console: Arc<dyn Console>,
    pub clock: Arc<dyn Clock>,
    pub timings: Timings,
}

/// Drives one instance through update, backup, run, restart and shutdown.
pub struct Supervisor {
    config: InstanceConfig,
    deps: Collaborators,
    shutdown: Shutdown,
    state: SupervisorState,
    process: Option<ManagedProcess>,
    session: Option<Box<dyn ConsoleSession>>,
}

impl Supervisor {
    pub fn new(config: InstanceConfig, deps: Collaborators, shutdown: Shutdown) -> Self {
        Self {
            config,
            deps,
            shutdown,
            state: SupervisorState::Idle,
            process: None,
            session: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Run until shutdown is requested or a fatal error occurs. Either way the
    /// server is down when this returns.
    pub async fn run(&mut self) -> Result<()> {
        self.log_config();
        let result = self.supervise().await;
        match &result {
            Ok(()) => info!("[{}] Game process finished.", self.name()),
            Err(e) => {
                error!("[{}] Error: {e:#}", self.name());
                self.teardown().await;
            }
        }
        self.transition(SupervisorState::Stopped);
        result
    }

    fn log_config(&self) {
        let name = self.name();
        info!("[{name}] Application ID: {}", self.config.package_id);
        info!("[{name}] Command: {}", self.config.command.join(" "));
        info!(
            "[{name}] Working Directory: {}",
            self.config.working_directory.display()
        );
        info!("[{name}] Environment: {:?}", self.config.environment);
        match &self.config.rcon {
            Some(rcon) => info!("[{name}] Rcon Port: {} (password <set>)", rcon.port),
            None => info!("[{name}] Rcon: disabled"),
        }
        match &self.config.backup {
            Some(backup) => info!("[{name}] Backup Location: {}", backup.location.display()),
            None => info!("[{name}] Backup: disabled"),
        }
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!(
                "[{}] unexpected transition {} -> {next}",
                self.name(),
                self.state
            );
        }
        debug!("[{}] {} -> {next}", self.name(), self.state);
        self.state = next;
    }

    async fn supervise(&mut self) -> Result<()> {
        self.backup_if_due().await?;

        // The first cycle always installs, so a cold start runs the latest build.
        let mut force = true;
        while !self.shutdown.is_requested() {
            self.reap_exited().await;

            let update = is_update_available(
                self.deps.updater.as_ref(),
                &self.config.name,
                &self.config.package_id,
                force,
            )
            .await?;
            force = false;
            let backup = self.due_backup().is_some();

            if update || backup {
                self.stop_server().await;
                if !self.shutdown.is_requested() && backup {
                    self.backup_if_due().await?;
                }
                if !self.shutdown.is_requested() && update {
                    self.transition(SupervisorState::Updating);
                    apply_update(
                        self.deps.updater.as_ref(),
                        &self.config.name,
                        &self.config.package_id,
                    )
                    .await?;
                }
            }

            if self.process.is_none() && !self.shutdown.is_requested() {
                self.start_server().await?;
            }

            self.shutdown.sleep(self.deps.timings.cycle).await;
        }

        self.stop_server().await;
        self.backup_if_due().await
    }

    async fn start_server(&mut self) -> Result<()> {
        self.transition(SupervisorState::Starting);
        info!("[{}] Start server.", self.name());
        self.process = Some(ManagedProcess::start(&self.config)?);

        if !self.shutdown.sleep(self.deps.timings.boot_grace).await {
            return Ok(());
        }

        if let Some(rcon) = &self.config.rcon {
            let session = self
                .deps
                .console
                .connect(rcon.port, &rcon.password)
                .await
                .with_context(|| format!("remote console on port {} unreachable", rcon.port))?;
            info!("[{}] Remote console connected.", self.name());
            self.session = Some(session);
        }
        self.transition(SupervisorState::Running);
        Ok(())
    }

    /// Announce (gracefully, or forced once shutdown is requested), close the
    /// console and terminate the server. No-op without a server.
    async fn stop_server(&mut self) {
        let Some(mut process) = self.process.take() else {
            return;
        };
        let timings = self.deps.timings;
        let name = self.config.name.clone();

        if let Some(mut session) = self.session.take() {
            let mut announced = false;
            if !self.shutdown.is_requested() {
                self.transition(SupervisorState::AnnouncingRestart);
                announced =
                    announce_restart(session.as_mut(), &name, &timings, &self.shutdown).await;
            }
            if !announced {
                announce_forced_shutdown(session.as_mut(), &name, &timings).await;
            }
            close_session(session, &name).await;
        }

        self.transition(SupervisorState::Stopping);
        info!("[{name}] Shutdown server.");
        process.terminate(timings.stop_grace, timings.kill_wait).await;
    }

    /// Drop a server that exited on its own so the loop restarts it.
    async fn reap_exited(&mut self) {
        let Some(status) = self.process.as_mut().and_then(ManagedProcess::exit_status) else {
            return;
        };
        warn!(
            "[{}] process exited unexpectedly with {status}",
            self.name()
        );
        self.process = None;
        if let Some(session) = self.session.take() {
            close_session(session, &self.config.name).await;
        }
    }

    /// Target directory of today's backup, if one is still owed.
    fn due_backup(&self) -> Option<PathBuf> {
        let spec = self.config.backup.as_ref()?;
        backup_due(&spec.location, self.deps.clock.now())
    }

    async fn backup_if_due(&mut self) -> Result<()> {
        let (Some(target), Some(spec)) = (self.due_backup(), self.config.backup.as_ref()) else {
            return Ok(());
        };
        let sources = spec.data.clone();
        self.transition(SupervisorState::BackingUp);
        info!("[{}] Creating backup in {}.", self.name(), target.display());

        let tag = self.config.name.clone();
        let report = tokio::task::spawn_blocking(move || perform_backup(&tag, &target, &sources))
            .await
            .context("backup task panicked")??;
        info!(
            "[{}] Backup finished ({} copied, {} failed).",
            self.name(),
            report.copied,
            report.failed
        );
        Ok(())
    }

    /// Close the console and kill the server without announcements.
    async fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            close_session(session, &self.config.name).await;
        }
        if let Some(mut process) = self.process.take() {
            self.transition(SupervisorState::Stopping);
            let timings = self.deps.timings;
            process.terminate(timings.stop_grace, timings.kill_wait).await;
        }
    }
}
