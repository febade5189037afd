// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::InstanceConfig;
use anyhow::{Context, Result};
use log::{info, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::time::{Duration, Instant, sleep, timeout};

pub const STDOUT_LOG: &str = "server-stdout";
pub const STDERR_LOG: &str = "server-stderr";

const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A spawned server owned by one supervision loop.
pub struct ManagedProcess {
    pub name: String,
    child: Child,
    pid: Option<u32>,
}

impl ManagedProcess {
    /// Spawn the instance's command in its working directory, appending its output
    /// to `server-stdout`/`server-stderr` there. Stdin stays open as a pipe.
    pub fn start(config: &InstanceConfig) -> Result<Self> {
        let dir = &config.working_directory;
        let stdout = open_log(&dir.join(STDOUT_LOG))?;
        let stderr = open_log(&dir.join(STDERR_LOG))?;

        let (program, args) = config
            .command
            .split_first()
            .with_context(|| format!("[{}] empty command", config.name))?;

        info!(
            "[{}] Start process in {} with: {}",
            config.name,
            dir.display(),
            config.command.join(" ")
        );

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&config.environment)
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            // Keep terminal Ctrl-C away from the server; the supervisor announces first.
            .process_group(0)
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .with_context(|| format!("[{}] failed to spawn: {program}", config.name))?;

        let pid = child.id();
        info!(
            "[{}] Process started (pid={})",
            config.name,
            pid.unwrap_or(0)
        );
        Ok(Self {
            name: config.name.clone(),
            child,
            pid,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking liveness check. Returns the exit status if the process is gone.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!("[{}] failed to poll process: {e}", self.name);
                None
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.exit_status().is_none()
    }

    /// The child leads its own process group, so the group id is its pid.
    fn group(&self) -> Option<Pid> {
        self.pid
            .and_then(|pid| i32::try_from(pid).ok())
            .map(Pid::from_raw)
    }

    /// Signal every process in the server's group, including children a
    /// launcher script left behind.
    fn signal_group(&self, sig: Signal) {
        if let Some(pgid) = self.group()
            && let Err(e) = signal::killpg(pgid, sig)
            && e != Errno::ESRCH
        {
            warn!("[{}] failed to send {sig}: {e}", self.name);
        }
    }

    fn group_alive(&self) -> bool {
        self.group()
            .is_some_and(|pgid| signal::killpg(pgid, None).is_ok())
    }

    /// Wait for the child and then for the rest of its group, up to `limit`.
    async fn wait_group(&mut self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        match timeout(limit, self.child.wait()).await {
            Ok(Ok(status)) => info!("[{}] exited with {status}", self.name),
            Ok(Err(e)) => {
                warn!("[{}] failed to wait for exit: {e}", self.name);
                return false;
            }
            Err(_) => return false,
        }
        while self.group_alive() {
            if Instant::now() >= deadline {
                warn!("[{}] launcher exited, its children are still running", self.name);
                return false;
            }
            sleep(GROUP_POLL_INTERVAL).await;
        }
        true
    }

    /// SIGTERM the process group, wait up to `grace`, then SIGKILL it. If the
    /// child already exited only its leftover group members are killed.
    pub async fn terminate(&mut self, grace: Duration, kill_wait: Duration) {
        if let Some(status) = self.exit_status() {
            info!("[{}] process already exited with {status}", self.name);
            if self.group_alive() {
                self.signal_group(Signal::SIGKILL);
            }
            return;
        }

        info!("[{}] terminate process.", self.name);
        self.signal_group(Signal::SIGTERM);
        if self.wait_group(grace).await {
            return;
        }
        warn!(
            "[{}] stop timeout ({}ms) reached, sending SIGKILL",
            self.name,
            grace.as_millis()
        );

        info!("[{}] Kill process.", self.name);
        self.signal_group(Signal::SIGKILL);
        if !self.wait_group(kill_wait).await {
            warn!("[{}] still running after SIGKILL, giving up", self.name);
        }
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        // kill_on_drop only reaches the direct child.
        if self.group_alive() {
            self.signal_group(Signal::SIGKILL);
        }
    }
}

fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))
}
