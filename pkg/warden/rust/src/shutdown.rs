// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;
use log::{info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

/// Process-wide shutdown flag. Clones share the same flag; once requested it never clears.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns false if shutdown was already requested.
    pub fn request(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }

    /// Sleep for `duration` unless shutdown is requested first.
    /// Returns true if the full duration elapsed with shutdown still unrequested.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_requested() {
            return false;
        }
        tokio::select! {
            _ = sleep(duration) => !self.is_requested(),
            _ = self.token.cancelled() => false,
        }
    }

    /// Route SIGINT, SIGTERM and SIGHUP into the shutdown flag.
    pub fn install_signals(&self) -> Result<()> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let shutdown = self.clone();

        tokio::spawn(async move {
            loop {
                let name = tokio::select! {
                    _ = sigint.recv() => "SIGINT",
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sighup.recv() => "SIGHUP",
                };
                if shutdown.request() {
                    info!("[!] received {name}, shutting down");
                } else {
                    warn!("[!] received {name}, already shutting down");
                }
            }
        });
        Ok(())
    }
}
