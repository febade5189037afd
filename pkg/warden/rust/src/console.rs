// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::shutdown::Shutdown;
use crate::timings::Timings;
use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};

pub const FORCED_SHUTDOWN_NOTICE: &str = "Server will shutdown immediately.";

/// Something that can open an authenticated admin session to a local server.
#[async_trait]
pub trait Console: Send + Sync {
    async fn connect(&self, port: u16, password: &str) -> Result<Box<dyn ConsoleSession>>;
}

#[async_trait]
pub trait ConsoleSession: Send {
    async fn run(&mut self, command: &str) -> Result<String>;
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Notices are advisory; a failed send is logged and the caller carries on.
async fn send_notice(session: &mut dyn ConsoleSession, tag: &str, command: &str) {
    if let Err(e) = session.run(command).await {
        warn!("[{tag}] console command {command:?} failed: {e:#}");
    }
}

/// Send `announcerestart <n>` once per interval counting down to 1.
/// Returns false if shutdown was requested before the countdown finished.
pub async fn announce_restart(
    session: &mut dyn ConsoleSession,
    tag: &str,
    timings: &Timings,
    shutdown: &Shutdown,
) -> bool {
    for remaining in (1..=timings.announce_minutes).rev() {
        if shutdown.is_requested() {
            return false;
        }
        info!("[{tag}] Announce restart in {remaining} minutes.");
        send_notice(session, tag, &format!("announcerestart {remaining}")).await;
        if !shutdown.sleep(timings.announce_interval).await {
            return false;
        }
    }
    true
}

/// One immediate notice, then a fixed wait that the shutdown flag does not shorten.
pub async fn announce_forced_shutdown(
    session: &mut dyn ConsoleSession,
    tag: &str,
    timings: &Timings,
) {
    info!("[{tag}] Announce forced shutdown.");
    send_notice(session, tag, &format!("announce {FORCED_SHUTDOWN_NOTICE}")).await;
    tokio::time::sleep(timings.forced_notice_wait).await;
}

pub async fn close_session(session: Box<dyn ConsoleSession>, tag: &str) {
    if let Err(e) = session.close().await {
        warn!("[{tag}] failed to close console session: {e:#}");
    }
}
