// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! In-memory stand-ins for the external collaborators.

use crate::backup::Clock;
use crate::console::{Console, ConsoleSession};
use crate::errors::UpdateError;
use crate::timings::Timings;
use crate::update::Updater;
use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn fast_timings() -> Timings {
    Timings {
        boot_grace: Duration::from_millis(20),
        cycle: Duration::from_millis(50),
        announce_interval: Duration::from_millis(10),
        announce_minutes: 5,
        forced_notice_wait: Duration::from_millis(20),
        stop_grace: Duration::from_secs(2),
        kill_wait: Duration::from_secs(2),
    }
}

/// Mid-day, outside the backup blackout window.
pub(crate) fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

pub(crate) struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub(crate) fn new(now: NaiveDateTime) -> Self {
        Self(Mutex::new(now))
    }

    pub(crate) fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
pub(crate) struct FakeUpdater {
    checks: AtomicUsize,
    applies: AtomicUsize,
    /// 1-based check numbers that report an update.
    updates_at: Vec<usize>,
    fail_code: Option<i32>,
    /// Runs inside the given check, before it is answered.
    before_check: Option<(usize, Hook)>,
    before_apply: Option<Hook>,
}

type Hook = Box<dyn Fn() + Send + Sync>;

impl FakeUpdater {
    pub(crate) fn never() -> Self {
        Self::default()
    }

    pub(crate) fn with_updates_at(checks: &[usize]) -> Self {
        Self {
            updates_at: checks.to_vec(),
            ..Self::default()
        }
    }

    pub(crate) fn failing(code: i32) -> Self {
        Self {
            fail_code: Some(code),
            ..Self::default()
        }
    }

    pub(crate) fn before_check(mut self, n: usize, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_check = Some((n, Box::new(hook)));
        self
    }

    pub(crate) fn before_apply(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_apply = Some(Box::new(hook));
        self
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub(crate) fn applies(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }

    fn failure(&self, package_id: &str) -> Result<()> {
        match self.fail_code {
            Some(code) => Err(UpdateError {
                package_id: package_id.to_string(),
                code,
                output: "tool exploded".to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Updater for FakeUpdater {
    async fn check(&self, package_id: &str) -> Result<bool> {
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, hook)) = &self.before_check
            && *at == n
        {
            hook();
        }
        self.failure(package_id)?;
        Ok(self.updates_at.contains(&n))
    }

    async fn apply(&self, package_id: &str) -> Result<()> {
        if let Some(hook) = &self.before_apply {
            hook();
        }
        self.applies.fetch_add(1, Ordering::SeqCst);
        self.failure(package_id)
    }
}

#[derive(Default)]
struct ConsoleState {
    commands: Mutex<Vec<String>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    fail_connect: AtomicBool,
    fail_commands: AtomicBool,
    fail_close: AtomicBool,
}

#[derive(Clone, Default)]
pub(crate) struct FakeConsole {
    state: Arc<ConsoleState>,
}

impl FakeConsole {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn refuse_connections(&self) {
        self.state.fail_connect.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_commands(&self) {
        self.state.fail_commands.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_close(&self) {
        self.state.fail_close.store(true, Ordering::SeqCst);
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Console for FakeConsole {
    async fn connect(&self, _port: u16, _password: &str) -> Result<Box<dyn ConsoleSession>> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<ConsoleState>,
}

#[async_trait]
impl ConsoleSession for FakeSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        self.state
            .commands
            .lock()
            .unwrap()
            .push(command.to_string());
        if self.state.fail_commands.load(Ordering::SeqCst) {
            bail!("broken pipe");
        }
        Ok(String::new())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            bail!("already closed");
        }
        Ok(())
    }
}
