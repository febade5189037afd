// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use log::warn;
use std::time::Duration;

pub const TIME_UNIT_ENV: &str = "WARDEN_TIME_UNIT_MS";

const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Every wait the supervisor performs, expressed in multiples of one time unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Time a freshly started server gets before its console is dialed.
    pub boot_grace: Duration,
    /// Pause between two update/backup evaluations.
    pub cycle: Duration,
    /// Pause between two restart countdown notices.
    pub announce_interval: Duration,
    /// Number of countdown notices (one per interval) before a graceful restart.
    pub announce_minutes: u32,
    /// Fixed wait after the immediate shutdown notice.
    pub forced_notice_wait: Duration,
    /// How long a SIGTERM'd server may take to exit before SIGKILL.
    pub stop_grace: Duration,
    /// How long to wait for a SIGKILL'd server before giving up on it.
    pub kill_wait: Duration,
}

impl Timings {
    /// Scale every interval by `unit`. A unit too large to scale falls back to
    /// the defaults.
    pub fn from_unit(unit: Duration) -> Self {
        Self::scaled(unit).unwrap_or_else(|| {
            warn!("time unit {unit:?} overflows the timings, using {DEFAULT_TIME_UNIT:?}");
            Self::default()
        })
    }

    fn scaled(unit: Duration) -> Option<Self> {
        Some(Self {
            boot_grace: unit.checked_mul(60)?,
            cycle: unit.checked_mul(120)?,
            announce_interval: unit.checked_mul(60)?,
            announce_minutes: 5,
            forced_notice_wait: unit.checked_mul(30)?,
            stop_grace: unit.checked_mul(30)?,
            kill_wait: unit.checked_mul(10)?,
        })
    }

    /// Read the unit length from `WARDEN_TIME_UNIT_MS`, falling back to one second.
    pub fn from_env() -> Self {
        let unit = match std::env::var(TIME_UNIT_ENV) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!("ignoring invalid {TIME_UNIT_ENV}={raw:?}");
                    DEFAULT_TIME_UNIT
                }
            },
            Err(_) => DEFAULT_TIME_UNIT,
        };
        Self::from_unit(unit)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            boot_grace: Duration::from_secs(60),
            cycle: Duration::from_secs(120),
            announce_interval: Duration::from_secs(60),
            announce_minutes: 5,
            forced_notice_wait: Duration::from_secs(30),
            stop_grace: Duration::from_secs(30),
            kill_wait: Duration::from_secs(10),
        }
    }
}
