// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Backups are suppressed before this local hour.
pub const BLACKOUT_END_HOUR: u32 = 3;

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Path of today's backup directory, if a backup is due at `now`.
pub fn backup_due(location: &Path, now: NaiveDateTime) -> Option<PathBuf> {
    if now.hour() < BLACKOUT_END_HOUR {
        return None;
    }
    let path = location.join(now.format("%Y-%m-%d").to_string());
    if path.exists() { None } else { Some(path) }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub copied: usize,
    pub failed: usize,
}

/// Create `target` and copy every source into it, keyed by the source's file name.
/// A failing source is logged and skipped; the directory still marks the day as done.
pub fn perform_backup(tag: &str, target: &Path, sources: &[PathBuf]) -> Result<BackupReport> {
    fs::create_dir_all(target)
        .with_context(|| format!("creating backup directory {}", target.display()))?;

    let mut report = BackupReport::default();
    for source in sources {
        match copy_source(source, target) {
            Ok(()) => report.copied += 1,
            Err(e) => {
                warn!("[{tag}] backup of {} failed: {e:#}", source.display());
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

fn copy_source(source: &Path, target: &Path) -> Result<()> {
    let name = source
        .file_name()
        .with_context(|| format!("{} has no file name", source.display()))?;
    let dest = target.join(name);

    if source.is_dir() {
        dircpy::copy_dir(source, &dest)
            .with_context(|| format!("copying {} to {}", source.display(), dest.display()))
    } else {
        fs::copy(source, &dest)
            .with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;
        Ok(())
    }
}
