// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Worker launched, nothing done yet.
    Idle,
    /// Server is being spawned and given its boot grace period.
    Starting,
    /// Server is alive and being polled every cycle.
    Running,
    /// Countdown notices are being sent over the console.
    AnnouncingRestart,
    /// Server is being terminated.
    Stopping,
    /// Update is being applied while the server is down.
    Updating,
    /// Backup is being taken while the server is down.
    BackingUp,
    /// Terminal; the worker returns.
    Stopped,
}

impl SupervisorState {
    pub fn is_terminal(self) -> bool {
        self == SupervisorState::Stopped
    }

    pub(crate) fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::*;
        matches!(
            (self, next),
            (Idle, BackingUp)
                | (Idle, Updating)
                | (Idle, Starting)
                | (Idle, Stopped)
                | (Starting, Running)
                | (Starting, Stopping)
                | (Running, AnnouncingRestart)
                | (Running, Stopping)
                | (Running, Starting)
                | (AnnouncingRestart, Stopping)
                | (Stopping, BackingUp)
                | (Stopping, Updating)
                | (Stopping, Starting)
                | (Stopping, Stopped)
                | (BackingUp, Updating)
                | (BackingUp, Starting)
                | (BackingUp, Stopped)
                | (Updating, Starting)
                | (Updating, BackingUp)
                | (Updating, Stopping)
                | (Updating, Stopped)
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Idle => write!(f, "idle"),
            SupervisorState::Starting => write!(f, "starting"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::AnnouncingRestart => write!(f, "announcing-restart"),
            SupervisorState::Stopping => write!(f, "stopping"),
            SupervisorState::Updating => write!(f, "updating"),
            SupervisorState::BackingUp => write!(f, "backing-up"),
            SupervisorState::Stopped => write!(f, "stopped"),
        }
    }
}
