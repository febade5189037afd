// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Keeps dedicated game servers installed, updated, backed up and running.
//!
//! One [`supervisor::Supervisor`] owns each configured server instance;
//! [`orchestrator::run_all`] runs them side by side until the shared
//! [`shutdown::Shutdown`] flag is raised.

// Correctness
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod backup;
pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod orchestrator;
pub mod process;
pub mod rcon;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod timings;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{InstanceConfig, load_config};
pub use orchestrator::{RunOutcome, run_all};
pub use shutdown::Shutdown;
pub use supervisor::{Collaborators, Supervisor};
