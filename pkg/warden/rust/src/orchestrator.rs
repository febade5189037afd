// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::InstanceConfig;
use crate::shutdown::Shutdown;
use crate::supervisor::{Collaborators, Supervisor};
use crate::update;
use anyhow::anyhow;
use log::{error, info};

/// Worker failures, in instance order.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub failures: Vec<(String, anyhow::Error)>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 0 on success; the update tool's status if a worker died on an update; 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() {
            return 0;
        }
        self.failures
            .iter()
            .find_map(|(_, e)| update::exit_code(e))
            .unwrap_or(1)
    }
}

/// Run one supervisor per instance and wait for all of them. A failing worker
/// does not stop the others; only the shared shutdown flag does.
pub async fn run_all(
    instances: Vec<InstanceConfig>,
    deps: Collaborators,
    shutdown: Shutdown,
) -> RunOutcome {
    info!("supervising {} instance(s)", instances.len());

    let workers: Vec<_> = instances
        .into_iter()
        .map(|config| {
            let name = config.name.clone();
            let mut supervisor = Supervisor::new(config, deps.clone(), shutdown.clone());
            let handle = tokio::spawn(async move { supervisor.run().await });
            (name, handle)
        })
        .collect();

    let mut outcome = RunOutcome::default();
    for (name, handle) in workers {
        match handle.await {
            Ok(Ok(())) => info!("[{name}] worker finished"),
            // Already logged by the supervisor.
            Ok(Err(e)) => outcome.failures.push((name, e)),
            Err(e) => {
                error!("[{name}] worker aborted: {e}");
                outcome.failures.push((name, anyhow!("worker aborted: {e}")));
            }
        }
    }
    outcome
}
