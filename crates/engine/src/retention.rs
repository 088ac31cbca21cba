// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic purge of failed DAGs older than the retention bound.

use crate::context::EngineCtx;
use fd_core::Clock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct FailedDagRetention<C: Clock> {
    ctx: Arc<EngineCtx<C>>,
}

impl<C: Clock> FailedDagRetention<C> {
    pub fn new(ctx: Arc<EngineCtx<C>>) -> Self {
        Self { ctx }
    }

    /// One sweep. The `flow_execution_id` doubles as the DAG's origin
    /// timestamp, so age is computed directly from the key.
    pub fn run_once(&self) {
        let Some(retention) = self.ctx.config.retention() else {
            debug!("failed-dag retention disabled");
            return;
        };
        let retention_ms = retention.as_millis() as u64;
        let now_ms = self.ctx.clock.epoch_ms();

        for dag_id in self.ctx.failed_dag_ids_snapshot() {
            if dag_id.flow_execution_id.saturating_add(retention_ms) >= now_ms {
                continue;
            }
            match self.ctx.failed_store.clean_up(&dag_id) {
                Ok(()) => {
                    self.ctx.remove_failed_dag_id(&dag_id);
                    info!(dag_id = %dag_id, "purged failed dag past retention");
                }
                Err(e) => warn!(dag_id = %dag_id, error = %e, "failed-dag purge failed"),
            }
        }
    }
}

/// Scheduled loop of the retention task.
pub(crate) async fn retention_loop<C: Clock>(
    retention: FailedDagRetention<C>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(retention.ctx.config.retention_polling());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => retention.run_once(),
        }
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
