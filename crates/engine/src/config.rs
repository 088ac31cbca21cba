// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DagManager configuration.

use fd_core::FailureOption;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Recognised configuration, with defaults matching a small deployment.
/// Loadable from TOML or constructed directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DagManagerConfig {
    /// Number of worker shards.
    pub num_threads: usize,
    /// Cadence of each shard's pass, in seconds.
    pub polling_interval_secs: u64,
    /// State store implementation name (`fs` or `memory`).
    pub dag_state_store: String,
    pub dag_state_store_dir: PathBuf,
    /// Overlay directory for the failed-dag store (same implementation).
    pub failed_dag_state_store_dir: PathBuf,
    /// Failed DAGs older than this are purged; 0 disables the sweep.
    pub failed_dag_retention_secs: u64,
    pub retention_polling_minutes: u64,
    /// How long a job may sit in ORCHESTRATED before it is killed as an
    /// orphan. Also bounds how long a submission acceptance is awaited.
    pub job_start_sla_secs: u64,
    /// Default flow SLA; a per-flow `flow.sla.seconds` config overrides it.
    pub flow_sla_secs: Option<u64>,
    /// Applied when a DAG carries no failure option of its own.
    pub default_failure_option: FailureOption,
    /// How many recent executions `stop_dag` resolves for a flow.
    pub stop_flow_execution_limit: usize,
    /// How long to wait for the status store to confirm a terminal flow
    /// status before re-emitting the flow event.
    pub flow_status_tolerance_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl Default for DagManagerConfig {
    fn default() -> Self {
        Self {
            num_threads: 3,
            polling_interval_secs: 10,
            dag_state_store: "fs".to_string(),
            dag_state_store_dir: PathBuf::from("dag-state-store"),
            failed_dag_state_store_dir: PathBuf::from("failed-dag-state-store"),
            failed_dag_retention_secs: 7 * 24 * 60 * 60,
            retention_polling_minutes: 60,
            job_start_sla_secs: 600,
            flow_sla_secs: None,
            default_failure_option: FailureOption::FinishAllPossible,
            stop_flow_execution_limit: 10,
            flow_status_tolerance_secs: 300,
            shutdown_timeout_secs: 30,
        }
    }
}

impl DagManagerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn job_start_sla(&self) -> Duration {
        Duration::from_secs(self.job_start_sla_secs)
    }

    /// `None` when retention is disabled.
    pub fn retention(&self) -> Option<Duration> {
        (self.failed_dag_retention_secs > 0)
            .then(|| Duration::from_secs(self.failed_dag_retention_secs))
    }

    pub fn retention_polling(&self) -> Duration {
        Duration::from_secs(self.retention_polling_minutes * 60)
    }

    pub fn flow_status_tolerance(&self) -> Duration {
        Duration::from_secs(self.flow_status_tolerance_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
