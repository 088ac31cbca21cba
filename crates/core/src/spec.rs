// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and flow specs as received from the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel job name/group used by the status store for flow-level rows.
pub const NA_KEY: &str = "NA";

/// Per-flow SLA override, in seconds, carried in the job spec config.
pub const FLOW_SLA_SECONDS_KEY: &str = "flow.sla.seconds";

/// Immutable config of one job, chosen and frozen at orchestration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub uri: String,
    pub job_name: String,
    pub job_group: String,
    /// Free-form key/value config; recognized keys are parsed once at the
    /// boundary, everything else is passed through to the executor.
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl JobSpec {
    pub fn new(
        uri: impl Into<String>,
        job_group: impl Into<String>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            job_name: job_name.into(),
            job_group: job_group.into(),
            config: BTreeMap::new(),
        }
    }

    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.parse().ok())
    }
}

/// A catalog entry for a flow. Only the scheduling facet matters here: an
/// ad-hoc flow (no schedule) is removed from the catalog after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSpec {
    pub uri: String,
    #[serde(default)]
    pub schedule: Option<String>,
}

impl FlowSpec {
    pub fn adhoc(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            schedule: None,
        }
    }

    pub fn is_adhoc(&self) -> bool {
        self.schedule.is_none()
    }
}
