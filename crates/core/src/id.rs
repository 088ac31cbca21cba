// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow and DAG identifiers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named pipeline: (group, name). One flow has many executions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId {
    pub flow_group: String,
    pub flow_name: String,
}

impl FlowId {
    pub fn new(flow_group: impl Into<String>, flow_name: impl Into<String>) -> Self {
        Self {
            flow_group: flow_group.into(),
            flow_name: flow_name.into(),
        }
    }

    /// The DagId of one execution of this flow.
    pub fn execution(&self, flow_execution_id: u64) -> DagId {
        DagId {
            flow_group: self.flow_group.clone(),
            flow_name: self.flow_name.clone(),
            flow_execution_id,
        }
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.flow_group, self.flow_name)
    }
}

/// Total key of one flow execution's DAG.
///
/// `flow_execution_id` is a monotonically assigned integer (epoch millis at
/// orchestration time); it doubles as the DAG's origin timestamp for
/// retention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DagId {
    pub flow_group: String,
    pub flow_name: String,
    pub flow_execution_id: u64,
}

impl DagId {
    pub fn new(
        flow_group: impl Into<String>,
        flow_name: impl Into<String>,
        flow_execution_id: u64,
    ) -> Self {
        Self {
            flow_group: flow_group.into(),
            flow_name: flow_name.into(),
            flow_execution_id,
        }
    }

    pub fn flow(&self) -> FlowId {
        FlowId {
            flow_group: self.flow_group.clone(),
            flow_name: self.flow_name.clone(),
        }
    }

    /// Parse the printed `group_name_execId` form.
    ///
    /// The execution id is taken from the right; the group is taken from the
    /// left, so the flow name may itself contain underscores but the group
    /// must not.
    pub fn parse(s: &str) -> Result<Self, DagIdParseError> {
        let (rest, exec) = s
            .rsplit_once('_')
            .ok_or_else(|| DagIdParseError::Malformed(s.to_string()))?;
        let flow_execution_id = exec
            .parse::<u64>()
            .map_err(|_| DagIdParseError::BadExecutionId(s.to_string()))?;
        let (group, name) = rest
            .split_once('_')
            .ok_or_else(|| DagIdParseError::Malformed(s.to_string()))?;
        if group.is_empty() || name.is_empty() {
            return Err(DagIdParseError::Malformed(s.to_string()));
        }
        Ok(Self {
            flow_group: group.to_string(),
            flow_name: name.to_string(),
            flow_execution_id,
        })
    }
}

impl std::fmt::Display for DagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.flow_group, self.flow_name, self.flow_execution_id
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DagIdParseError {
    #[error("malformed dag id: {0:?}")]
    Malformed(String),

    #[error("dag id has a non-numeric execution id: {0:?}")]
    BadExecutionId(String),
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
