// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared with other crates' tests.

use crate::dag::{Dag, JobExecutionPlan, JobNode};
use crate::id::DagId;
use crate::spec::{JobSpec, FLOW_SLA_SECONDS_KEY};
use crate::status::FailureOption;

/// Executor URI used by all test DAGs (and the test topology maps).
pub const TEST_EXECUTOR_URI: &str = "executor://local";

/// Builds small DAGs for tests: singles, chains, diamonds.
pub struct DagBuilder {
    flow_group: String,
    flow_name: String,
    execution_id: u64,
    failure_option: Option<FailureOption>,
    executor_uri: String,
    max_attempts: u32,
    flow_sla_secs: Option<u64>,
    jobs: Vec<(String, Vec<String>)>,
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self {
            flow_group: "group0".to_string(),
            flow_name: "flow0".to_string(),
            execution_id: 100,
            failure_option: None,
            executor_uri: TEST_EXECUTOR_URI.to_string(),
            max_attempts: 3,
            flow_sla_secs: None,
            jobs: Vec::new(),
        }
    }
}

impl DagBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow_group(mut self, v: impl Into<String>) -> Self {
        self.flow_group = v.into();
        self
    }

    pub fn flow_name(mut self, v: impl Into<String>) -> Self {
        self.flow_name = v.into();
        self
    }

    pub fn execution_id(mut self, v: u64) -> Self {
        self.execution_id = v;
        self
    }

    pub fn failure_option(mut self, v: FailureOption) -> Self {
        self.failure_option = Some(v);
        self
    }

    pub fn executor_uri(mut self, v: impl Into<String>) -> Self {
        self.executor_uri = v.into();
        self
    }

    pub fn max_attempts(mut self, v: u32) -> Self {
        self.max_attempts = v;
        self
    }

    pub fn flow_sla_secs(mut self, v: u64) -> Self {
        self.flow_sla_secs = Some(v);
        self
    }

    /// Add a job with the given parents (parents must be added first).
    pub fn job(mut self, name: impl Into<String>, parents: &[&str]) -> Self {
        self.jobs.push((
            name.into(),
            parents.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    pub fn build(self) -> Dag {
        let id = DagId::new(self.flow_group.clone(), self.flow_name.clone(), self.execution_id);
        let mut dag = Dag::new(id);
        dag.failure_option = self.failure_option;
        for (i, (name, parents)) in self.jobs.into_iter().enumerate() {
            let mut spec = JobSpec::new(
                format!("job:{}/{}/{}", self.flow_group, self.flow_name, name),
                self.flow_group.clone(),
                name.clone(),
            );
            if i == 0 {
                if let Some(sla) = self.flow_sla_secs {
                    spec.config
                        .insert(FLOW_SLA_SECONDS_KEY.to_string(), sla.to_string());
                }
            }
            let plan = JobExecutionPlan::new(spec, self.executor_uri.clone(), self.execution_id)
                .with_max_attempts(self.max_attempts);
            #[allow(clippy::expect_used)]
            dag.add_node(JobNode { name, parents, plan })
                .expect("test builder adds nodes in dependency order");
        }
        dag
    }
}

/// A single-node DAG (`job0`) for the common case.
pub fn single_job_dag(execution_id: u64) -> Dag {
    DagBuilder::new()
        .execution_id(execution_id)
        .job("job0", &[])
        .build()
}
