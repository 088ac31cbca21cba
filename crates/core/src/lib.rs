// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fd-core: domain types for the flowdag DAG execution manager.

pub mod clock;
pub mod dag;
pub mod event;
pub mod id;
pub mod spec;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dag::{
    Dag, DagError, JobExecutionPlan, JobNode, SubmissionAck, SubmissionError, SubmissionFuture,
    SubmissionHandle,
};
pub use event::{FlowEvent, JobEvent};
pub use id::{DagId, DagIdParseError, FlowId};
pub use spec::{FlowSpec, JobSpec, FLOW_SLA_SECONDS_KEY, NA_KEY};
pub use status::{ExecutionStatus, FailureOption};

#[cfg(any(test, feature = "test-support"))]
pub use test_support::{single_job_dag, DagBuilder, TEST_EXECUTOR_URI};
