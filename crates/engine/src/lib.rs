// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fd-engine: the DAG execution manager.
//!
//! `DagManager` is the leader-gated supervisor: it owns N worker shards,
//! routes external requests stickily by `flow_execution_id`, recovers
//! persisted DAGs on activation, and tears everything down on leadership
//! loss. Each `DagWorker` is a single-writer loop that drives its DAGs
//! through submission, polling, retry, SLA enforcement, failure handling,
//! resume, and cleanup.

pub mod catalog;
pub mod config;
pub mod context;
pub mod events;
pub mod manager;
pub mod metrics;
pub mod producer;
pub mod quota;
pub mod retention;
pub mod status;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use catalog::{CatalogError, FlowCatalog};
pub use config::{ConfigError, DagManagerConfig};
pub use context::EngineCtx;
pub use events::{LogEmitter, TimingEvent, TimingEventEmitter};
pub use manager::{DagManager, DagManagerBuilder, DagManagerError};
pub use metrics::{DagManagerMetrics, MetricsSnapshot};
pub use producer::{CancelProps, ProducerError, SpecProducer};
pub use quota::{CountingQuotaManager, QuotaError, QuotaManager, FLOW_USER_KEY};
pub use retention::FailedDagRetention;
pub use status::{JobStatus, JobStatusRetriever};
pub use worker::DagWorker;
