// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes and harnesses shared by this crate's tests and dependents' tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::catalog::{CatalogError, FlowCatalog};
use crate::config::DagManagerConfig;
use crate::context::EngineCtx;
use crate::events::{TimingEvent, TimingEventEmitter};
use crate::producer::{CancelProps, ProducerError, SpecProducer};
use crate::quota::CountingQuotaManager;
use crate::status::{JobStatus, JobStatusRetriever};
use crate::worker::DagWorker;
use async_trait::async_trait;
use fd_core::test_support::TEST_EXECUTOR_URI;
use fd_core::{
    Dag, DagId, FakeClock, FlowId, FlowSpec, JobSpec, SubmissionAck, SubmissionError,
    SubmissionFuture,
};
use fd_storage::{InMemoryDagActionStore, InMemoryDagStateStore};
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Producer that acknowledges every submission and records everything.
#[derive(Default)]
pub struct RecordingSpecProducer {
    submitted: Mutex<Vec<JobSpec>>,
    cancelled: Mutex<Vec<(String, CancelProps)>>,
    reject_submissions: AtomicBool,
    counter: AtomicU64,
}

impl RecordingSpecProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent submissions resolve to a rejection.
    pub fn set_reject_submissions(&self, reject: bool) {
        self.reject_submissions.store(reject, Ordering::Relaxed);
    }

    pub fn submission_count(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn submitted_job_names(&self) -> Vec<String> {
        self.submitted.lock().iter().map(|s| s.job_name.clone()).collect()
    }

    pub fn cancelled(&self) -> Vec<(String, CancelProps)> {
        self.cancelled.lock().clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancelled.lock().len()
    }
}

#[async_trait]
impl SpecProducer for RecordingSpecProducer {
    fn add_spec(&self, spec: &JobSpec) -> SubmissionFuture {
        self.submitted.lock().push(spec.clone());
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let result = if self.reject_submissions.load(Ordering::Relaxed) {
            Err(SubmissionError("executor rejected submission".to_string()))
        } else {
            Ok(SubmissionAck {
                external_id: Some(format!("sub-{n}")),
                execution_link: Some(format!("http://executor.local/{n}")),
            })
        };
        futures_util::future::ready(result).boxed().shared()
    }

    async fn cancel_job(&self, uri: &str, props: CancelProps) -> Result<(), ProducerError> {
        self.cancelled.lock().push((uri.to_string(), props));
        Ok(())
    }
}

/// Status store whose rows are scripted by the test.
#[derive(Default)]
pub struct ScriptedStatusRetriever {
    rows: Mutex<HashMap<DagId, Vec<JobStatus>>>,
    latest: Mutex<HashMap<FlowId, Vec<u64>>>,
}

impl ScriptedStatusRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the row with the same job name.
    pub fn set_status(&self, dag_id: &DagId, status: JobStatus) {
        let mut rows = self.rows.lock();
        let rows = rows.entry(dag_id.clone()).or_default();
        rows.retain(|s| s.job_name != status.job_name);
        rows.push(status);
    }

    pub fn set_job_event(&self, dag_id: &DagId, job_name: &str, event_name: &str) {
        self.set_status(dag_id, JobStatus::job_level(job_name, event_name));
    }

    pub fn set_flow_event(&self, dag_id: &DagId, event_name: &str) {
        self.set_status(dag_id, JobStatus::flow_level(event_name));
    }

    pub fn clear(&self, dag_id: &DagId) {
        self.rows.lock().remove(dag_id);
    }

    pub fn set_latest_execution_ids(&self, flow: &FlowId, ids: Vec<u64>) {
        self.latest.lock().insert(flow.clone(), ids);
    }
}

impl JobStatusRetriever for ScriptedStatusRetriever {
    fn latest_execution_ids(&self, flow: &FlowId, limit: usize) -> Vec<u64> {
        let mut ids = self.latest.lock().get(flow).cloned().unwrap_or_default();
        ids.truncate(limit);
        ids
    }

    fn job_statuses(&self, dag_id: &DagId) -> Vec<JobStatus> {
        self.rows.lock().get(dag_id).cloned().unwrap_or_default()
    }
}

/// Emitter that records every timing event.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<TimingEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TimingEvent> {
        self.events.lock().clone()
    }

    pub fn names_for(&self, dag_id: &DagId) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.dag_id == *dag_id)
            .map(|e| e.name)
            .collect()
    }

    pub fn count(&self, name: &str, dag_id: &DagId) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.name == name && e.dag_id == *dag_id)
            .count()
    }
}

impl TimingEventEmitter for RecordingEmitter {
    fn emit(&self, event: TimingEvent) {
        self.events.lock().push(event);
    }
}

/// Catalog recording removed flow specs.
#[derive(Default)]
pub struct RecordingCatalog {
    removed: Mutex<Vec<String>>,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

impl FlowCatalog for RecordingCatalog {
    fn remove_spec(&self, spec: &FlowSpec) -> Result<(), CatalogError> {
        self.removed.lock().push(spec.uri.clone());
        Ok(())
    }
}

/// One shard with fake collaborators, driven pass by pass under a
/// [`FakeClock`]. The deterministic counterpart of the scheduled loop.
pub struct WorkerHarness {
    pub clock: FakeClock,
    pub producer: Arc<RecordingSpecProducer>,
    pub status: Arc<ScriptedStatusRetriever>,
    pub emitter: Arc<RecordingEmitter>,
    pub live_store: Arc<InMemoryDagStateStore>,
    pub failed_store: Arc<InMemoryDagStateStore>,
    pub action_store: Arc<InMemoryDagActionStore>,
    pub quota: Arc<CountingQuotaManager>,
    pub ctx: Arc<EngineCtx<FakeClock>>,
    pub submit_tx: mpsc::UnboundedSender<Dag>,
    pub cancel_tx: mpsc::UnboundedSender<DagId>,
    pub resume_tx: mpsc::UnboundedSender<DagId>,
    pub worker: DagWorker<FakeClock>,
}

impl WorkerHarness {
    pub fn new() -> Self {
        Self::with_config(DagManagerConfig::default())
    }

    pub fn with_config(config: DagManagerConfig) -> Self {
        Self::build(config, Arc::new(CountingQuotaManager::unlimited()))
    }

    pub fn with_quota_caps(user_cap: Option<u32>, flow_group_cap: Option<u32>) -> Self {
        Self::build(
            DagManagerConfig::default(),
            Arc::new(CountingQuotaManager::new(user_cap, flow_group_cap)),
        )
    }

    fn build(config: DagManagerConfig, quota: Arc<CountingQuotaManager>) -> Self {
        let clock = FakeClock::new();
        let producer = Arc::new(RecordingSpecProducer::new());
        let status = Arc::new(ScriptedStatusRetriever::new());
        let emitter = Arc::new(RecordingEmitter::new());
        let live_store = Arc::new(InMemoryDagStateStore::new());
        let failed_store = Arc::new(InMemoryDagStateStore::new());
        let action_store = Arc::new(InMemoryDagActionStore::new());

        let mut topology: HashMap<String, Arc<dyn SpecProducer>> = HashMap::new();
        topology.insert(TEST_EXECUTOR_URI.to_string(), producer.clone());

        let ctx = Arc::new(EngineCtx::new(
            config,
            clock.clone(),
            live_store.clone(),
            failed_store.clone(),
            Some(action_store.clone()),
            status.clone(),
            quota.clone(),
            None,
            emitter.clone(),
            topology,
        ));

        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = mpsc::unbounded_channel();
        let (resume_tx, resume_rx) = mpsc::unbounded_channel();
        let worker = DagWorker::new(0, ctx.clone(), submit_rx, cancel_rx, resume_rx);

        Self {
            clock,
            producer,
            status,
            emitter,
            live_store,
            failed_store,
            action_store,
            quota,
            ctx,
            submit_tx,
            cancel_tx,
            resume_tx,
            worker,
        }
    }

    pub fn submit(&self, dag: Dag) {
        self.submit_tx.send(dag).expect("worker alive");
    }

    pub fn kill(&self, dag_id: DagId) {
        self.cancel_tx.send(dag_id).expect("worker alive");
    }

    pub fn resume(&self, dag_id: DagId) {
        self.resume_tx.send(dag_id).expect("worker alive");
    }

    pub async fn run_pass(&mut self) {
        self.worker.run_pass().await;
    }

    /// Script the store confirming a terminal flow status.
    pub fn confirm_flow_terminal(&self, dag_id: &DagId, event_name: &str) {
        self.status.set_flow_event(dag_id, event_name);
    }
}

impl Default for WorkerHarness {
    fn default() -> Self {
        Self::new()
    }
}
