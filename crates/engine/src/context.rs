// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared collaborators handed to the supervisor and every worker shard.

use crate::catalog::FlowCatalog;
use crate::config::DagManagerConfig;
use crate::events::{TimingEvent, TimingEventEmitter};
use crate::metrics::DagManagerMetrics;
use crate::producer::SpecProducer;
use crate::quota::QuotaManager;
use crate::status::JobStatusRetriever;
use fd_core::{Clock, DagId, FlowEvent, JobEvent};
use fd_storage::{DagAction, DagActionStore, DagStateStore};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Everything the shards and the supervisor share. Per-shard indices live
/// in each worker; this holds only collaborators and cross-shard state.
pub struct EngineCtx<C: Clock> {
    pub config: DagManagerConfig,
    pub clock: C,
    pub live_store: Arc<dyn DagStateStore>,
    pub failed_store: Arc<dyn DagStateStore>,
    pub action_store: Option<Arc<dyn DagActionStore>>,
    pub status_retriever: Arc<dyn JobStatusRetriever>,
    pub quota: Arc<dyn QuotaManager>,
    pub flow_catalog: Option<Arc<dyn FlowCatalog>>,
    pub emitter: Arc<dyn TimingEventEmitter>,
    pub metrics: DagManagerMetrics,
    /// Executor URI → producer. Read-mostly; replaced wholesale by the
    /// supervisor.
    topology: RwLock<HashMap<String, Arc<dyn SpecProducer>>>,
    /// Mirror of the failed-dag store's keys, shared across shards and the
    /// retention task.
    failed_dag_ids: Mutex<HashSet<DagId>>,
}

impl<C: Clock> EngineCtx<C> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: DagManagerConfig,
        clock: C,
        live_store: Arc<dyn DagStateStore>,
        failed_store: Arc<dyn DagStateStore>,
        action_store: Option<Arc<dyn DagActionStore>>,
        status_retriever: Arc<dyn JobStatusRetriever>,
        quota: Arc<dyn QuotaManager>,
        flow_catalog: Option<Arc<dyn FlowCatalog>>,
        emitter: Arc<dyn TimingEventEmitter>,
        topology: HashMap<String, Arc<dyn SpecProducer>>,
    ) -> Self {
        let metrics = DagManagerMetrics::new(config.num_threads);
        Self {
            config,
            clock,
            live_store,
            failed_store,
            action_store,
            status_retriever,
            quota,
            flow_catalog,
            emitter,
            metrics,
            topology: RwLock::new(topology),
            failed_dag_ids: Mutex::new(HashSet::new()),
        }
    }

    pub fn producer(&self, executor_uri: &str) -> Option<Arc<dyn SpecProducer>> {
        self.topology.read().get(executor_uri).cloned()
    }

    pub fn set_topology(&self, topology: HashMap<String, Arc<dyn SpecProducer>>) {
        *self.topology.write() = topology;
    }

    // --- failed-dag id mirror ---

    pub fn failed_dag_contains(&self, dag_id: &DagId) -> bool {
        self.failed_dag_ids.lock().contains(dag_id)
    }

    pub fn add_failed_dag_id(&self, dag_id: DagId) {
        self.failed_dag_ids.lock().insert(dag_id);
    }

    pub fn remove_failed_dag_id(&self, dag_id: &DagId) {
        self.failed_dag_ids.lock().remove(dag_id);
    }

    pub fn set_failed_dag_ids(&self, ids: HashSet<DagId>) {
        *self.failed_dag_ids.lock() = ids;
    }

    pub fn failed_dag_ids_snapshot(&self) -> Vec<DagId> {
        self.failed_dag_ids.lock().iter().cloned().collect()
    }

    // --- events and actions ---

    pub fn emit_flow_event(&self, event: FlowEvent, dag_id: &DagId, message: Option<String>) {
        let mut timing = TimingEvent::flow(event, dag_id, self.clock.epoch_ms());
        timing.message = message;
        self.emitter.emit(timing);
    }

    pub fn emit_job_event(&self, event: JobEvent, dag_id: &DagId, job_name: &str) {
        self.emitter
            .emit(TimingEvent::job(event, dag_id, job_name, self.clock.epoch_ms()));
    }

    /// Delete an action record; absence of a configured store is a no-op
    /// and store failures are logged, never propagated.
    pub fn delete_action(&self, action: &DagAction) {
        let Some(store) = &self.action_store else {
            return;
        };
        if let Err(e) = store.delete(action) {
            warn!(
                dag_id = %action.dag_id(),
                action = %action.action_type,
                error = %e,
                "failed to delete dag action"
            );
        }
    }
}
