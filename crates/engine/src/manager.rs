// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The leader-gated supervisor.
//!
//! Idle at construction; `set_active(true)` on winning leadership,
//! `set_active(false)` on losing it. While inactive every mutating entry
//! point is a silent no-op: requests are re-driven from the durable stores
//! by whichever node leads next.

use crate::catalog::FlowCatalog;
use crate::config::DagManagerConfig;
use crate::context::EngineCtx;
use crate::events::{LogEmitter, TimingEventEmitter};
use crate::producer::SpecProducer;
use crate::quota::{CountingQuotaManager, QuotaManager};
use crate::retention::{retention_loop, FailedDagRetention};
use crate::status::JobStatusRetriever;
use crate::worker::{worker_loop, DagWorker, ShardQueues};
use fd_core::{Clock, Dag, DagId, FlowEvent, FlowId, FlowSpec, SystemClock};
use fd_storage::{
    state_store_by_name, DagAction, DagActionStore, DagActionType, DagStateStore, StoreError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// First housekeeping re-sync delay; doubles each round up to the cap.
const HOUSEKEEPING_INITIAL_DELAY: Duration = Duration::from_secs(2 * 60);
const HOUSEKEEPING_MAX_DELAY: Duration = Duration::from_secs(180 * 60);

#[derive(Debug, Error)]
pub enum DagManagerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("shard {shard} queue is closed")]
    QueueClosed { shard: usize },
}

/// Mutable lifecycle state, guarded by the supervisor mutex. The few
/// state-transition entry points serialise on it; per-shard work never
/// touches it.
struct SupervisorState {
    active: bool,
    shards: Vec<ShardQueues>,
    tasks: Vec<JoinHandle<()>>,
    shutdown: Option<CancellationToken>,
}

pub struct DagManager<C: Clock = SystemClock> {
    ctx: Arc<EngineCtx<C>>,
    state: Mutex<SupervisorState>,
    /// Self-handle for the background tasks spawned on activation.
    weak: Weak<DagManager<C>>,
}

impl DagManager<SystemClock> {
    pub fn builder(
        config: DagManagerConfig,
        status_retriever: Arc<dyn JobStatusRetriever>,
    ) -> DagManagerBuilder<SystemClock> {
        DagManagerBuilder::new(config, status_retriever)
    }
}

impl<C: Clock> DagManager<C> {
    pub fn context(&self) -> &Arc<EngineCtx<C>> {
        &self.ctx
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Toggle leadership. Activation recovers all persisted state; must be
    /// called from within a tokio runtime. Deactivation stops the scheduler
    /// tasks and awaits them with a bounded timeout; an in-flight
    /// submission await is bounded by the start SLA, which caps the worst
    /// case of a shard outliving the timeout.
    pub async fn set_active(&self, active: bool) -> Result<(), DagManagerError> {
        if active {
            self.activate()
        } else {
            self.deactivate().await
        }
    }

    fn activate(&self) -> Result<(), DagManagerError> {
        let live_dags = {
            let mut state = self.state.lock();
            if state.active {
                return Ok(());
            }
            info!("dag manager activating");

            // Mirror the failed store's keys, then seed quota from the live
            // store so concurrency counts survive the leader change.
            self.ctx
                .set_failed_dag_ids(self.ctx.failed_store.get_dag_ids()?);
            let live_dags = self.ctx.live_store.get_dags()?;
            self.ctx.quota.init(&live_dags);

            let token = CancellationToken::new();
            for shard in 0..self.ctx.config.num_threads.max(1) {
                let (submit_tx, submit_rx) = mpsc::unbounded_channel();
                let (cancel_tx, cancel_rx) = mpsc::unbounded_channel();
                let (resume_tx, resume_rx) = mpsc::unbounded_channel();
                let worker =
                    DagWorker::new(shard, self.ctx.clone(), submit_rx, cancel_rx, resume_rx);
                state
                    .tasks
                    .push(tokio::spawn(worker_loop(worker, token.child_token())));
                state.shards.push(ShardQueues {
                    submit: submit_tx,
                    cancel: cancel_tx,
                    resume: resume_tx,
                });
            }
            state.tasks.push(tokio::spawn(retention_loop(
                FailedDagRetention::new(self.ctx.clone()),
                token.child_token(),
            )));
            state.tasks.push(self.spawn_housekeeping(token.child_token()));
            state.shutdown = Some(token);
            state.active = true;
            live_dags
        };

        // Re-enqueue persisted DAGs outside the lock; add_dag re-acquires it
        // per offer.
        let recovered = live_dags.len();
        for dag in live_dags {
            let dag_id = dag.id.clone();
            if let Err(e) = self.add_dag(dag, false, false) {
                warn!(dag_id = %dag_id, error = %e, "failed to re-enqueue persisted dag");
            }
        }
        info!(recovered, "dag manager active");
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), DagManagerError> {
        let (token, tasks) = {
            let mut state = self.state.lock();
            if !state.active {
                return Ok(());
            }
            info!("dag manager deactivating");
            state.active = false;
            state.shards.clear();
            (state.shutdown.take(), std::mem::take(&mut state.tasks))
        };
        if let Some(token) = token {
            token.cancel();
        }
        let deadline = tokio::time::Instant::now() + self.ctx.config.shutdown_timeout();
        for task in tasks {
            if tokio::time::timeout_at(deadline, task).await.is_err() {
                warn!("scheduler task did not stop within the shutdown timeout");
            }
        }
        info!("dag manager inactive");
        Ok(())
    }

    /// Admit a DAG for execution. `persist` checkpoints it to the live
    /// store first (and clears its LAUNCH action so a failover does not
    /// relaunch it); `set_status` announces FLOW_PENDING. Silently dropped
    /// while inactive.
    pub fn add_dag(&self, dag: Dag, persist: bool, set_status: bool) -> Result<(), DagManagerError> {
        self.offer_dag(dag, persist, set_status).map(|_| ())
    }

    /// `add_dag`, then removal of the flow spec from the catalog when it is
    /// ad-hoc and the DAG was actually admitted.
    pub fn add_dag_and_remove_adhoc_flow_spec(
        &self,
        spec: &FlowSpec,
        dag: Dag,
        persist: bool,
        set_status: bool,
    ) -> Result<(), DagManagerError> {
        let admitted = self.offer_dag(dag, persist, set_status)?;
        if admitted && spec.is_adhoc() {
            if let Some(catalog) = &self.ctx.flow_catalog {
                if let Err(e) = catalog.remove_spec(spec) {
                    warn!(uri = %spec.uri, error = %e, "failed to remove ad-hoc flow spec");
                }
            }
        }
        Ok(())
    }

    fn offer_dag(
        &self,
        dag: Dag,
        persist: bool,
        set_status: bool,
    ) -> Result<bool, DagManagerError> {
        let state = self.state.lock();
        if !state.active {
            debug!(dag_id = %dag.id, "inactive, dropping dag submission");
            return Ok(false);
        }
        if persist {
            // Durability before dispatch: the checkpoint precedes any queue
            // offer, and the LAUNCH action is cleared so a failover cannot
            // relaunch a DAG that is already persisted.
            self.ctx.live_store.write_checkpoint(&dag)?;
            self.ctx.delete_action(&DagAction::launch(&dag.id));
        }
        let dag_id = dag.id.clone();
        let shard = shard_for(dag_id.flow_execution_id, state.shards.len());
        state.shards[shard]
            .submit
            .send(dag)
            .map_err(|_| DagManagerError::QueueClosed { shard })?;
        if set_status {
            self.ctx.emit_flow_event(FlowEvent::Pending, &dag_id, None);
        }
        debug!(dag_id = %dag_id, shard, "dag offered");
        Ok(true)
    }

    /// Kill the latest executions of a flow (bounded by the configured
    /// lookback). No-op while inactive.
    pub fn stop_dag(&self, flow: &FlowId) -> Result<(), DagManagerError> {
        let state = self.state.lock();
        if !state.active {
            return Ok(());
        }
        let executions = self
            .ctx
            .status_retriever
            .latest_execution_ids(flow, self.ctx.config.stop_flow_execution_limit);
        info!(flow = %flow, executions = executions.len(), "stop requested");
        for flow_execution_id in executions {
            let dag_id = flow.execution(flow_execution_id);
            let shard = shard_for(flow_execution_id, state.shards.len());
            state.shards[shard]
                .cancel
                .send(dag_id)
                .map_err(|_| DagManagerError::QueueClosed { shard })?;
        }
        Ok(())
    }

    /// Route a kill to the shard owning the execution. Also invoked from
    /// the dag-action change-stream.
    pub fn handle_kill_flow_request(
        &self,
        flow_group: &str,
        flow_name: &str,
        flow_execution_id: u64,
    ) -> Result<(), DagManagerError> {
        let state = self.state.lock();
        if !state.active {
            return Ok(());
        }
        let dag_id = DagId::new(flow_group, flow_name, flow_execution_id);
        let shard = shard_for(flow_execution_id, state.shards.len());
        info!(dag_id = %dag_id, shard, "kill request routed");
        state.shards[shard]
            .cancel
            .send(dag_id)
            .map_err(|_| DagManagerError::QueueClosed { shard })
    }

    /// Route a resume to the shard owning the execution.
    pub fn handle_resume_flow_request(
        &self,
        flow_group: &str,
        flow_name: &str,
        flow_execution_id: u64,
    ) -> Result<(), DagManagerError> {
        let state = self.state.lock();
        if !state.active {
            return Ok(());
        }
        let dag_id = DagId::new(flow_group, flow_name, flow_execution_id);
        let shard = shard_for(flow_execution_id, state.shards.len());
        info!(dag_id = %dag_id, shard, "resume request routed");
        state.shards[shard]
            .resume
            .send(dag_id)
            .map_err(|_| DagManagerError::QueueClosed { shard })
    }

    /// Replace the executor topology.
    pub fn set_topology(&self, topology: HashMap<String, Arc<dyn SpecProducer>>) {
        let _state = self.state.lock();
        self.ctx.set_topology(topology);
    }

    /// Record a DAG as failed in the shared mirror.
    pub fn add_failed_dag(&self, dag_id: DagId) {
        let _state = self.state.lock();
        self.ctx.add_failed_dag_id(dag_id);
    }

    /// Event-bus subscriber: forwards KILL / RESUME actions from a
    /// change-stream into the routing entry points.
    pub fn spawn_action_listener(
        &self,
        mut actions: mpsc::UnboundedReceiver<DagAction>,
    ) -> JoinHandle<()> {
        let manager = self.weak.clone();
        tokio::spawn(async move {
            while let Some(action) = actions.recv().await {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let result = match action.action_type {
                    DagActionType::Kill => manager.handle_kill_flow_request(
                        &action.flow_group,
                        &action.flow_name,
                        action.flow_execution_id,
                    ),
                    DagActionType::Resume => manager.handle_resume_flow_request(
                        &action.flow_group,
                        &action.flow_name,
                        action.flow_execution_id,
                    ),
                    // Launches are driven through `add_dag` by the
                    // orchestrator, not the change-stream.
                    DagActionType::Launch => Ok(()),
                };
                if let Err(e) = result {
                    warn!(dag_id = %action.dag_id(), error = %e, "action-stream request failed");
                }
            }
        })
    }

    fn load_dags_from_store(&self) {
        match self.ctx.live_store.get_dags() {
            Ok(dags) => {
                debug!(count = dags.len(), "housekeeping re-sync of persisted dags");
                for dag in dags {
                    let dag_id = dag.id.clone();
                    if let Err(e) = self.add_dag(dag, false, false) {
                        warn!(dag_id = %dag_id, error = %e, "housekeeping re-enqueue failed");
                    }
                }
            }
            Err(e) => warn!(error = %e, "housekeeping load from live store failed"),
        }
    }

    /// Re-runs the recovery load with exponentially growing delays to pick
    /// up DAGs missed through transient read errors.
    fn spawn_housekeeping(&self, token: CancellationToken) -> JoinHandle<()> {
        let manager = self.weak.clone();
        tokio::spawn(async move {
            let mut delay = HOUSEKEEPING_INITIAL_DELAY;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if !manager.is_active() {
                    break;
                }
                manager.load_dags_from_store();
                delay = std::cmp::min(delay * 2, HOUSEKEEPING_MAX_DELAY);
            }
        })
    }
}

/// Sticky routing: the execution id is already a monotonic integer, so the
/// identity modulo is a stable, uniform hash. Cancellation and resume must
/// land on the shard holding the submission futures.
pub(crate) fn shard_for(flow_execution_id: u64, num_shards: usize) -> usize {
    (flow_execution_id % num_shards.max(1) as u64) as usize
}

/// Assembles a [`DagManager`]; stores default to the configured
/// implementation, quota to unlimited counting, emission to tracing.
pub struct DagManagerBuilder<C: Clock = SystemClock> {
    config: DagManagerConfig,
    clock: C,
    status_retriever: Arc<dyn JobStatusRetriever>,
    live_store: Option<Arc<dyn DagStateStore>>,
    failed_store: Option<Arc<dyn DagStateStore>>,
    action_store: Option<Arc<dyn DagActionStore>>,
    quota: Option<Arc<dyn QuotaManager>>,
    emitter: Option<Arc<dyn TimingEventEmitter>>,
    flow_catalog: Option<Arc<dyn FlowCatalog>>,
    topology: HashMap<String, Arc<dyn SpecProducer>>,
}

impl DagManagerBuilder<SystemClock> {
    pub fn new(config: DagManagerConfig, status_retriever: Arc<dyn JobStatusRetriever>) -> Self {
        Self {
            config,
            clock: SystemClock,
            status_retriever,
            live_store: None,
            failed_store: None,
            action_store: None,
            quota: None,
            emitter: None,
            flow_catalog: None,
            topology: HashMap::new(),
        }
    }
}

impl<C: Clock> DagManagerBuilder<C> {
    pub fn clock<C2: Clock>(self, clock: C2) -> DagManagerBuilder<C2> {
        DagManagerBuilder {
            config: self.config,
            clock,
            status_retriever: self.status_retriever,
            live_store: self.live_store,
            failed_store: self.failed_store,
            action_store: self.action_store,
            quota: self.quota,
            emitter: self.emitter,
            flow_catalog: self.flow_catalog,
            topology: self.topology,
        }
    }

    pub fn live_store(mut self, store: Arc<dyn DagStateStore>) -> Self {
        self.live_store = Some(store);
        self
    }

    pub fn failed_store(mut self, store: Arc<dyn DagStateStore>) -> Self {
        self.failed_store = Some(store);
        self
    }

    pub fn action_store(mut self, store: Arc<dyn DagActionStore>) -> Self {
        self.action_store = Some(store);
        self
    }

    pub fn quota(mut self, quota: Arc<dyn QuotaManager>) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn emitter(mut self, emitter: Arc<dyn TimingEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn flow_catalog(mut self, catalog: Arc<dyn FlowCatalog>) -> Self {
        self.flow_catalog = Some(catalog);
        self
    }

    pub fn topology(mut self, topology: HashMap<String, Arc<dyn SpecProducer>>) -> Self {
        self.topology = topology;
        self
    }

    pub fn build(self) -> Result<Arc<DagManager<C>>, DagManagerError> {
        let live_store = match self.live_store {
            Some(store) => store,
            None => state_store_by_name(
                &self.config.dag_state_store,
                &self.config.dag_state_store_dir,
            )?,
        };
        // The failed store is the same implementation under the overlay
        // directory.
        let failed_store = match self.failed_store {
            Some(store) => store,
            None => state_store_by_name(
                &self.config.dag_state_store,
                &self.config.failed_dag_state_store_dir,
            )?,
        };
        let quota = self
            .quota
            .unwrap_or_else(|| Arc::new(CountingQuotaManager::unlimited()));
        let emitter = self.emitter.unwrap_or_else(|| Arc::new(LogEmitter));

        let ctx = Arc::new(EngineCtx::new(
            self.config,
            self.clock,
            live_store,
            failed_store,
            self.action_store,
            self.status_retriever,
            quota,
            self.flow_catalog,
            emitter,
            self.topology,
        ));
        Ok(Arc::new_cyclic(|weak| DagManager {
            ctx,
            state: Mutex::new(SupervisorState {
                active: false,
                shards: Vec::new(),
                tasks: Vec::new(),
                shutdown: None,
            }),
            weak: weak.clone(),
        }))
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
