// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-shard worker loop.
//!
//! Each shard owns a disjoint subset of DAGs (routed by
//! `flow_execution_id % num_threads`) and is the single writer of its
//! indices. One pass runs the phases in a fixed order: one kill, drain
//! submits, begin resumes, confirm resumes, poll-and-advance, cleanup.

mod advance;
mod cleanup;
mod resume;
mod submit;

use crate::context::EngineCtx;
use crate::producer::CancelProps;
use fd_core::{Clock, Dag, DagId, ExecutionStatus, FailureOption, FlowEvent, JobEvent};
use fd_storage::DagAction;
use futures_util::FutureExt;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Senders of one shard's three FIFO queues, held by the supervisor.
pub(crate) struct ShardQueues {
    pub submit: mpsc::UnboundedSender<Dag>,
    pub cancel: mpsc::UnboundedSender<DagId>,
    pub resume: mpsc::UnboundedSender<DagId>,
}

/// One shard of the DagManager. Single consumer of its queues; sole owner
/// and writer of its in-memory indices.
pub struct DagWorker<C: Clock> {
    shard: usize,
    ctx: Arc<EngineCtx<C>>,
    submit_rx: mpsc::UnboundedReceiver<Dag>,
    cancel_rx: mpsc::UnboundedReceiver<DagId>,
    resume_rx: mpsc::UnboundedReceiver<DagId>,
    /// DAGs this shard supervises.
    dags: HashMap<DagId, Dag>,
    /// Active (submitted, not yet terminal) node names per DAG, in dispatch
    /// order. Doubles as the job→dag back-index: every entry's key carries
    /// the owning DagId.
    dag_to_jobs: HashMap<DagId, Vec<String>>,
    /// Memoised flow deadline (epoch ms; `u64::MAX` when the flow has no SLA).
    dag_to_sla: HashMap<DagId, u64>,
    /// Terminal event emitted; awaiting status-store confirmation.
    dag_ids_to_clean: HashSet<DagId>,
    /// Loaded from the failed store; awaiting status-store acknowledgment
    /// of PENDING_RESUME before re-initialisation.
    resuming_dags: HashMap<DagId, Dag>,
}

impl<C: Clock> DagWorker<C> {
    pub fn new(
        shard: usize,
        ctx: Arc<EngineCtx<C>>,
        submit_rx: mpsc::UnboundedReceiver<Dag>,
        cancel_rx: mpsc::UnboundedReceiver<DagId>,
        resume_rx: mpsc::UnboundedReceiver<DagId>,
    ) -> Self {
        Self {
            shard,
            ctx,
            submit_rx,
            cancel_rx,
            resume_rx,
            dags: HashMap::new(),
            dag_to_jobs: HashMap::new(),
            dag_to_sla: HashMap::new(),
            dag_ids_to_clean: HashSet::new(),
            resuming_dags: HashMap::new(),
        }
    }

    pub fn shard(&self) -> usize {
        self.shard
    }

    /// DAGs currently supervised by this shard.
    pub fn supervised_dag_ids(&self) -> Vec<DagId> {
        self.dags.keys().cloned().collect()
    }

    pub fn is_tracking(&self, dag_id: &DagId) -> bool {
        self.dags.contains_key(dag_id)
    }

    /// One scheduled pass. Phase order is the ordering contract: kills are
    /// considered before new submits, submits before resumes, polling before
    /// cleanup.
    pub async fn run_pass(&mut self) {
        self.ctx
            .metrics
            .heartbeat(self.shard, self.ctx.clock.epoch_ms());
        self.process_one_cancel().await;
        self.process_submissions().await;
        self.begin_resumes();
        self.finish_resumes().await;
        self.poll_and_advance().await;
        self.classify_for_cleanup();
        self.confirm_and_clean();
    }

    /// Cancel phase: poll exactly one kill per pass so kills stay fair
    /// without starving scheduling.
    async fn process_one_cancel(&mut self) {
        let Ok(dag_id) = self.cancel_rx.try_recv() else {
            return;
        };
        if self.dags.contains_key(&dag_id) {
            self.cancel_dag(&dag_id).await;
        } else {
            // Already finished or never seen here.
            info!(shard = self.shard, dag_id = %dag_id, "kill requested for unknown dag");
        }
        self.ctx.delete_action(&DagAction::kill(&dag_id));
    }

    async fn cancel_dag(&mut self, dag_id: &DagId) {
        info!(shard = self.shard, dag_id = %dag_id, "cancelling dag");
        let active = self.dag_to_jobs.get(dag_id).cloned().unwrap_or_default();
        for job_name in active {
            self.cancel_job(dag_id, &job_name, "flow killed by request")
                .await;
        }
        if let Some(dag) = self.dags.get_mut(dag_id) {
            dag.flow_event = Some(FlowEvent::Cancelled);
            dag.message = Some("flow killed by request".to_string());
        }
    }

    /// Cancel one active node on its executor and mark it CANCELLED locally.
    /// Cancellation failures are logged and the DAG still winds down.
    pub(crate) async fn cancel_job(&mut self, dag_id: &DagId, job_name: &str, reason: &str) {
        let request = self
            .dags
            .get(dag_id)
            .and_then(|d| d.node(job_name))
            .map(|node| {
                let producer = self.ctx.producer(&node.plan.executor_uri);
                let serialized = producer.as_ref().and_then(|p| {
                    node.plan
                        .submission
                        .as_ref()
                        .and_then(|handle| handle.ack())
                        .and_then(|ack| p.serialize_ack(&ack))
                });
                (node.plan.spec.uri.clone(), producer, serialized)
            });
        let Some((uri, producer, serialized)) = request else {
            return;
        };

        match producer {
            Some(producer) => {
                let props = CancelProps {
                    serialized_response: serialized,
                    message: Some(reason.to_string()),
                };
                if let Err(e) = producer.cancel_job(&uri, props).await {
                    warn!(dag_id = %dag_id, job = job_name, error = %e, "cancel request failed");
                }
            }
            None => {
                warn!(dag_id = %dag_id, job = job_name, uri = %uri, "no producer for executor");
            }
        }

        self.ctx.emit_job_event(JobEvent::Cancel, dag_id, job_name);
        if let Some(node) = self.dags.get_mut(dag_id).and_then(|d| d.node_mut(job_name)) {
            node.plan.status = ExecutionStatus::Cancelled;
        }
    }

    // --- shared index bookkeeping ---

    fn add_job_state(&mut self, dag_id: &DagId, job_name: &str) {
        let jobs = self.dag_to_jobs.entry(dag_id.clone()).or_default();
        if !jobs.iter().any(|j| j == job_name) {
            jobs.push(job_name.to_string());
        }
    }

    fn delete_job_state(&mut self, dag_id: &DagId, job_name: &str) {
        let Some(jobs) = self.dag_to_jobs.get_mut(dag_id) else {
            return;
        };
        let before = jobs.len();
        jobs.retain(|j| j != job_name);
        if jobs.len() < before {
            self.ctx.metrics.decr_running_jobs();
        }
    }

    fn has_running_jobs(&self, dag_id: &DagId) -> bool {
        self.dag_to_jobs
            .get(dag_id)
            .is_some_and(|jobs| !jobs.is_empty())
    }

    fn resolved_failure_option(&self, dag: &Dag) -> FailureOption {
        dag.failure_option
            .unwrap_or(self.ctx.config.default_failure_option)
    }
}

/// Scheduled loop of one shard. A panicking pass is caught and logged; the
/// shard never stops voluntarily except on deactivation.
pub(crate) async fn worker_loop<C: Clock>(mut worker: DagWorker<C>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(worker.ctx.config.polling_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let shard = worker.shard;
                if let Err(panic) = AssertUnwindSafe(worker.run_pass()).catch_unwind().await {
                    error!(shard, panic = panic_message(&panic), "worker pass panicked; shard continues");
                }
            }
        }
    }
    debug!(shard = worker.shard, "worker stopped");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
