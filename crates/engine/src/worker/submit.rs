// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submit phase: admit queued DAGs and dispatch ready nodes.

use super::DagWorker;
use crate::events::TimingEvent;
use crate::quota::QuotaError;
use fd_core::{Clock, DagId, ExecutionStatus, FlowEvent, JobEvent, SubmissionError, SubmissionHandle};
use fd_storage::StoreError;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub(crate) enum SubmitError {
    #[error("dag is no longer tracked")]
    UnknownDag,

    #[error("job not present in dag")]
    UnknownJob,

    #[error("no producer for executor {0}")]
    UnknownExecutor(String),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("submission rejected: {0}")]
    Rejected(#[from] SubmissionError),

    #[error("submission was not accepted within the start SLA")]
    AcceptanceTimeout,
}

impl<C: Clock> DagWorker<C> {
    /// Drain the submit queue and initialize every admitted DAG.
    pub(crate) async fn process_submissions(&mut self) {
        while let Ok(dag) = self.submit_rx.try_recv() {
            if dag.is_empty() {
                warn!(shard = self.shard, dag_id = %dag.id, "ignoring empty dag");
                continue;
            }
            self.initialize(dag).await;
        }
    }

    /// Admit one DAG: record already-running nodes (leader-failover
    /// recovery), dispatch the ready set, and announce the flow as running.
    pub(crate) async fn initialize(&mut self, dag: fd_core::Dag) {
        let dag_id = dag.id.clone();
        if self.dags.contains_key(&dag_id) || self.dag_ids_to_clean.contains(&dag_id) {
            // Housekeeping re-sync can re-offer a DAG a shard already holds
            // (or just finished); drop the duplicate.
            warn!(shard = self.shard, dag_id = %dag_id, "duplicate dag, skipping");
            return;
        }

        let was_running = dag.is_running();
        let recovered = dag.running_nodes();
        self.dags.insert(dag_id.clone(), dag);
        for job_name in &recovered {
            self.add_job_state(&dag_id, job_name);
            // These nodes were counted by the previous leader; the gauge
            // restarts with this one.
            self.ctx.metrics.incr_running_jobs();
        }

        self.submit_ready(&dag_id).await;

        if !was_running {
            let now = self.ctx.clock.epoch_ms();
            self.ctx
                .metrics
                .set_orchestration_delay_ms(now.saturating_sub(dag_id.flow_execution_id));
        }
        self.ctx.emit_flow_event(FlowEvent::Running, &dag_id, None);
        info!(shard = self.shard, dag_id = %dag_id, recovered = recovered.len(), "dag initialized");
    }

    async fn submit_ready(&mut self, dag_id: &DagId) {
        let ready = self
            .dags
            .get(dag_id)
            .map(|d| d.ready_nodes())
            .unwrap_or_default();
        for job_name in ready {
            self.add_job_state(dag_id, &job_name);
            self.submit_job(dag_id, &job_name).await;
        }
    }

    /// Dispatch newly-unblocked nodes, then re-checkpoint the DAG.
    pub(crate) async fn submit_next(&mut self, dag_id: &DagId) {
        self.submit_ready(dag_id).await;
        if let Some(dag) = self.dags.get(dag_id) {
            if let Err(e) = self.ctx.live_store.write_checkpoint(dag) {
                warn!(dag_id = %dag_id, error = %e, "checkpoint after submit failed");
            }
        }
    }

    /// Dispatch one node. Failures (quota refusal, unknown executor, store
    /// write, executor rejection) are absorbed into a JOB_FAILED event; the
    /// next poll pass observes the failure through the status store.
    pub(crate) async fn submit_job(&mut self, dag_id: &DagId, job_name: &str) {
        if let Err(e) = self.try_submit_job(dag_id, job_name).await {
            warn!(
                shard = self.shard,
                dag_id = %dag_id,
                job = job_name,
                error = %e,
                "job submission failed"
            );
            self.ctx.metrics.incr_jobs_failed();
            self.ctx.emitter.emit(
                TimingEvent::job(JobEvent::Failed, dag_id, job_name, self.ctx.clock.epoch_ms())
                    .with_message(e.to_string()),
            );
        }
    }

    async fn try_submit_job(&mut self, dag_id: &DagId, job_name: &str) -> Result<(), SubmitError> {
        let ctx = self.ctx.clone();
        let dag = self.dags.get_mut(dag_id).ok_or(SubmitError::UnknownDag)?;
        {
            let node = dag.node_mut(job_name).ok_or(SubmitError::UnknownJob)?;
            node.plan.current_attempts += 1;
            node.plan.status = ExecutionStatus::Running;
        }
        let node = dag.node(job_name).cloned().ok_or(SubmitError::UnknownJob)?;

        ctx.quota.check_quota(dag_id, &node)?;
        let producer = ctx
            .producer(&node.plan.executor_uri)
            .ok_or_else(|| SubmitError::UnknownExecutor(node.plan.executor_uri.clone()))?;

        if node.plan.current_attempts == 1 {
            self.ctx.metrics.incr_running_jobs();
        }
        ctx.metrics.incr_jobs_sent();

        // Store the future on the node, checkpoint, then block on
        // acceptance: a crash between submission and ack still lets the
        // next leader discover the DAG.
        let future = producer.add_spec(&node.plan.spec);
        if let Some(n) = dag.node_mut(job_name) {
            n.plan.submission = Some(SubmissionHandle(future.clone()));
        }
        ctx.live_store.write_checkpoint(dag)?;

        let ack = tokio::time::timeout(ctx.config.job_start_sla(), future)
            .await
            .map_err(|_| SubmitError::AcceptanceTimeout)??;

        let link = producer.execution_link(&ack, &node.plan.spec.uri);
        ctx.emitter.emit(
            TimingEvent::job(
                JobEvent::Orchestrated,
                dag_id,
                job_name,
                ctx.clock.epoch_ms(),
            )
            .with_execution_link(link),
        );
        Ok(())
    }
}
