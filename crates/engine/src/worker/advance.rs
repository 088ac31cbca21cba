// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll-and-advance phase: observe job statuses, enforce deadlines, retry,
//! and apply the finish policy per terminal status.

use super::DagWorker;
use crate::status::JobStatus;
use fd_core::{Clock, DagId, ExecutionStatus, FailureOption, FlowEvent};
use tracing::{debug, info, warn};

impl<C: Clock> DagWorker<C> {
    /// Poll every active node once. At least one polling interval elapses
    /// between consecutive observations of the same job.
    pub(crate) async fn poll_and_advance(&mut self) {
        let mut active: Vec<(DagId, String)> = Vec::new();
        for (dag_id, jobs) in &self.dag_to_jobs {
            for job_name in jobs {
                active.push((dag_id.clone(), job_name.clone()));
            }
        }
        for (dag_id, job_name) in active {
            // A finish earlier in this pass may have removed the node.
            let still_active = self
                .dag_to_jobs
                .get(&dag_id)
                .is_some_and(|jobs| jobs.iter().any(|j| *j == job_name));
            if !still_active || !self.dags.contains_key(&dag_id) {
                continue;
            }
            self.poll_job(&dag_id, &job_name).await;
        }
    }

    async fn poll_job(&mut self, dag_id: &DagId, job_name: &str) {
        let now_ms = self.ctx.clock.epoch_ms();
        let generation = match self.dags.get(dag_id).and_then(|d| d.node(job_name)) {
            Some(node) => node.plan.job_generation,
            None => return,
        };
        // Rows from prior generations are stale; treat them as missing.
        let polled = self
            .ctx
            .status_retriever
            .job_status(dag_id, job_name)
            .filter(|s| s.generation == 0 || s.generation >= generation);

        if self.sla_kill_if_needed(dag_id, job_name, now_ms).await {
            self.finish_job(dag_id, job_name, ExecutionStatus::Cancelled)
                .await;
            return;
        }
        if self
            .kill_if_orphaned(dag_id, job_name, polled.as_ref(), now_ms)
            .await
        {
            self.finish_job(dag_id, job_name, ExecutionStatus::Cancelled)
                .await;
            return;
        }

        if polled.as_ref().is_some_and(|s| s.should_retry) {
            info!(dag_id = %dag_id, job = job_name, "job flagged for retry");
            if let Some(dag) = self.dags.get_mut(dag_id) {
                // The failure is not terminal yet.
                dag.flow_event = None;
                if let Some(node) = dag.node_mut(job_name) {
                    node.plan.status = ExecutionStatus::PendingRetry;
                }
            }
            self.submit_job(dag_id, job_name).await;
            return;
        }

        let status = polled
            .and_then(|s| s.execution_status())
            .unwrap_or(ExecutionStatus::Pending);
        if status.is_job_terminal() {
            self.finish_job(dag_id, job_name, status).await;
        }
    }

    /// Kill the node when the flow's deadline has passed. The deadline is
    /// memoised per DAG; strict `>` at the boundary.
    async fn sla_kill_if_needed(&mut self, dag_id: &DagId, job_name: &str, now_ms: u64) -> bool {
        let deadline = match self.dag_to_sla.get(dag_id) {
            Some(deadline) => *deadline,
            None => {
                let Some(dag) = self.dags.get(dag_id) else {
                    return false;
                };
                let deadline = match dag.flow_sla_secs().or(self.ctx.config.flow_sla_secs) {
                    Some(sla_secs) => dag
                        .flow_start_time_ms()
                        .saturating_add(sla_secs.saturating_mul(1000)),
                    None => u64::MAX,
                };
                self.dag_to_sla.insert(dag_id.clone(), deadline);
                deadline
            }
        };
        if now_ms <= deadline {
            return false;
        }

        warn!(dag_id = %dag_id, job = job_name, "flow run deadline exceeded, cancelling job");
        self.cancel_job(dag_id, job_name, "flow run deadline exceeded")
            .await;
        if let Some(dag) = self.dags.get_mut(dag_id) {
            dag.flow_event = Some(FlowEvent::RunDeadlineExceeded);
            dag.message = Some("flow run deadline exceeded".to_string());
        }
        self.ctx.metrics.incr_run_sla_exceeded();
        true
    }

    /// Kill a job stuck in ORCHESTRATED past the start SLA. Strict `>`.
    async fn kill_if_orphaned(
        &mut self,
        dag_id: &DagId,
        job_name: &str,
        polled: Option<&JobStatus>,
        now_ms: u64,
    ) -> bool {
        let Some(status) = polled else {
            return false;
        };
        if status.execution_status() != Some(ExecutionStatus::Orchestrated)
            || status.orchestrated_time_ms == 0
        {
            return false;
        }
        let sla_ms = self.ctx.config.job_start_sla().as_millis() as u64;
        if now_ms <= status.orchestrated_time_ms.saturating_add(sla_ms) {
            return false;
        }

        warn!(dag_id = %dag_id, job = job_name, "job orphaned past start deadline, cancelling");
        self.cancel_job(dag_id, job_name, "job start deadline exceeded")
            .await;
        if let Some(dag) = self.dags.get_mut(dag_id) {
            dag.flow_event = Some(FlowEvent::StartDeadlineExceeded);
            dag.message = Some(format!("job {job_name} did not start within the SLA"));
        }
        self.ctx.metrics.incr_start_sla_exceeded();
        true
    }

    async fn finish_job(&mut self, dag_id: &DagId, job_name: &str, status: ExecutionStatus) {
        if let Some(node) = self.dags.get_mut(dag_id).and_then(|d| d.node_mut(job_name)) {
            node.plan.status = status;
        }
        self.on_job_finish(dag_id, job_name, status).await;
        self.delete_job_state(dag_id, job_name);
    }

    /// Finish policy by terminal status. Quota is released for every
    /// terminal status so acquires and releases pair exactly once.
    async fn on_job_finish(&mut self, dag_id: &DagId, job_name: &str, status: ExecutionStatus) {
        info!(dag_id = %dag_id, job = job_name, status = %status, "job finished");
        let Some(node) = self.dags.get(dag_id).and_then(|d| d.node(job_name)).cloned() else {
            return;
        };
        let released = self.ctx.quota.release_quota(dag_id, &node);
        debug!(dag_id = %dag_id, job = job_name, released, "quota released");

        match status {
            ExecutionStatus::Complete => {
                self.ctx.metrics.incr_jobs_succeeded();
                self.submit_next(dag_id).await;
            }
            ExecutionStatus::Failed => {
                self.ctx.metrics.incr_jobs_failed();
                let option = self
                    .dags
                    .get(dag_id)
                    .map(|d| self.resolved_failure_option(d))
                    .unwrap_or_default();
                if let Some(dag) = self.dags.get_mut(dag_id) {
                    dag.message = Some(format!("flow failed because job {job_name} failed"));
                    dag.flow_event = Some(FlowEvent::Failed);
                }
                if option == FailureOption::Cancel {
                    self.cancel_remaining(dag_id, job_name).await;
                }
            }
            ExecutionStatus::Cancelled => {
                if let Some(dag) = self.dags.get_mut(dag_id) {
                    // Keep a deadline-exceeded event when one is pending.
                    if dag.flow_event.is_none() {
                        dag.flow_event = Some(FlowEvent::Cancelled);
                    }
                }
            }
            _ => {}
        }
    }

    /// CANCEL failure option: stop the rest of the DAG right away.
    async fn cancel_remaining(&mut self, dag_id: &DagId, failed_job: &str) {
        let remaining: Vec<String> = self
            .dag_to_jobs
            .get(dag_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|j| j != failed_job)
            .collect();
        for job_name in remaining {
            self.cancel_job(dag_id, &job_name, "sibling job failed under CANCEL failure option")
                .await;
        }
    }
}
