// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resume phases. Resume is split in two because status events are
//! eventually consistent: first the failed DAG is rewound and announced,
//! then re-initialisation waits until the status store has caught up.

use super::DagWorker;
use fd_core::{Clock, DagId, ExecutionStatus, FlowEvent, JobEvent};
use fd_storage::DagAction;
use tracing::{info, warn};

impl<C: Clock> DagWorker<C> {
    /// Drain the resume queue. A resume for a DAG that is not failed is a
    /// no-op: the action record is deleted and the request dropped.
    pub(crate) fn begin_resumes(&mut self) {
        while let Ok(dag_id) = self.resume_rx.try_recv() {
            if !self.ctx.failed_dag_contains(&dag_id) {
                info!(shard = self.shard, dag_id = %dag_id, "resume requested for dag that is not failed");
                self.ctx.delete_action(&DagAction::resume(&dag_id));
                continue;
            }
            if self.resuming_dags.contains_key(&dag_id) {
                // Duplicate request; the resume already under way absorbs it.
                self.ctx.delete_action(&DagAction::resume(&dag_id));
                continue;
            }
            match self.ctx.failed_store.get_dag(&dag_id) {
                Ok(Some(mut dag)) => {
                    let now_ms = self.ctx.clock.epoch_ms();
                    // The flow SLA restarts with the resume.
                    dag.set_flow_start_time_ms(now_ms);
                    for node in dag.nodes_mut() {
                        if matches!(
                            node.plan.status,
                            ExecutionStatus::Failed | ExecutionStatus::Cancelled
                        ) {
                            node.plan.status = ExecutionStatus::PendingResume;
                            node.plan.current_attempts = 0;
                            node.plan.job_generation += 1;
                        }
                    }
                    let resumed: Vec<String> = dag
                        .nodes()
                        .filter(|n| n.plan.status == ExecutionStatus::PendingResume)
                        .map(|n| n.name.clone())
                        .collect();
                    for job_name in &resumed {
                        self.ctx
                            .emit_job_event(JobEvent::PendingResume, &dag_id, job_name);
                    }
                    self.ctx
                        .emit_flow_event(FlowEvent::PendingResume, &dag_id, None);
                    info!(shard = self.shard, dag_id = %dag_id, jobs = resumed.len(), "dag entering resume");
                    self.resuming_dags.insert(dag_id, dag);
                }
                Ok(None) => {
                    warn!(shard = self.shard, dag_id = %dag_id, "resume requested but dag missing from failed store");
                    self.ctx.delete_action(&DagAction::resume(&dag_id));
                }
                // Keep the action so the request is re-driven later.
                Err(e) => warn!(shard = self.shard, dag_id = %dag_id, error = %e, "failed to load dag for resume"),
            }
        }
    }

    /// Re-initialise resuming DAGs once the status store reflects
    /// PENDING_RESUME and no job still reads FAILED or CANCELLED.
    pub(crate) async fn finish_resumes(&mut self) {
        let ready: Vec<DagId> = self
            .resuming_dags
            .keys()
            .filter(|dag_id| self.resume_confirmed(dag_id))
            .cloned()
            .collect();

        for dag_id in ready {
            let Some(dag) = self.resuming_dags.remove(&dag_id) else {
                continue;
            };
            if let Err(e) = self.ctx.live_store.write_checkpoint(&dag) {
                warn!(dag_id = %dag_id, error = %e, "checkpoint of resumed dag failed; retrying next pass");
                self.resuming_dags.insert(dag_id, dag);
                continue;
            }
            if let Err(e) = self.ctx.failed_store.clean_up(&dag_id) {
                warn!(dag_id = %dag_id, error = %e, "failed store cleanup failed");
            }
            self.ctx.delete_action(&DagAction::resume(&dag_id));
            self.ctx.remove_failed_dag_id(&dag_id);
            info!(shard = self.shard, dag_id = %dag_id, "resume confirmed, re-initialising");
            self.initialize(dag).await;
        }
    }

    fn resume_confirmed(&self, dag_id: &DagId) -> bool {
        let statuses = self.ctx.status_retriever.job_statuses(dag_id);
        let flow_pending_resume = statuses
            .iter()
            .find(|s| s.is_flow_level())
            .and_then(|s| s.execution_status())
            == Some(ExecutionStatus::PendingResume);
        let no_stale_failures = !statuses.iter().any(|s| {
            !s.is_flow_level()
                && matches!(
                    s.execution_status(),
                    Some(ExecutionStatus::Failed | ExecutionStatus::Cancelled)
                )
        });
        flow_pending_resume && no_stale_failures
    }
}
