// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cleanup: classify finished DAGs, emit their terminal event, and delete
//! durable state only after the status store confirms.

use super::DagWorker;
use fd_core::{Clock, DagId, FailureOption, FlowEvent};
use tracing::{info, warn};

impl<C: Clock> DagWorker<C> {
    /// Pass A: enroll DAGs with no running jobs for cleanup, stamping and
    /// emitting their terminal flow event. Failed/cancelled DAGs under
    /// FINISH_RUNNING first stop driving whatever is still active.
    pub(crate) fn classify_for_cleanup(&mut self) {
        let now_ms = self.ctx.clock.epoch_ms();
        let ids: Vec<DagId> = self.dags.keys().cloned().collect();
        for dag_id in ids {
            if self.dag_ids_to_clean.contains(&dag_id) {
                continue;
            }
            let (flow_event, option) = {
                let Some(dag) = self.dags.get(&dag_id) else {
                    continue;
                };
                (dag.flow_event, self.resolved_failure_option(dag))
            };
            let failed_like = matches!(
                flow_event,
                Some(FlowEvent::Failed | FlowEvent::Cancelled)
            );
            if failed_like && option == FailureOption::FinishRunning {
                self.drop_undriven_jobs(&dag_id);
            }
            if self.has_running_jobs(&dag_id) {
                continue;
            }

            self.dag_ids_to_clean.insert(dag_id.clone());
            let Some(dag) = self.dags.get_mut(&dag_id) else {
                continue;
            };
            if dag.flow_event.is_none() {
                dag.flow_event = Some(FlowEvent::Succeeded);
            }
            let Some(event) = dag.flow_event else {
                continue;
            };
            dag.event_emitted_time_ms = now_ms;
            let message = dag.message.clone();
            if !event.is_success() {
                if let Err(e) = self.ctx.failed_store.write_checkpoint(dag) {
                    warn!(dag_id = %dag_id, error = %e, "failed-store checkpoint failed");
                }
                self.ctx.add_failed_dag_id(dag_id.clone());
            }
            self.ctx.emit_flow_event(event, &dag_id, message);
            info!(dag_id = %dag_id, event = event.as_name(), "dag finished, awaiting confirmation");
        }
    }

    /// FINISH_RUNNING truncation: the remaining active nodes are no longer
    /// driven. Their quota is released here since they will never reach a
    /// terminal status under this shard.
    fn drop_undriven_jobs(&mut self, dag_id: &DagId) {
        let jobs = self.dag_to_jobs.get(dag_id).cloned().unwrap_or_default();
        if jobs.is_empty() {
            return;
        }
        info!(dag_id = %dag_id, count = jobs.len(), "dropping still-active jobs after failure");
        for job_name in jobs {
            if let Some(node) = self
                .dags
                .get(dag_id)
                .and_then(|d| d.node(&job_name))
                .cloned()
            {
                self.ctx.quota.release_quota(dag_id, &node);
            }
            self.delete_job_state(dag_id, &job_name);
        }
    }

    /// Pass B: delete durable state once the status store reports a
    /// terminal flow status; re-emit the stored flow event when the store
    /// stays silent past the tolerance.
    pub(crate) fn confirm_and_clean(&mut self) {
        let now_ms = self.ctx.clock.epoch_ms();
        let tolerance_ms = self.ctx.config.flow_status_tolerance().as_millis() as u64;
        let pending: Vec<DagId> = self.dag_ids_to_clean.iter().cloned().collect();
        for dag_id in pending {
            let Some(dag) = self.dags.get(&dag_id) else {
                self.dag_ids_to_clean.remove(&dag_id);
                continue;
            };
            let confirmed = self
                .ctx
                .status_retriever
                .flow_status(&dag_id)
                .and_then(|s| s.execution_status())
                .is_some_and(|s| s.is_flow_terminal());

            if confirmed {
                if let Some(event) = dag.flow_event {
                    self.ctx.metrics.record_flow_terminal(event);
                }
                self.clean_up_dag(&dag_id);
            } else if now_ms.saturating_sub(dag.event_emitted_time_ms) > tolerance_ms {
                let event = dag.flow_event;
                let message = dag.message.clone();
                if let Some(event) = event {
                    info!(dag_id = %dag_id, event = event.as_name(), "re-emitting unconfirmed flow event");
                    self.ctx.emit_flow_event(event, &dag_id, message);
                }
                if let Some(dag) = self.dags.get_mut(&dag_id) {
                    dag.event_emitted_time_ms = now_ms;
                }
            }
        }
    }

    fn clean_up_dag(&mut self, dag_id: &DagId) {
        info!(dag_id = %dag_id, "cleaning up dag");
        if let Some(dag) = self.dags.get_mut(dag_id) {
            dag.flow_event = None;
        }
        if let Err(e) = self.ctx.live_store.clean_up(dag_id) {
            warn!(dag_id = %dag_id, error = %e, "live store cleanup failed");
        }
        self.dags.remove(dag_id);
        self.dag_to_jobs.remove(dag_id);
        self.dag_to_sla.remove(dag_id);
        self.dag_ids_to_clean.remove(dag_id);
    }
}
