// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::DagManagerConfig;
use crate::test_support::WorkerHarness;
use fd_core::test_support::single_job_dag;
use fd_storage::DagStateStore;

fn harness_with_retention(retention_secs: u64) -> WorkerHarness {
    WorkerHarness::with_config(DagManagerConfig {
        failed_dag_retention_secs: retention_secs,
        ..DagManagerConfig::default()
    })
}

#[test]
fn purges_failed_dags_older_than_the_retention_bound() {
    let h = harness_with_retention(60);
    let old = single_job_dag(1_000);
    let fresh = single_job_dag(50_000);
    h.failed_store.write_checkpoint(&old).unwrap();
    h.failed_store.write_checkpoint(&fresh).unwrap();
    h.ctx.add_failed_dag_id(old.id.clone());
    h.ctx.add_failed_dag_id(fresh.id.clone());

    // old expired at 1_000 + 60_000; fresh expires at 110_000.
    h.clock.set_epoch_ms(61_001);
    FailedDagRetention::new(h.ctx.clone()).run_once();

    assert!(h.failed_store.get_dag(&old.id).unwrap().is_none());
    assert!(!h.ctx.failed_dag_contains(&old.id));
    assert!(h.failed_store.get_dag(&fresh.id).unwrap().is_some());
    assert!(h.ctx.failed_dag_contains(&fresh.id));
}

#[test]
fn retention_boundary_is_strict() {
    let h = harness_with_retention(60);
    let dag = single_job_dag(1_000);
    h.failed_store.write_checkpoint(&dag).unwrap();
    h.ctx.add_failed_dag_id(dag.id.clone());

    // Exactly at the bound the dag is kept.
    h.clock.set_epoch_ms(61_000);
    FailedDagRetention::new(h.ctx.clone()).run_once();
    assert!(h.ctx.failed_dag_contains(&dag.id));

    h.clock.set_epoch_ms(61_001);
    FailedDagRetention::new(h.ctx.clone()).run_once();
    assert!(!h.ctx.failed_dag_contains(&dag.id));
}

#[test]
fn zero_retention_disables_the_sweep() {
    let h = harness_with_retention(0);
    let dag = single_job_dag(1_000);
    h.failed_store.write_checkpoint(&dag).unwrap();
    h.ctx.add_failed_dag_id(dag.id.clone());

    h.clock.set_epoch_ms(u64::MAX / 2);
    FailedDagRetention::new(h.ctx.clone()).run_once();
    assert!(h.failed_store.get_dag(&dag.id).unwrap().is_some());
    assert!(h.ctx.failed_dag_contains(&dag.id));
}
