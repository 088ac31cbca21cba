// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{
    RecordingCatalog, RecordingEmitter, RecordingSpecProducer, ScriptedStatusRetriever,
};
use fd_core::test_support::{single_job_dag, TEST_EXECUTOR_URI};
use fd_storage::{DagActionStore, DagStateStore, InMemoryDagActionStore, InMemoryDagStateStore};
use proptest::prelude::*;
use std::time::Duration;
use yare::parameterized;

struct ManagerHarness {
    manager: Arc<DagManager>,
    producer: Arc<RecordingSpecProducer>,
    status: Arc<ScriptedStatusRetriever>,
    emitter: Arc<RecordingEmitter>,
    live_store: Arc<InMemoryDagStateStore>,
    failed_store: Arc<InMemoryDagStateStore>,
    action_store: Arc<InMemoryDagActionStore>,
    catalog: Arc<RecordingCatalog>,
}

fn harness() -> ManagerHarness {
    harness_with_config(DagManagerConfig {
        polling_interval_secs: 1,
        dag_state_store: "memory".to_string(),
        ..DagManagerConfig::default()
    })
}

fn harness_with_config(config: DagManagerConfig) -> ManagerHarness {
    let producer = Arc::new(RecordingSpecProducer::new());
    let status = Arc::new(ScriptedStatusRetriever::new());
    let emitter = Arc::new(RecordingEmitter::new());
    let live_store = Arc::new(InMemoryDagStateStore::new());
    let failed_store = Arc::new(InMemoryDagStateStore::new());
    let action_store = Arc::new(InMemoryDagActionStore::new());
    let catalog = Arc::new(RecordingCatalog::new());

    let mut topology: HashMap<String, Arc<dyn SpecProducer>> = HashMap::new();
    topology.insert(TEST_EXECUTOR_URI.to_string(), producer.clone());

    let manager = DagManager::builder(config, status.clone())
        .live_store(live_store.clone())
        .failed_store(failed_store.clone())
        .action_store(action_store.clone())
        .emitter(emitter.clone())
        .flow_catalog(catalog.clone())
        .topology(topology)
        .build()
        .expect("manager builds");

    ManagerHarness {
        manager,
        producer,
        status,
        emitter,
        live_store,
        failed_store,
        action_store,
        catalog,
    }
}

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(10), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for: {what}");
}

#[parameterized(
    exec_100 = { 100, 1 },
    exec_101 = { 101, 2 },
    exec_102 = { 102, 0 },
)]
fn routing_matches_execution_id_modulo_shards(execution_id: u64, expected: usize) {
    assert_eq!(shard_for(execution_id, 3), expected);
}

proptest! {
    #[test]
    fn routing_is_stable_and_in_range(execution_id in any::<u64>(), shards in 1usize..16) {
        let shard = shard_for(execution_id, shards);
        prop_assert!(shard < shards);
        prop_assert_eq!(shard, shard_for(execution_id, shards));
    }
}

#[tokio::test]
async fn inactive_manager_mutates_nothing() {
    let h = harness();
    let dag = single_job_dag(100);
    let dag_id = dag.id.clone();
    let launch = fd_storage::DagAction::launch(&dag_id);
    h.action_store.add(&launch).unwrap();

    h.manager.add_dag(dag, true, true).unwrap();
    h.manager
        .handle_kill_flow_request("group0", "flow0", 100)
        .unwrap();
    h.manager
        .handle_resume_flow_request("group0", "flow0", 100)
        .unwrap();
    h.manager.stop_dag(&FlowId::new("group0", "flow0")).unwrap();

    // Nothing persisted, nothing emitted, the launch action survives.
    assert!(h.live_store.get_dag(&dag_id).unwrap().is_none());
    assert!(h.emitter.events().is_empty());
    assert!(h.action_store.exists(&launch).unwrap());
    assert_eq!(h.producer.submission_count(), 0);
}

#[tokio::test]
async fn add_dag_persists_clears_launch_action_and_announces_pending() {
    let h = harness();
    h.manager.set_active(true).await.unwrap();
    let dag = single_job_dag(100);
    let dag_id = dag.id.clone();
    let launch = fd_storage::DagAction::launch(&dag_id);
    h.action_store.add(&launch).unwrap();

    h.manager.add_dag(dag, true, true).unwrap();
    assert!(h.live_store.get_dag(&dag_id).unwrap().is_some());
    assert!(!h.action_store.exists(&launch).unwrap());
    assert_eq!(h.emitter.count("FLOW_PENDING", &dag_id), 1);

    wait_until("dag dispatched", || h.producer.submission_count() == 1).await;
    h.manager.set_active(false).await.unwrap();
}

#[tokio::test]
async fn activation_recovers_persisted_dags() {
    let h = harness();
    let dag = single_job_dag(100);
    let dag_id = dag.id.clone();
    h.live_store.write_checkpoint(&dag).unwrap();

    h.manager.set_active(true).await.unwrap();
    wait_until("recovered dag dispatched", || {
        h.producer.submission_count() == 1
    })
    .await;

    // Drive it to completion and confirm cleanup of the live store.
    h.status.set_job_event(&dag_id, "job0", "COMPLETE");
    h.status.set_flow_event(&dag_id, "COMPLETE");
    wait_until("live store cleaned", || {
        h.live_store.get_dag(&dag_id).unwrap().is_none()
    })
    .await;
    assert_eq!(h.emitter.count("FLOW_SUCCEEDED", &dag_id), 1);
    h.manager.set_active(false).await.unwrap();
}

#[tokio::test]
async fn sticky_kill_reaches_the_owning_shard_for_each_execution() {
    let h = harness();
    h.manager.set_active(true).await.unwrap();
    let flow = FlowId::new("group0", "flow0");

    // Executions 100, 101, 102 land on shards 1, 2, 0 with N = 3.
    for execution_id in [100, 101, 102] {
        let dag = single_job_dag(execution_id);
        h.manager.add_dag(dag, true, false).unwrap();
    }
    wait_until("all three dispatched", || h.producer.submission_count() == 3).await;

    h.status
        .set_latest_execution_ids(&flow, vec![100, 101, 102]);
    for execution_id in [100, 101, 102] {
        h.action_store
            .add(&fd_storage::DagAction::kill(&flow.execution(execution_id)))
            .unwrap();
    }
    h.manager.stop_dag(&flow).unwrap();

    wait_until("all three cancelled", || h.producer.cancel_count() == 3).await;
    // Every cancel carried the submission handle only the owning shard
    // holds, and every KILL action was cleared.
    for (_, props) in h.producer.cancelled() {
        assert!(props.serialized_response.is_some());
    }
    wait_until("kill actions deleted", || {
        h.action_store.get_actions().unwrap().is_empty()
    })
    .await;
    h.manager.set_active(false).await.unwrap();
}

#[tokio::test]
async fn deactivation_stops_the_shards_and_gates_new_work() {
    let h = harness();
    h.manager.set_active(true).await.unwrap();
    assert!(h.manager.is_active());
    h.manager.set_active(false).await.unwrap();
    assert!(!h.manager.is_active());

    let dag = single_job_dag(100);
    let dag_id = dag.id.clone();
    h.manager.add_dag(dag, true, false).unwrap();
    assert!(h.live_store.get_dag(&dag_id).unwrap().is_none());

    // A second deactivation is a no-op.
    h.manager.set_active(false).await.unwrap();
}

#[tokio::test]
async fn repeated_activation_is_idempotent() {
    let h = harness();
    h.manager.set_active(true).await.unwrap();
    h.manager.set_active(true).await.unwrap();
    assert!(h.manager.is_active());
    h.manager.set_active(false).await.unwrap();
}

#[tokio::test]
async fn double_offer_of_the_same_dag_is_admitted_once() {
    let h = harness();
    h.manager.set_active(true).await.unwrap();
    let dag = single_job_dag(100);
    h.manager.add_dag(dag.clone(), true, false).unwrap();
    h.manager.add_dag(dag, false, false).unwrap();

    wait_until("first copy dispatched", || h.producer.submission_count() >= 1).await;
    // Give the shard time to drain both offers; the duplicate is dropped.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(h.producer.submission_count(), 1);
    h.manager.set_active(false).await.unwrap();
}

#[tokio::test]
async fn adhoc_flow_spec_is_removed_only_when_admitted() {
    let h = harness();
    let adhoc = FlowSpec::adhoc("flow:group0/flow0");

    // Inactive: dropped, catalog untouched.
    h.manager
        .add_dag_and_remove_adhoc_flow_spec(&adhoc, single_job_dag(100), true, false)
        .unwrap();
    assert!(h.catalog.removed().is_empty());

    h.manager.set_active(true).await.unwrap();
    h.manager
        .add_dag_and_remove_adhoc_flow_spec(&adhoc, single_job_dag(101), true, false)
        .unwrap();
    assert_eq!(h.catalog.removed(), vec!["flow:group0/flow0".to_string()]);

    // A scheduled flow stays in the catalog.
    let scheduled = FlowSpec {
        uri: "flow:group0/scheduled".to_string(),
        schedule: Some("0 0 * * *".to_string()),
    };
    h.manager
        .add_dag_and_remove_adhoc_flow_spec(&scheduled, single_job_dag(102), true, false)
        .unwrap();
    assert_eq!(h.catalog.removed().len(), 1);
    h.manager.set_active(false).await.unwrap();
}

#[tokio::test]
async fn action_listener_routes_kills_and_resumes() {
    let h = harness();
    h.manager.set_active(true).await.unwrap();
    let dag = single_job_dag(100);
    let dag_id = dag.id.clone();
    h.manager.add_dag(dag, true, false).unwrap();
    wait_until("dispatched", || h.producer.submission_count() == 1).await;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let listener = h.manager.spawn_action_listener(rx);
    tx.send(fd_storage::DagAction::kill(&dag_id)).unwrap();
    wait_until("kill routed and executed", || h.producer.cancel_count() == 1).await;

    drop(tx);
    let _ = listener.await;
    h.manager.set_active(false).await.unwrap();
}
