// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios over the scheduled manager: real shard tasks on a
//! short cadence, fake executor and status store.

use fd_core::test_support::{single_job_dag, TEST_EXECUTOR_URI};
use fd_core::FlowId;
use fd_engine::test_support::{RecordingEmitter, RecordingSpecProducer, ScriptedStatusRetriever};
use fd_engine::{DagManager, DagManagerConfig, SpecProducer};
use fd_storage::{DagAction, DagActionStore, DagStateStore, InMemoryDagActionStore, InMemoryDagStateStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct Deployment {
    manager: Arc<DagManager>,
    producer: Arc<RecordingSpecProducer>,
    status: Arc<ScriptedStatusRetriever>,
    emitter: Arc<RecordingEmitter>,
    live_store: Arc<InMemoryDagStateStore>,
    action_store: Arc<InMemoryDagActionStore>,
}

fn deploy() -> Deployment {
    let config = DagManagerConfig {
        polling_interval_secs: 1,
        dag_state_store: "memory".to_string(),
        ..DagManagerConfig::default()
    };
    let producer = Arc::new(RecordingSpecProducer::new());
    let status = Arc::new(ScriptedStatusRetriever::new());
    let emitter = Arc::new(RecordingEmitter::new());
    let live_store = Arc::new(InMemoryDagStateStore::new());
    let action_store = Arc::new(InMemoryDagActionStore::new());

    let mut topology: HashMap<String, Arc<dyn SpecProducer>> = HashMap::new();
    topology.insert(TEST_EXECUTOR_URI.to_string(), producer.clone());

    let manager = DagManager::builder(config, status.clone())
        .live_store(live_store.clone())
        .failed_store(Arc::new(InMemoryDagStateStore::new()))
        .action_store(action_store.clone())
        .emitter(emitter.clone())
        .topology(topology)
        .build()
        .expect("manager builds");

    Deployment {
        manager,
        producer,
        status,
        emitter,
        live_store,
        action_store,
    }
}

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(15), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for: {what}");
}

#[tokio::test]
async fn single_job_flow_runs_to_confirmed_cleanup() {
    let d = deploy();
    d.manager.set_active(true).await.expect("activates");

    let dag = single_job_dag(100);
    let dag_id = dag.id.clone();
    d.manager.add_dag(dag, true, true).expect("admitted");
    assert!(d.live_store.get_dag(&dag_id).expect("store read").is_some());

    wait_until("job dispatched once", || d.producer.submission_count() == 1).await;

    d.status.set_job_event(&dag_id, "job0", "COMPLETE");
    d.status.set_flow_event(&dag_id, "COMPLETE");

    wait_until("live store cleaned after confirmation", || {
        d.live_store.get_dag(&dag_id).expect("store read").is_none()
    })
    .await;
    assert_eq!(d.producer.submission_count(), 1);
    assert_eq!(d.emitter.count("FLOW_PENDING", &dag_id), 1);
    assert_eq!(d.emitter.count("FLOW_RUNNING", &dag_id), 1);
    assert_eq!(d.emitter.count("FLOW_SUCCEEDED", &dag_id), 1);

    d.manager.set_active(false).await.expect("deactivates");
}

#[tokio::test]
async fn stop_dag_kills_every_recent_execution_on_its_owning_shard() {
    let d = deploy();
    d.manager.set_active(true).await.expect("activates");
    let flow = FlowId::new("group0", "flow0");

    for execution_id in [100, 101, 102] {
        d.manager
            .add_dag(single_job_dag(execution_id), true, false)
            .expect("admitted");
        d.action_store
            .add(&DagAction::kill(&flow.execution(execution_id)))
            .expect("action recorded");
    }
    wait_until("all executions dispatched", || {
        d.producer.submission_count() == 3
    })
    .await;

    d.status
        .set_latest_execution_ids(&flow, vec![100, 101, 102]);
    d.manager.stop_dag(&flow).expect("stop accepted");

    wait_until("every execution cancelled", || d.producer.cancel_count() == 3).await;
    // Only the owning shard holds the submission handle; its presence in
    // every cancel proves sticky routing.
    for (_, props) in d.producer.cancelled() {
        assert!(props.serialized_response.is_some());
    }
    wait_until("kill actions cleared", || {
        d.action_store.get_actions().expect("action read").is_empty()
    })
    .await;

    d.manager.set_active(false).await.expect("deactivates");
}
