// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{single_job_dag, DagBuilder};

fn diamond() -> Dag {
    // a → {b, c} → d
    DagBuilder::new()
        .job("a", &[])
        .job("b", &["a"])
        .job("c", &["a"])
        .job("d", &["b", "c"])
        .build()
}

#[test]
fn add_node_rejects_duplicates() {
    let mut dag = single_job_dag(100);
    let node = dag.node("job0").unwrap().clone();
    assert_eq!(dag.add_node(node), Err(DagError::DuplicateNode("job0".into())));
}

#[test]
fn add_node_rejects_unknown_parent() {
    let mut dag = Dag::new(DagId::new("g", "f", 1));
    let plan = JobExecutionPlan::new(JobSpec::new("job:g/f/x", "g", "x"), "executor://local", 1);
    let err = dag.add_node(JobNode {
        name: "x".into(),
        parents: vec!["missing".into()],
        plan,
    });
    assert_eq!(
        err,
        Err(DagError::UnknownParent {
            node: "x".into(),
            parent: "missing".into()
        })
    );
}

#[test]
fn ready_nodes_starts_with_roots() {
    let dag = diamond();
    assert_eq!(dag.ready_nodes(), vec!["a".to_string()]);
}

#[test]
fn ready_nodes_unblocks_children_when_all_parents_complete() {
    let mut dag = diamond();
    dag.node_mut("a").unwrap().plan.status = ExecutionStatus::Complete;
    assert_eq!(dag.ready_nodes(), vec!["b".to_string(), "c".to_string()]);

    dag.node_mut("b").unwrap().plan.status = ExecutionStatus::Complete;
    // d still blocked on c
    assert_eq!(dag.ready_nodes(), vec!["c".to_string()]);

    dag.node_mut("c").unwrap().plan.status = ExecutionStatus::Complete;
    assert_eq!(dag.ready_nodes(), vec!["d".to_string()]);
}

#[test]
fn failed_parent_never_unblocks_children() {
    let mut dag = diamond();
    dag.node_mut("a").unwrap().plan.status = ExecutionStatus::Failed;
    assert!(dag.ready_nodes().is_empty());
}

#[test]
fn pending_resume_nodes_are_ready_once_parents_complete() {
    let mut dag = diamond();
    dag.node_mut("a").unwrap().plan.status = ExecutionStatus::Complete;
    dag.node_mut("b").unwrap().plan.status = ExecutionStatus::PendingResume;
    let ready = dag.ready_nodes();
    assert!(ready.contains(&"b".to_string()));
}

#[test]
fn running_nodes_and_is_running() {
    let mut dag = diamond();
    assert!(!dag.is_running());
    dag.node_mut("a").unwrap().plan.status = ExecutionStatus::Running;
    assert!(dag.is_running());
    assert_eq!(dag.running_nodes(), vec!["a".to_string()]);
}

#[test]
fn flow_start_time_is_restartable() {
    let mut dag = diamond();
    assert_eq!(dag.flow_start_time_ms(), 100);
    dag.set_flow_start_time_ms(9_999);
    assert!(dag.nodes().all(|n| n.plan.flow_start_time_ms == 9_999));
}

#[test]
fn flow_sla_read_from_spec_config() {
    let dag = DagBuilder::new().flow_sla_secs(7).job("job0", &[]).build();
    assert_eq!(dag.flow_sla_secs(), Some(7));
    assert_eq!(single_job_dag(100).flow_sla_secs(), None);
}

#[test]
fn serde_round_trip_skips_submission_handle() {
    use futures_util::FutureExt;

    let mut dag = single_job_dag(100);
    let fut: SubmissionFuture = async { Ok(SubmissionAck::default()) }.boxed().shared();
    dag.node_mut("job0").unwrap().plan.submission = Some(SubmissionHandle(fut));

    let json = serde_json::to_string(&dag).unwrap();
    let back: Dag = serde_json::from_str(&json).unwrap();
    assert!(back.node("job0").unwrap().plan.submission.is_none());
    assert_eq!(back.id, dag.id);
    assert_eq!(back.len(), 1);
}

#[test]
fn submission_handle_peeks_ack_only_once_resolved() {
    use futures_util::FutureExt;

    let unresolved: SubmissionFuture =
        futures_util::future::pending::<Result<SubmissionAck, SubmissionError>>()
            .boxed()
            .shared();
    assert!(SubmissionHandle(unresolved).ack().is_none());

    let ack = SubmissionAck {
        external_id: Some("ext-1".into()),
        execution_link: None,
    };
    let resolved: SubmissionFuture = futures_util::future::ready(Ok(ack.clone())).boxed().shared();
    let _ = resolved.clone().now_or_never();
    assert_eq!(SubmissionHandle(resolved).ack(), Some(ack));
}
