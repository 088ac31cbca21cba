// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn kill_action(exec: u64) -> DagAction {
    DagAction::kill(&DagId::new("group0", "flow0", exec))
}

#[parameterized(
    launch = { DagActionType::Launch, "LAUNCH" },
    kill = { DagActionType::Kill, "KILL" },
    resume = { DagActionType::Resume, "RESUME" },
)]
fn action_type_names(action_type: DagActionType, name: &str) {
    assert_eq!(action_type.as_name(), name);
}

#[test]
fn action_preserves_dag_id() {
    let id = DagId::new("group0", "flow0", 100);
    assert_eq!(DagAction::resume(&id).dag_id(), id);
}

#[test]
fn fs_store_add_exists_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsDagActionStore::new(dir.path()).unwrap();
    let action = kill_action(100);

    assert!(!store.exists(&action).unwrap());
    store.add(&action).unwrap();
    assert!(store.exists(&action).unwrap());

    // The same dag may carry several action types at once.
    let resume = DagAction::resume(&action.dag_id());
    store.add(&resume).unwrap();
    assert_eq!(store.get_actions().unwrap().len(), 2);

    store.delete(&action).unwrap();
    assert!(!store.exists(&action).unwrap());
    assert!(store.exists(&resume).unwrap());

    // Deleting an absent action is a no-op.
    store.delete(&action).unwrap();
}

#[test]
fn in_memory_store_add_exists_delete() {
    let store = InMemoryDagActionStore::new();
    let action = kill_action(100);
    store.add(&action).unwrap();
    assert!(store.exists(&action).unwrap());
    assert_eq!(store.get_actions().unwrap(), vec![action.clone()]);
    store.delete(&action).unwrap();
    assert!(store.get_actions().unwrap().is_empty());
}
