// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable log of pending external actions (LAUNCH / KILL / RESUME).
//!
//! Actions re-drive operations across leader changes: the orchestrator
//! records an action before invoking the manager, and the worker deletes it
//! once the request has been absorbed.

use crate::dag_store::StoreError;
use fd_core::DagId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DagActionType {
    Launch,
    Kill,
    Resume,
}

impl DagActionType {
    pub fn as_name(self) -> &'static str {
        match self {
            Self::Launch => "LAUNCH",
            Self::Kill => "KILL",
            Self::Resume => "RESUME",
        }
    }
}

impl std::fmt::Display for DagActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_name())
    }
}

/// One pending action, keyed by (group, name, execution id, type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagAction {
    pub flow_group: String,
    pub flow_name: String,
    pub flow_execution_id: u64,
    pub action_type: DagActionType,
}

impl DagAction {
    pub fn new(dag_id: &DagId, action_type: DagActionType) -> Self {
        Self {
            flow_group: dag_id.flow_group.clone(),
            flow_name: dag_id.flow_name.clone(),
            flow_execution_id: dag_id.flow_execution_id,
            action_type,
        }
    }

    pub fn launch(dag_id: &DagId) -> Self {
        Self::new(dag_id, DagActionType::Launch)
    }

    pub fn kill(dag_id: &DagId) -> Self {
        Self::new(dag_id, DagActionType::Kill)
    }

    pub fn resume(dag_id: &DagId) -> Self {
        Self::new(dag_id, DagActionType::Resume)
    }

    pub fn dag_id(&self) -> DagId {
        DagId::new(
            self.flow_group.clone(),
            self.flow_name.clone(),
            self.flow_execution_id,
        )
    }
}

pub trait DagActionStore: Send + Sync {
    fn add(&self, action: &DagAction) -> Result<(), StoreError>;
    fn delete(&self, action: &DagAction) -> Result<(), StoreError>;
    fn exists(&self, action: &DagAction) -> Result<bool, StoreError>;
    fn get_actions(&self) -> Result<Vec<DagAction>, StoreError>;
}

/// Filesystem-backed action log: one JSON file per action, named
/// `<group>_<name>_<execId>_<TYPE>.json`.
pub struct FsDagActionStore {
    dir: PathBuf,
}

impl FsDagActionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn action_path(&self, action: &DagAction) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}_{}.json",
            action.flow_group, action.flow_name, action.flow_execution_id, action.action_type
        ))
    }
}

impl DagActionStore for FsDagActionStore {
    fn add(&self, action: &DagAction) -> Result<(), StoreError> {
        let path = self.action_path(action);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(action)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, action: &DagAction) -> Result<(), StoreError> {
        let path = self.action_path(action);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn exists(&self, action: &DagAction) -> Result<bool, StoreError> {
        Ok(self.action_path(action).exists())
    }

    fn get_actions(&self) -> Result<Vec<DagAction>, StoreError> {
        let mut actions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            actions.push(serde_json::from_slice(&bytes)?);
        }
        Ok(actions)
    }
}

#[derive(Default)]
pub struct InMemoryDagActionStore {
    actions: Mutex<HashSet<DagAction>>,
}

impl InMemoryDagActionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DagActionStore for InMemoryDagActionStore {
    fn add(&self, action: &DagAction) -> Result<(), StoreError> {
        self.actions.lock().insert(action.clone());
        Ok(())
    }

    fn delete(&self, action: &DagAction) -> Result<(), StoreError> {
        self.actions.lock().remove(action);
        Ok(())
    }

    fn exists(&self, action: &DagAction) -> Result<bool, StoreError> {
        Ok(self.actions.lock().contains(action))
    }

    fn get_actions(&self) -> Result<Vec<DagAction>, StoreError> {
        Ok(self.actions.lock().iter().cloned().collect())
    }
}

#[cfg(test)]
#[path = "action_store_tests.rs"]
mod tests;
