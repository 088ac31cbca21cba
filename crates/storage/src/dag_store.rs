// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key/value store of serialized DAGs, keyed by `DagId`.

use fd_core::{Dag, DagId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown store implementation {0:?}")]
    UnknownImpl(String),
}

/// Durable checkpoint store for DAGs. Implementations must be safe for
/// concurrent callers; cross-leader serialisation is enforced externally.
pub trait DagStateStore: Send + Sync {
    fn write_checkpoint(&self, dag: &Dag) -> Result<(), StoreError>;
    fn get_dag(&self, dag_id: &DagId) -> Result<Option<Dag>, StoreError>;
    fn get_dags(&self) -> Result<Vec<Dag>, StoreError>;
    fn get_dag_ids(&self) -> Result<HashSet<DagId>, StoreError>;
    fn clean_up(&self, dag_id: &DagId) -> Result<(), StoreError>;
}

/// Construct a state store implementation by its configured name.
pub fn state_store_by_name(name: &str, dir: &Path) -> Result<Arc<dyn DagStateStore>, StoreError> {
    match name {
        "fs" => Ok(Arc::new(FsDagStateStore::new(dir)?)),
        "memory" => Ok(Arc::new(InMemoryDagStateStore::new())),
        other => Err(StoreError::UnknownImpl(other.to_string())),
    }
}

/// Filesystem-backed store: one JSON document per DAG under a directory,
/// named `<dag_id>.json`, written atomically (temp file + rename).
pub struct FsDagStateStore {
    dir: PathBuf,
}

impl FsDagStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn dag_path(&self, dag_id: &DagId) -> PathBuf {
        self.dir.join(format!("{dag_id}.json"))
    }
}

impl DagStateStore for FsDagStateStore {
    fn write_checkpoint(&self, dag: &Dag) -> Result<(), StoreError> {
        let path = self.dag_path(&dag.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(dag)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get_dag(&self, dag_id: &DagId) -> Result<Option<Dag>, StoreError> {
        let path = self.dag_path(dag_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn get_dags(&self) -> Result<Vec<Dag>, StoreError> {
        let mut dags = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            // Unreadable documents are skipped; the housekeeping re-sync
            // retries them on its next pass.
            match fs::read(&path).map_err(StoreError::from).and_then(|bytes| {
                serde_json::from_slice::<Dag>(&bytes).map_err(StoreError::from)
            }) {
                Ok(dag) => dags.push(dag),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable dag document"),
            }
        }
        Ok(dags)
    }

    fn get_dag_ids(&self) -> Result<HashSet<DagId>, StoreError> {
        let mut ids = HashSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match DagId::parse(stem) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping foreign file in dag store"),
            }
        }
        Ok(ids)
    }

    fn clean_up(&self, dag_id: &DagId) -> Result<(), StoreError> {
        let path = self.dag_path(dag_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-memory store holding the serialized form, so round-trip semantics
/// (including the serde-skipped submission handles) match the fs store.
#[derive(Default)]
pub struct InMemoryDagStateStore {
    dags: Mutex<HashMap<DagId, String>>,
}

impl InMemoryDagStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DagStateStore for InMemoryDagStateStore {
    fn write_checkpoint(&self, dag: &Dag) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(dag)?;
        self.dags.lock().insert(dag.id.clone(), serialized);
        Ok(())
    }

    fn get_dag(&self, dag_id: &DagId) -> Result<Option<Dag>, StoreError> {
        match self.dags.lock().get(dag_id) {
            Some(serialized) => Ok(Some(serde_json::from_str(serialized)?)),
            None => Ok(None),
        }
    }

    fn get_dags(&self) -> Result<Vec<Dag>, StoreError> {
        self.dags
            .lock()
            .values()
            .map(|s| serde_json::from_str(s).map_err(StoreError::from))
            .collect()
    }

    fn get_dag_ids(&self) -> Result<HashSet<DagId>, StoreError> {
        Ok(self.dags.lock().keys().cloned().collect())
    }

    fn clean_up(&self, dag_id: &DagId) -> Result<(), StoreError> {
        self.dags.lock().remove(dag_id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "dag_store_tests.rs"]
mod tests;
