use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{CadenceError, Result};
use crate::model::SessionSnapshot;

/// Persistence collaborator offered a snapshot on every state change.
///
/// The engine never reads from the store on its own; callers load a snapshot
/// explicitly when they want to continue an interrupted run.
pub trait SnapshotStore: Send {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<()>;

    fn load(&self) -> Result<Option<SessionSnapshot>>;
}

/// Pretty-printed JSON file, rewritten on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl std::fmt::Display) -> CadenceError {
        CadenceError::store(self.path.display().to_string(), reason.to_string())
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json).map_err(|e| self.error(e))
    }

    fn load(&self) -> Result<Option<SessionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).map_err(|e| self.error(e))?;
        let snapshot = serde_json::from_str(&json).map_err(|e| self.error(e))?;
        Ok(Some(snapshot))
    }
}

/// Keeps every snapshot it is offered. Clones share the history.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    history: Arc<Mutex<Vec<SessionSnapshot>>>,
}

impl MemoryStore {
    pub fn history(&self) -> Vec<SessionSnapshot> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionSnapshot>> {
        Ok(self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned())
    }
}
