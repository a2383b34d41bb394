//! Checkpoint stores.
//!
//! The engine writes the full [`WorkflowState`] after every stage transition,
//! keyed by session id and thread id. Resuming a session loads the latest
//! checkpoint and continues from its recorded stage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::state::WorkflowState;
use crate::{TRACING_TARGET_ENGINE, WorkflowError, WorkflowResult};

/// Shared handle to a checkpoint store.
pub type SharedCheckpointStore = Arc<dyn CheckpointStore>;

/// Keyed persistence of workflow state.
#[async_trait]
pub trait CheckpointStore: Send + Sync + std::fmt::Debug {
    /// Stores the state, replacing any previous checkpoint for the key.
    async fn save(&self, thread_id: &str, state: &WorkflowState) -> WorkflowResult<()>;

    /// Loads the latest checkpoint for the key.
    async fn load(&self, session_id: Uuid, thread_id: &str) -> WorkflowResult<Option<WorkflowState>>;

    /// Removes every checkpoint of the session.
    async fn remove(&self, session_id: Uuid) -> WorkflowResult<()>;
}

/// Returns the default thread id of a session.
pub fn default_thread_id(session_id: Uuid) -> String {
    session_id.to_string()
}

/// In-memory checkpoint store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    inner: Arc<RwLock<HashMap<(Uuid, String), WorkflowState>>>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored checkpoints.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, thread_id: &str, state: &WorkflowState) -> WorkflowResult<()> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((state.session_id, thread_id.to_string()), state.clone());
        Ok(())
    }

    async fn load(&self, session_id: Uuid, thread_id: &str) -> WorkflowResult<Option<WorkflowState>> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(session_id, thread_id.to_string()))
            .cloned())
    }

    async fn remove(&self, session_id: Uuid) -> WorkflowResult<()> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _), _| *id != session_id);
        Ok(())
    }
}

/// JSON-file checkpoint store.
///
/// Checkpoints live at `<root>/checkpoints/<session>/<thread>.json` and are
/// written through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store under the data directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join("checkpoints"),
        }
    }

    /// Returns the checkpoint directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.root.join(session_id.to_string())
    }

    fn path(&self, session_id: Uuid, thread_id: &str) -> WorkflowResult<PathBuf> {
        let valid = !thread_id.is_empty()
            && thread_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(WorkflowError::checkpoint(format!(
                "invalid thread id '{thread_id}'"
            )));
        }
        Ok(self.session_dir(session_id).join(format!("{thread_id}.json")))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, thread_id: &str, state: &WorkflowState) -> WorkflowResult<()> {
        let path = self.path(state.session_id, thread_id)?;
        let bytes = serde_json::to_vec_pretty(state)?;

        tokio::fs::create_dir_all(self.session_dir(state.session_id)).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::trace!(
            target: TRACING_TARGET_ENGINE,
            session_id = %state.session_id,
            stage = %state.stage,
            "Checkpoint written"
        );
        Ok(())
    }

    async fn load(&self, session_id: Uuid, thread_id: &str) -> WorkflowResult<Option<WorkflowState>> {
        let path = self.path(session_id, thread_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let state = serde_json::from_slice(&bytes)
            .map_err(|e| WorkflowError::checkpoint(format!("corrupt checkpoint {}: {e}", path.display())))?;
        Ok(Some(state))
    }

    async fn remove(&self, session_id: Uuid) -> WorkflowResult<()> {
        match tokio::fs::remove_dir_all(self.session_dir(session_id)).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
