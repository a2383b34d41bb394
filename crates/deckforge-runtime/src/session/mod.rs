//! Session registry.
//!
//! [`SessionManager`] owns every live session of the process. Each session
//! holds a published snapshot of its [`WorkflowState`] for readers and a run
//! lock. Workflow runs and every mutating operation hold that lock, so a
//! snapshot taken by a run is never overwritten by a concurrent edit.
//! Sessions that are not in memory are restored from their last checkpoint
//! on first access. Deleting a session cancels its background run before
//! its checkpoints are removed.

mod output;
mod settings;
mod view;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use deckforge_core::outline::Outline;
use deckforge_rig::backend::LlmConfig;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::AbortHandle;
use uuid::Uuid;

pub use self::output::{DECK_FILE_NAME, save_output};
pub use self::settings::ReflectionSettings;
pub use self::view::{GenerationResult, SessionSummary};
use crate::checkpoint::{SharedCheckpointStore, default_thread_id};
use crate::config::EngineConfig;
use crate::engine::{CollaboratorFactory, Workflow, WorkflowObserver};
use crate::overrides::RuntimeOverrides;
use crate::state::{WorkflowStage, WorkflowState};
use crate::{TRACING_TARGET_SESSION, WorkflowError, WorkflowResult};

/// One registered session.
#[derive(Debug)]
struct Session {
    id: Uuid,
    thread_id: String,
    state: RwLock<WorkflowState>,
    run_lock: Mutex<()>,
    cancelled: AtomicBool,
    background: std::sync::Mutex<Option<AbortHandle>>,
}

impl Session {
    fn new(state: WorkflowState) -> Self {
        Self {
            id: state.session_id,
            thread_id: default_thread_id(state.session_id),
            state: RwLock::new(state),
            run_lock: Mutex::new(()),
            cancelled: AtomicBool::new(false),
            background: std::sync::Mutex::new(None),
        }
    }

    /// Acquires the run lock, failing once the session has been deleted.
    async fn lock_run(&self) -> WorkflowResult<MutexGuard<'_, ()>> {
        let guard = self.run_lock.lock().await;
        if self.is_cancelled() {
            return Err(WorkflowError::SessionNotFound(self.id));
        }
        Ok(guard)
    }

    /// Records the background run so it can be aborted on deletion.
    fn track(&self, task: AbortHandle) {
        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            task.abort();
        } else {
            *background = Some(task);
        }
    }

    /// Flags the session as deleted and aborts its background run.
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let task = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> WorkflowState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, state: &WorkflowState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state.clone();
    }

    /// Applies `f` to the state if the stage is allowed, returning the new state.
    fn update<F>(
        &self,
        operation: &'static str,
        allowed: &[WorkflowStage],
        f: F,
    ) -> WorkflowResult<WorkflowState>
    where
        F: FnOnce(&mut WorkflowState) -> WorkflowResult<()>,
    {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !allowed.contains(&guard.stage) {
            return Err(WorkflowError::invalid_stage(operation, guard.stage));
        }
        let mut next = guard.clone();
        f(&mut next)?;
        *guard = next;
        Ok(guard.clone())
    }
}

impl WorkflowObserver for Session {
    fn on_step(&self, state: &WorkflowState) {
        self.publish(state);
    }

    fn on_progress(&self, progress: f64) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_progress(progress);
    }

    fn is_cancelled(&self) -> bool {
        Session::is_cancelled(self)
    }
}

struct Inner {
    config: EngineConfig,
    llm: LlmConfig,
    overrides: RuntimeOverrides,
    factory: Arc<dyn CollaboratorFactory>,
    checkpoints: SharedCheckpointStore,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

/// Process-wide session registry and workflow driver.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.len())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager.
    pub fn new(
        config: EngineConfig,
        llm: LlmConfig,
        factory: Arc<dyn CollaboratorFactory>,
        checkpoints: SharedCheckpointStore,
    ) -> Self {
        tracing::info!(
            target: TRACING_TARGET_SESSION,
            max_concurrent_sections = config.max_concurrent_sections,
            auto_save = config.auto_save_output,
            output_dir = %config.output_dir.display(),
            "Session manager initialized"
        );

        Self {
            inner: Arc::new(Inner {
                config,
                llm,
                overrides: RuntimeOverrides::new(),
                factory,
                checkpoints,
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Returns the base engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns the number of sessions in memory.
    pub fn len(&self) -> usize {
        self.registry_read().len()
    }

    /// Returns true if no session is in memory.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of sessions with a workflow run in flight.
    pub fn running(&self) -> usize {
        self.registry_read()
            .values()
            .filter(|session| session.run_lock.try_lock().is_err())
            .count()
    }

    /// Waits until every run in flight has paused, finished or been cancelled.
    ///
    /// Runs started while waiting are not awaited.
    pub async fn wait_idle(&self) {
        let sessions: Vec<Arc<Session>> = self.registry_read().values().cloned().collect();
        for session in sessions {
            drop(session.run_lock.lock().await);
        }
    }

    /// Creates a session and runs it until the outline is ready for review.
    pub async fn create_session(
        &self,
        requirement: impl Into<String>,
        supplement: Option<String>,
    ) -> WorkflowResult<WorkflowState> {
        let workflow = self.workflow().await?;
        let session_id = Uuid::new_v4();
        let state = WorkflowState::new(session_id, requirement, supplement);
        let session = Arc::new(Session::new(state));
        self.registry_write().insert(session_id, session.clone());

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            session_id = %session_id,
            "Session created"
        );

        let _guard = session.lock_run().await?;
        Ok(self.run(&session, workflow).await)
    }

    /// Returns a snapshot of the session's state.
    pub async fn state(&self, session_id: Uuid) -> WorkflowResult<WorkflowState> {
        Ok(self.session(session_id).await?.snapshot())
    }

    /// Returns the session's status.
    pub async fn status(&self, session_id: Uuid) -> WorkflowResult<SessionSummary> {
        let session = self.session(session_id).await?;
        let state = session.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(SessionSummary::from(&*state))
    }

    /// Returns the status of every session in memory, oldest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .registry_read()
            .values()
            .map(|session| {
                let state = session.state.read().unwrap_or_else(PoisonError::into_inner);
                SessionSummary::from(&*state)
            })
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    /// Replaces the outline of a session awaiting review.
    pub async fn update_outline(&self, session_id: Uuid, markdown: &str) -> WorkflowResult<Outline> {
        let session = self.session(session_id).await?;
        let outline = Outline::from_markdown(markdown);
        if outline.is_empty() {
            return Err(WorkflowError::EmptyOutline);
        }

        let _guard = session.lock_run().await?;
        let state = session.update("update_outline", &[WorkflowStage::OutlineGenerated], |state| {
            state.replace_outline(outline);
            state.transition(WorkflowStage::OutlineGenerated);
            Ok(())
        })?;
        self.checkpoint(&session, &state).await?;

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            session_id = %session_id,
            history = state.outline_history.len(),
            "Outline updated"
        );
        state.outline.ok_or(WorkflowError::EmptyOutline)
    }

    /// Restores the previous outline.
    ///
    /// Returns `None` when there is no previous outline.
    pub async fn undo_outline(&self, session_id: Uuid) -> WorkflowResult<Option<Outline>> {
        let session = self.session(session_id).await?;
        let _guard = session.lock_run().await?;
        let mut restored = false;
        let state = session.update("undo_outline", &[WorkflowStage::OutlineGenerated], |state| {
            restored = state.undo_outline();
            Ok(())
        })?;
        if !restored {
            return Ok(None);
        }

        self.checkpoint(&session, &state).await?;
        tracing::info!(target: TRACING_TARGET_SESSION, session_id = %session_id, "Outline restored");
        Ok(state.outline)
    }

    /// Confirms the outline and starts generation in the background.
    pub async fn confirm_outline(&self, session_id: Uuid) -> WorkflowResult<WorkflowState> {
        let session = self.session(session_id).await?;
        let workflow = self.workflow().await?;

        let state = {
            let _guard = session.lock_run().await?;
            let state =
                session.update("confirm_outline", &[WorkflowStage::OutlineGenerated], |state| {
                    state.reset_generation();
                    state.transition(WorkflowStage::OutlineConfirmed);
                    Ok(())
                })?;
            self.checkpoint(&session, &state).await?;
            state
        };

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            session_id = %session_id,
            "Outline confirmed, starting generation"
        );
        self.spawn_run(session, workflow);
        Ok(state)
    }

    /// Adds a supplementary requirement and regenerates the outline.
    pub async fn add_supplement(
        &self,
        session_id: Uuid,
        supplement: impl Into<String>,
    ) -> WorkflowResult<WorkflowState> {
        let session = self.session(session_id).await?;
        let workflow = self.workflow().await?;
        let supplement = supplement.into();

        let _guard = session.lock_run().await?;
        session.update(
            "add_supplement",
            &[WorkflowStage::OutlineGenerated, WorkflowStage::Error],
            |state| {
                state.supplement = Some(supplement).filter(|s| !s.trim().is_empty());
                state.error = None;
                state.set_progress(0.0);
                state.transition(WorkflowStage::Initial);
                Ok(())
            },
        )?;

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            session_id = %session_id,
            "Supplement added, regenerating outline"
        );
        Ok(self.run(&session, workflow).await)
    }

    /// Returns the final output of a completed session.
    pub async fn result(&self, session_id: Uuid) -> WorkflowResult<GenerationResult> {
        let state = self.completed_state(session_id, "get_result").await?;
        Ok(GenerationResult {
            session_id,
            deck_markdown: state.deck_markdown.unwrap_or_default(),
            components: state.components,
            slides: state.slides,
            pagination_warnings: state.pagination_warnings,
        })
    }

    /// Returns the deck document of a completed session.
    pub async fn export(&self, session_id: Uuid) -> WorkflowResult<String> {
        let state = self.completed_state(session_id, "export").await?;
        state.deck_markdown.ok_or(WorkflowError::NoComponents)
    }

    /// Removes the session and its checkpoints.
    ///
    /// A run advancing the session is cancelled and awaited first, so no
    /// checkpoint is written after the removal. The cancelled session stays
    /// registered until its checkpoints are gone, which keeps concurrent
    /// lookups from restoring it.
    pub async fn delete(&self, session_id: Uuid) -> WorkflowResult<()> {
        let existing = self.registry_read().get(&session_id).cloned();
        let _guard = match &existing {
            Some(session) => {
                session.cancel();
                Some(session.run_lock.lock().await)
            }
            None => None,
        };

        let persisted = self
            .inner
            .checkpoints
            .load(session_id, &default_thread_id(session_id))
            .await?
            .is_some();
        if existing.is_none() && !persisted {
            return Err(WorkflowError::SessionNotFound(session_id));
        }

        self.inner.checkpoints.remove(session_id).await?;
        self.registry_write().remove(&session_id);
        tracing::info!(target: TRACING_TARGET_SESSION, session_id = %session_id, "Session deleted");
        Ok(())
    }

    /// Loads a session from its checkpoint and continues any interrupted run.
    pub async fn resume(&self, session_id: Uuid) -> WorkflowResult<WorkflowState> {
        let session = self.session(session_id).await?;
        let state = session.snapshot();
        if Self::is_running_stage(state.stage) && session.run_lock.try_lock().is_ok() {
            let workflow = self.workflow().await?;
            tracing::info!(
                target: TRACING_TARGET_SESSION,
                session_id = %session_id,
                stage = %state.stage,
                "Resuming interrupted run"
            );
            self.spawn_run(session, workflow);
        }
        Ok(state)
    }

    fn is_running_stage(stage: WorkflowStage) -> bool {
        matches!(
            stage,
            WorkflowStage::OutlineConfirmed
                | WorkflowStage::ComponentGenerating
                | WorkflowStage::ComponentCompleted
                | WorkflowStage::Assembling
        )
    }

    async fn completed_state(
        &self,
        session_id: Uuid,
        operation: &'static str,
    ) -> WorkflowResult<WorkflowState> {
        let state = self.state(session_id).await?;
        if state.stage != WorkflowStage::Completed {
            return Err(WorkflowError::invalid_stage(operation, state.stage));
        }
        Ok(state)
    }

    /// Builds a workflow from the effective configuration.
    async fn workflow(&self) -> WorkflowResult<Workflow> {
        let llm = self.effective_llm_config()?;
        let (reflection, _) = self.effective_reflection_config()?;
        let config = EngineConfig {
            reflection,
            ..self.inner.config.clone()
        };
        let collaborators = self
            .inner
            .factory
            .collaborators(&llm, &config.reflection)
            .await?;
        Workflow::new(config, collaborators, self.inner.checkpoints.clone())
    }

    /// Looks the session up, restoring it from its checkpoint if needed.
    async fn session(&self, session_id: Uuid) -> WorkflowResult<Arc<Session>> {
        let existing = self.registry_read().get(&session_id).cloned();
        if let Some(session) = existing {
            return Ok(session);
        }

        let thread_id = default_thread_id(session_id);
        let state = self
            .inner
            .checkpoints
            .load(session_id, &thread_id)
            .await?
            .ok_or(WorkflowError::SessionNotFound(session_id))?;

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            session_id = %session_id,
            stage = %state.stage,
            "Session restored from checkpoint"
        );
        let session = self
            .registry_write()
            .entry(session_id)
            .or_insert_with(|| Arc::new(Session::new(state)))
            .clone();
        Ok(session)
    }

    fn spawn_run(&self, session: Arc<Session>, workflow: Workflow) {
        let manager = self.clone();
        let running = session.clone();
        let task = tokio::spawn(async move {
            if let Ok(_guard) = running.lock_run().await {
                manager.run(&running, workflow).await;
            }
        });
        session.track(task.abort_handle());
    }

    /// Runs the workflow until it pauses, then auto-saves completed output.
    ///
    /// The caller must hold the session's run lock.
    async fn run(&self, session: &Session, workflow: Workflow) -> WorkflowState {
        let mut state = session.snapshot();

        match workflow
            .run_until_interrupt(&mut state, &session.thread_id, session)
            .await
        {
            Ok(()) => {}
            Err(WorkflowError::Cancelled(session_id)) => {
                tracing::info!(
                    target: TRACING_TARGET_SESSION,
                    session_id = %session_id,
                    "Workflow run cancelled"
                );
                return state;
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SESSION,
                    session_id = %state.session_id,
                    error = %error,
                    "Workflow run failed"
                );
                state.fail(error.to_string());
            }
        }

        if session.is_cancelled() {
            return state;
        }

        if self.inner.config.auto_save_output && self.auto_save(&mut state).await {
            if let Err(error) = self.checkpoint(session, &state).await {
                state.error = Some(format!("output saved but not checkpointed: {error}"));
            }
        }

        session.publish(&state);
        state
    }

    /// Writes the output of a completed session once.
    ///
    /// Returns true when the output was written by this call.
    async fn auto_save(&self, state: &mut WorkflowState) -> bool {
        if state.stage != WorkflowStage::Completed
            || state.output_saved
            || state.deck_markdown.is_none()
        {
            return false;
        }

        match save_output(&self.inner.config.output_dir, state).await {
            Ok(path) => {
                state.output_saved = true;
                tracing::info!(
                    target: TRACING_TARGET_SESSION,
                    session_id = %state.session_id,
                    path = %path.display(),
                    "Output saved"
                );
                true
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_SESSION,
                    session_id = %state.session_id,
                    error = %error,
                    "Failed to save output"
                );
                false
            }
        }
    }

    async fn checkpoint(&self, session: &Session, state: &WorkflowState) -> WorkflowResult<()> {
        self.inner
            .checkpoints
            .save(&session.thread_id, state)
            .await
            .inspect_err(|error| {
                tracing::warn!(
                    target: TRACING_TARGET_SESSION,
                    session_id = %state.session_id,
                    error = %error,
                    "Failed to write checkpoint"
                );
            })
    }

    fn registry_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.inner.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.inner.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use deckforge_rig::backend::ChatMessage;
    use deckforge_rig::mock::MockBackend;
    use serde_json::{Value, json};

    use super::*;
    use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore};
    use crate::engine::{Collaborators, FixedCollaborators};
    use crate::overrides::OverrideMap;
    use crate::prompts;
    use crate::state::SessionStatus;

    const OUTLINE: &str = "# Rust Tour\n\n## Ownership\n\n- Moves\n- Borrows\n\n## Traits\n\n- Generics\n";

    const COMPONENT: &str = "```vue\n<template><div class=\"w-full h-full overflow-hidden\">Slide</div></template>\n```";

    fn backend() -> Arc<MockBackend> {
        Arc::new(MockBackend::new().with_responder(|messages| {
            let system = messages.first().map(ChatMessage::text).unwrap_or_default();
            if system == prompts::OUTLINE_SYSTEM {
                Ok(OUTLINE.to_string())
            } else if system == prompts::DESIGN_SYSTEM {
                Ok("{\"theme_name\": \"Plain\"}".to_string())
            } else {
                Ok(COMPONENT.to_string())
            }
        }))
    }

    /// Answers like [`backend`] but takes 200ms per component.
    fn slow_backend() -> Arc<MockBackend> {
        Arc::new(
            MockBackend::new()
                .with_responder(|messages| {
                    let system = messages.first().map(ChatMessage::text).unwrap_or_default();
                    if system == prompts::OUTLINE_SYSTEM {
                        Ok(OUTLINE.to_string())
                    } else if system == prompts::DESIGN_SYSTEM {
                        Ok("{\"theme_name\": \"Plain\"}".to_string())
                    } else {
                        Ok(COMPONENT.to_string())
                    }
                })
                .with_delay(|messages| {
                    let system = messages.first().map(ChatMessage::text).unwrap_or_default();
                    if system == prompts::OUTLINE_SYSTEM || system == prompts::DESIGN_SYSTEM {
                        Duration::ZERO
                    } else {
                        Duration::from_millis(200)
                    }
                }),
        )
    }

    fn manager_with(
        backend: Arc<MockBackend>,
        output_dir: &Path,
        store: SharedCheckpointStore,
    ) -> SessionManager {
        let config = EngineConfig {
            output_dir: output_dir.to_path_buf(),
            ..EngineConfig::default()
        };
        let factory = FixedCollaborators(Collaborators::new(backend));
        SessionManager::new(config, LlmConfig::default(), Arc::new(factory), store)
    }

    fn manager(output_dir: &Path) -> SessionManager {
        manager_with(backend(), output_dir, Arc::new(MemoryCheckpointStore::new()))
    }

    async fn wait_until_settled(manager: &SessionManager, id: Uuid) -> WorkflowState {
        for _ in 0..500 {
            let state = manager.state(id).await.unwrap();
            if state.stage.is_terminal() {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {id} did not settle");
    }

    /// Memory store that refuses checkpoints of saved output.
    #[derive(Debug, Default)]
    struct SavedOutputRejectingStore(MemoryCheckpointStore);

    #[async_trait]
    impl CheckpointStore for SavedOutputRejectingStore {
        async fn save(&self, thread_id: &str, state: &WorkflowState) -> WorkflowResult<()> {
            if state.output_saved {
                return Err(WorkflowError::checkpoint("disk full"));
            }
            self.0.save(thread_id, state).await
        }

        async fn load(&self, session_id: Uuid, thread_id: &str) -> WorkflowResult<Option<WorkflowState>> {
            self.0.load(session_id, thread_id).await
        }

        async fn remove(&self, session_id: Uuid) -> WorkflowResult<()> {
            self.0.remove(session_id).await
        }
    }

    fn map(value: Value) -> OverrideMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn create_returns_draft_outline() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());

        let state = manager.create_session("Teach Rust", None).await.unwrap();
        assert_eq!(state.stage, WorkflowStage::OutlineGenerated);
        assert_eq!(state.outline.as_ref().unwrap().title, "Rust Tour");

        let status = manager.status(state.session_id).await.unwrap();
        assert_eq!(status.status, SessionStatus::Draft);
        assert_eq!(manager.list().len(), 1);
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn update_and_undo_outline() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        let outline = manager
            .update_outline(id, "# Edited\n\n## Only slide\n\n- One point\n")
            .await
            .unwrap();
        assert_eq!(outline.title, "Edited");
        assert_eq!(manager.state(id).await.unwrap().outline_history.len(), 1);

        let restored = manager.undo_outline(id).await.unwrap().unwrap();
        assert_eq!(restored.title, "Rust Tour");
        assert_eq!(restored.len(), 2);
        assert!(manager.undo_outline(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_outline_update_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        let error = manager.update_outline(id, "just prose").await.unwrap_err();
        assert!(matches!(error, WorkflowError::EmptyOutline));
    }

    #[tokio::test]
    async fn confirm_generates_and_saves_once() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        let confirmed = manager.confirm_outline(id).await.unwrap();
        assert_eq!(confirmed.stage.status(), SessionStatus::Confirmed);
        let error = manager.confirm_outline(id).await.unwrap_err();
        assert!(matches!(error, WorkflowError::InvalidStage { .. }));

        let state = wait_until_settled(&manager, id).await;
        assert_eq!(state.stage, WorkflowStage::Completed);
        assert!(state.output_saved);
        assert_eq!(state.design_system.unwrap().theme_name, "Plain");

        let result = manager.result(id).await.unwrap();
        assert_eq!(result.components.len(), 2);
        assert_eq!(result.slides.len(), 2);
        assert_eq!(manager.export(id).await.unwrap(), result.deck_markdown);

        let session_dir = dir.path().join(id.to_string());
        assert!(session_dir.join(DECK_FILE_NAME).exists());
        assert!(session_dir.join("components/OwnershipSlide.vue").exists());
        assert!(session_dir.join("components/TraitsSlide.vue").exists());
    }

    #[tokio::test]
    async fn result_requires_completion() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        assert!(matches!(
            manager.result(id).await.unwrap_err(),
            WorkflowError::InvalidStage { .. }
        ));
        assert!(manager.export(id).await.is_err());
    }

    #[tokio::test]
    async fn auto_save_failure_keeps_completion() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let manager = manager(&blocker);
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        manager.confirm_outline(id).await.unwrap();
        let state = wait_until_settled(&manager, id).await;

        assert_eq!(state.stage, WorkflowStage::Completed);
        assert!(!state.output_saved);
    }

    #[tokio::test]
    async fn supplement_regenerates_outline() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend();
        let manager = manager_with(backend.clone(), dir.path(), Arc::new(MemoryCheckpointStore::new()));
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        let state = manager.add_supplement(id, "Add a slide on async").await.unwrap();

        assert_eq!(state.stage, WorkflowStage::OutlineGenerated);
        assert_eq!(state.supplement.as_deref(), Some("Add a slide on async"));
        assert_eq!(state.outline_history.len(), 1);
        assert!(backend.last_prompt().unwrap().contains("Add a slide on async"));
    }

    #[tokio::test]
    async fn failed_session_accepts_supplement_only() {
        let dir = tempfile::tempdir().unwrap();
        let failing = Arc::new(MockBackend::new().always_failing("offline"));
        let manager = manager_with(failing, dir.path(), Arc::new(MemoryCheckpointStore::new()));

        let state = manager.create_session("Teach Rust", None).await.unwrap();
        assert_eq!(state.stage.status(), SessionStatus::Error);
        let id = state.session_id;

        assert!(manager.update_outline(id, OUTLINE).await.is_err());
        assert!(manager.confirm_outline(id).await.is_err());
        let retried = manager.add_supplement(id, "try again").await.unwrap();
        assert_eq!(retried.stage, WorkflowStage::Error);
    }

    #[tokio::test]
    async fn delete_removes_session_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryCheckpointStore::new());
        let manager = manager_with(backend(), dir.path(), store.clone());
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;
        assert!(!store.is_empty());

        manager.delete(id).await.unwrap();

        assert!(store.is_empty());
        assert!(matches!(
            manager.state(id).await.unwrap_err(),
            WorkflowError::SessionNotFound(_)
        ));
        assert!(manager.delete(id).await.is_err());
    }

    #[tokio::test]
    async fn delete_during_generation_discards_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryCheckpointStore::new());
        let manager = manager_with(slow_backend(), dir.path(), store.clone());
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        manager.confirm_outline(id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.delete(id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(matches!(
            manager.state(id).await.unwrap_err(),
            WorkflowError::SessionNotFound(_)
        ));
        assert!(store.is_empty());
        assert!(manager.is_empty());
        assert!(!dir.path().join(id.to_string()).exists());
    }

    #[tokio::test]
    async fn wait_idle_outlasts_background_runs() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with(slow_backend(), dir.path(), Arc::new(MemoryCheckpointStore::new()));
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;
        assert_eq!(manager.running(), 0);

        manager.confirm_outline(id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.running(), 1);

        manager.wait_idle().await;
        assert_eq!(manager.running(), 0);
        assert_eq!(manager.state(id).await.unwrap().stage, WorkflowStage::Completed);
    }

    #[tokio::test]
    async fn concurrent_supplements_run_one_after_another() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new()
                .always_failing("offline")
                .with_delay(|_| Duration::from_millis(50)),
        );
        let manager = manager_with(backend.clone(), dir.path(), Arc::new(MemoryCheckpointStore::new()));
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        let (alpha, beta) = tokio::join!(
            manager.add_supplement(id, "supplement-alpha"),
            manager.add_supplement(id, "supplement-beta"),
        );
        assert_eq!(alpha.unwrap().stage, WorkflowStage::Error);
        assert_eq!(beta.unwrap().stage, WorkflowStage::Error);

        let prompted = |needle: &str| {
            backend
                .requests()
                .iter()
                .flatten()
                .any(|message| message.text().contains(needle))
        };
        assert!(prompted("supplement-alpha"));
        assert!(prompted("supplement-beta"));
    }

    #[tokio::test]
    async fn unpersisted_output_save_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SavedOutputRejectingStore::default());
        let manager = manager_with(backend(), dir.path(), store);
        let id = manager.create_session("Teach Rust", None).await.unwrap().session_id;

        manager.confirm_outline(id).await.unwrap();
        let state = wait_until_settled(&manager, id).await;

        assert_eq!(state.stage, WorkflowStage::Completed);
        assert!(state.output_saved);
        assert!(state.error.unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn sessions_are_restored_from_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryCheckpointStore::new());
        let first = manager_with(backend(), dir.path(), store.clone());
        let id = first.create_session("Teach Rust", None).await.unwrap().session_id;

        let second = manager_with(backend(), dir.path(), store);
        assert!(second.is_empty());
        let state = second.resume(id).await.unwrap();

        assert_eq!(state.stage, WorkflowStage::OutlineGenerated);
        assert_eq!(second.len(), 1);
        second.confirm_outline(id).await.unwrap();
        assert_eq!(wait_until_settled(&second, id).await.stage, WorkflowStage::Completed);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let error = manager.status(Uuid::new_v4()).await.unwrap_err();
        assert!(error.is_client_error());
    }

    #[test]
    fn reflection_settings_roll_back_invalid_patches() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());

        let settings = manager
            .update_reflection_settings(map(json!({"enabled": true, "per_slide_max_rewrites": 1})))
            .unwrap();
        assert!(settings.effective.enabled);
        assert_eq!(settings.overridden_fields, vec!["enabled", "per_slide_max_rewrites"]);

        let error = manager
            .update_reflection_settings(map(json!({"visual_review_timeout_ms": 10})))
            .unwrap_err();
        assert!(error.is_client_error());
        let settings = manager.reflection_settings().unwrap();
        assert_eq!(settings.effective.visual_review_timeout_ms, 30_000);
        assert_eq!(settings.effective.per_slide_max_rewrites, 1);

        let reset = manager.reset_reflection_settings().unwrap();
        assert!(reset.overrides.is_empty());
        assert!(!reset.effective.enabled);
    }

    #[tokio::test]
    async fn llm_settings_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());

        let config = manager
            .update_llm_settings(map(json!({"model": "gpt-4o-mini", "api_key": "sk-test"})))
            .await
            .unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.is_configured());

        assert!(manager
            .update_llm_settings(map(json!({"temperature": 5.0})))
            .await
            .is_err());
        assert_eq!(manager.effective_llm_config().unwrap().temperature, 0.7);
        assert_eq!(manager.llm_config().model, "gpt-4o");
    }
}
