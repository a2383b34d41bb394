//! Application state and dependency injection.

use deckforge_runtime::session::SessionManager;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    sessions: SessionManager,
}

impl ServiceState {
    /// Creates the state around a session manager.
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// Returns the session manager.
    #[inline]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(sessions: SessionManager);
