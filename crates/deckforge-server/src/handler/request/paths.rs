//! Path parameter types for HTTP handlers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Path parameters for session operations.
#[must_use]
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionPathParams {
    /// Unique identifier of the session.
    pub session_id: Uuid,
}
