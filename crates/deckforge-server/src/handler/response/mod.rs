//! Response bodies.

mod error_response;
mod monitors;
mod sessions;
mod settings;

pub use self::error_response::ErrorResponse;
pub use self::monitors::{HealthResponse, ReadyResponse};
pub use self::sessions::{DeletedSession, GenerationStatus, OutlineResponse};
pub use self::settings::{LlmSettingsResponse, LlmValidation};
