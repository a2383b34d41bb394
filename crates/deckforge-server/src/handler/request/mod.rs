//! Request payloads and path parameters.

mod paths;
mod sessions;
mod settings;

pub use self::paths::SessionPathParams;
pub use self::sessions::{AddSupplement, SubmitRequirement, UpdateOutline};
pub use self::settings::{UpdateLlmSettings, UpdateReflectionSettings};
