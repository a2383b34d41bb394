//! Session request types.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request payload for submitting a requirement.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct SubmitRequirement {
    /// Requirement text.
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    /// Additional requirements merged into the first outline.
    #[validate(length(max = 5000))]
    pub supplement: Option<String>,
}

/// Request payload for replacing the draft outline.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateOutline {
    /// Outline markdown.
    #[validate(length(min = 1))]
    pub outline: String,
}

/// Request payload for adding a supplement.
#[must_use]
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct AddSupplement {
    /// Supplement text.
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}
