//! Post-generation review loops.
//!
//! - [`ReflectionReviewer`]: static rule checks and an LLM judge, with a
//!   bounded number of rewrites per slide.
//! - [`VisualReviewer`]: screenshot capture and a vision judge, with its own
//!   bounded number of fixes.
//!
//! Neither reviewer ever fails a section: collaborator failures degrade to
//! keeping the last good code and reporting warnings.

mod reflection;
mod visual;

use deckforge_core::extract::extract_code_block;
use deckforge_rig::Result;
use deckforge_rig::backend::{ChatMessage, TextBackend};

pub use self::reflection::{ReflectionOutcome, ReflectionReviewer, ReflectionVerdict};
pub use self::visual::{VisualIssue, VisualOutcome, VisualReviewer, VisualVerdict};

/// Language tag of generated component code blocks.
pub(crate) const COMPONENT_LANGUAGE: &str = "vue";

/// Sends a system and user prompt and extracts the component code.
pub(crate) async fn generate_code(
    backend: &dyn TextBackend,
    system: &str,
    prompt: String,
) -> Result<String> {
    let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
    let response = backend.invoke(&messages).await?;
    Ok(extract_code_block(&response, COMPONENT_LANGUAGE).to_string())
}
