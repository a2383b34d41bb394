//! Writing completed decks to the output directory.
//!
//! Layout: `<output_dir>/<session_id>/slides.md` and one
//! `components/<Name>.vue` file per component.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::state::WorkflowState;
use crate::{WorkflowError, WorkflowResult};

/// File name of the assembled deck.
pub const DECK_FILE_NAME: &str = "slides.md";

/// Directory holding the component files.
const COMPONENTS_DIR: &str = "components";

/// Writes the deck and components of a completed session.
///
/// Returns the session's output directory.
pub async fn save_output(output_dir: &Path, state: &WorkflowState) -> WorkflowResult<PathBuf> {
    let deck = state
        .deck_markdown
        .as_deref()
        .ok_or(WorkflowError::NoComponents)?;

    let session_dir = output_dir.join(state.session_id.to_string());
    let components_dir = session_dir.join(COMPONENTS_DIR);
    fs::create_dir_all(&components_dir).await?;
    fs::write(session_dir.join(DECK_FILE_NAME), deck).await?;

    for (index, component) in state.components.iter().enumerate() {
        let file_name = format!("{}.vue", component_file_stem(&component.name, index));
        fs::write(components_dir.join(file_name), &component.code).await?;
    }

    Ok(session_dir)
}

/// Returns a file stem for the component, never containing path separators.
fn component_file_stem(name: &str, index: usize) -> String {
    let stem = name.trim().replace(['/', '\\'], "_");
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        format!("Component{}", index + 1)
    } else {
        stem
    }
}
