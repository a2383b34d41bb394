//! Rendering of outlines and sections back to the labelled markdown dialect.

use super::{AnimationEffect, Outline, VisualSuggestion};
use crate::pagination::TableBlock;

/// Content line emitted for sections that carry only a table.
///
/// The parser drops it again so repeated pagination passes stay stable.
pub const TABLE_PLACEHOLDER: &str = "See the table below.";

/// Renders the labelled markdown block of a single section.
pub fn render_section_content(
    title: &str,
    subtitle: Option<&str>,
    points: &[String],
    visual: Option<&VisualSuggestion>,
    animation: Option<&AnimationEffect>,
    speaker_notes: Option<&str>,
    table: Option<&TableBlock>,
) -> String {
    let mut lines = vec![format!("*   **Title**: {title}")];
    if let Some(subtitle) = subtitle.filter(|s| !s.trim().is_empty()) {
        lines.push(format!("*   **Subtitle**: {subtitle}"));
    }

    if !points.is_empty() || table.is_some() {
        lines.push(String::new());
        lines.push("*   **Content**:".to_string());
        if points.is_empty() {
            lines.push(format!("    *   {TABLE_PLACEHOLDER}"));
        }
        for point in points {
            lines.push(format!("    *   {point}"));
        }
    }

    if let Some(visual) = visual.filter(|v| !v.is_empty()) {
        lines.push(String::new());
        lines.push("*   **Visual**:".to_string());
        let fields = [
            ("Background", &visual.background),
            ("Image", &visual.core_image),
            ("Layout", &visual.layout),
            ("Image URL", &visual.image_url),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                lines.push(format!("    *   **{label}**: {value}"));
            }
        }
    }

    if let Some(animation) = animation.filter(|a| !a.is_empty()) {
        lines.push(String::new());
        if animation.description.trim().is_empty() {
            lines.push("*   **Animation**:".to_string());
        } else {
            lines.push(format!("*   **Animation**: {}", animation.description.trim()));
        }
        for element in &animation.elements {
            lines.push(format!("    *   {element}"));
        }
    }

    if let Some(table) = table {
        lines.push(String::new());
        lines.push(table.header.clone());
        lines.push(table.separator.clone());
        lines.extend(table.rows.iter().cloned());
    }

    if let Some(notes) = speaker_notes.filter(|n| !n.trim().is_empty()) {
        lines.push(String::new());
        lines.push("<!-- speaker notes".to_string());
        lines.push(notes.to_string());
        lines.push("-->".to_string());
    }

    lines.join("\n").trim().to_string()
}

/// Renders the full outline as `# title` followed by one page block per section.
pub fn build_outline_markdown(outline: &Outline) -> String {
    let mut lines = vec![format!("# {}", outline.title), String::new()];
    for (index, section) in outline.sections.iter().enumerate() {
        lines.push("---".to_string());
        lines.push(String::new());
        lines.push(format!("### Page {}: {}", index + 1, section.title));
        lines.push(String::new());
        lines.push(section.content_markdown());
        lines.push(String::new());
    }

    let mut markdown = lines.join("\n").trim().to_string();
    markdown.push('\n');
    markdown
}
