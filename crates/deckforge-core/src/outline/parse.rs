//! Tolerant parser for the outline markdown dialect.
//!
//! Accepted structure:
//!
//! ```text
//! # Deck title
//!
//! ---
//!
//! ### Page 1: Section heading        (or `## Section heading`)
//!
//! *   **Title**: Section title
//! *   **Subtitle**: Optional subtitle
//! *   **Content**:
//!     *   First point
//! *   **Visual**:
//!     *   **Layout**: two columns
//! *   **Animation**: fade in
//!     *   title slides from left
//!
//! <!-- speaker notes
//! Free text
//! -->
//! ```
//!
//! Labels are matched in English or Chinese. Missing fields are simply left
//! empty; unknown lines stay in the section's raw content.

use super::render::TABLE_PLACEHOLDER;
use super::{AnimationEffect, DEFAULT_OUTLINE_TITLE, Outline, OutlineSection, VisualSuggestion};

/// Parses outline markdown into a structured [`Outline`].
pub fn parse_outline(markdown: &str) -> Outline {
    let mut title = String::new();
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    let mut in_comment = false;

    for line in markdown.lines() {
        let trimmed = line.trim();

        if in_comment {
            if trimmed.contains("-->") {
                in_comment = false;
            }
            if let Some((_, block)) = current.as_mut() {
                block.push(line);
            }
            continue;
        }

        if trimmed.starts_with("<!--") && !trimmed.contains("-->") {
            in_comment = true;
        }

        if let Some(heading) = trimmed.strip_prefix("# ") {
            if title.is_empty() && current.is_none() {
                title = heading.trim().to_string();
            }
            continue;
        }

        if let Some(heading) = section_heading(trimmed) {
            if let Some((heading, block)) = current.take()
                && let Some(section) = parse_section_block(&heading, &block)
            {
                sections.push(section);
            }
            current = Some((heading, Vec::new()));
            continue;
        }

        if is_page_separator(trimmed) {
            continue;
        }

        if let Some((_, block)) = current.as_mut() {
            block.push(line);
        }
    }

    if let Some((heading, block)) = current.take()
        && let Some(section) = parse_section_block(&heading, &block)
    {
        sections.push(section);
    }

    if title.is_empty() {
        title = DEFAULT_OUTLINE_TITLE.to_string();
    }

    Outline {
        title,
        sections,
        raw_markdown: markdown.to_string(),
    }
}

fn is_page_separator(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

/// Returns the heading text of a `##`/`###` line with any page prefix removed.
fn section_heading(line: &str) -> Option<String> {
    let text = line
        .strip_prefix("### ")
        .or_else(|| line.strip_prefix("## "))?
        .trim();
    Some(strip_page_prefix(text).to_string())
}

/// Strips `Page 3:` / `第3页：` style prefixes from a heading.
fn strip_page_prefix(text: &str) -> &str {
    let rest = match text.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("page") => &text[4..],
        _ => match text.strip_prefix('第') {
            Some(rest) => rest,
            None => return text,
        },
    };

    let rest = rest.trim_start();
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return text;
    }

    let rest = rest[digits..].trim_start();
    let rest = rest.strip_prefix('页').unwrap_or(rest).trim_start();
    let mut chars = rest.chars();
    match chars.next() {
        Some(':' | '：' | '-' | '.' | '、') => chars.as_str().trim(),
        None => text,
        _ => rest,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Subtitle,
    Content,
    Visual,
    Background,
    CoreImage,
    Layout,
    ImageUrl,
    Animation,
    Notes,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_end_matches([':', '：']).trim().to_lowercase();
        let field = match label.as_str() {
            "title" | "标题" => Self::Title,
            "subtitle" | "副标题" => Self::Subtitle,
            "content" | "core content" | "key points" | "points" | "核心内容" | "要点" => {
                Self::Content
            }
            "visual" | "visuals" | "visual suggestions" | "视觉建议" => Self::Visual,
            "background" | "背景" => Self::Background,
            "image" | "core image" | "核心图片" => Self::CoreImage,
            "layout" | "布局" => Self::Layout,
            "image url" | "image link" | "图片链接" => Self::ImageUrl,
            "animation" | "animations" | "animation effects" | "动画效果" => Self::Animation,
            "notes" | "speaker notes" | "演讲备注" | "备注" => Self::Notes,
            _ => return None,
        };
        Some(field)
    }
}

/// Splits a bullet line into its item text, or returns `None` for non-bullets.
fn bullet_item(trimmed: &str) -> Option<&str> {
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some('*' | '-' | '+'), Some(c)) if c.is_whitespace() => return Some(trimmed[1..].trim()),
        _ => {}
    }

    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(item) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(item.trim());
        }
    }
    None
}

/// Splits `**Label**: value` into its label and value.
fn labelled(item: &str) -> Option<(&str, &str)> {
    let rest = item.strip_prefix("**")?;
    let end = rest.find("**")?;
    let label = &rest[..end];
    let value = rest[end + 2..].trim_start();
    let value = value
        .strip_prefix(':')
        .or_else(|| value.strip_prefix('：'))
        .unwrap_or(value);
    Some((label, value.trim()))
}

/// Removes a leading `speaker notes` label from the body of a notes comment.
fn strip_notes_label(body: &str) -> &str {
    let body = body.trim();
    let lower = body.to_lowercase();
    for label in ["speaker notes", "speaker note", "notes"] {
        if lower.starts_with(label) {
            let rest = body[label.len()..].trim_start();
            return rest.strip_prefix(':').unwrap_or(rest).trim();
        }
    }
    body.strip_prefix("演讲备注")
        .or_else(|| body.strip_prefix("备注"))
        .map(|rest| rest.trim_start_matches([':', '：']).trim())
        .unwrap_or(body)
}

fn is_notes_comment(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("speaker") || lower.contains("notes") || body.contains("备注")
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses the lines belonging to one section.
fn parse_section_block(heading: &str, block: &[&str]) -> Option<OutlineSection> {
    let mut title_override = None;
    let mut subtitle = None;
    let mut points = Vec::new();
    let mut visual = VisualSuggestion::default();
    let mut animation = AnimationEffect::default();
    let mut notes: Vec<String> = Vec::new();

    let mut mode: Option<Field> = None;
    // `Some(true)` while inside a notes comment, `Some(false)` inside any other comment.
    let mut comment: Option<bool> = None;

    for line in block {
        let trimmed = line.trim();

        if let Some(is_notes) = comment {
            let (body, closed) = match trimmed.find("-->") {
                Some(end) => (&trimmed[..end], true),
                None => (trimmed, false),
            };
            if is_notes && !(closed && body.trim().is_empty()) {
                notes.push(body.trim().to_string());
            }
            if closed {
                comment = None;
            }
            continue;
        }

        if let Some(body) = trimmed.strip_prefix("<!--") {
            let is_notes = is_notes_comment(body);
            match body.find("-->") {
                Some(end) => {
                    if is_notes && let Some(text) = non_empty(strip_notes_label(&body[..end])) {
                        notes.push(text);
                    }
                }
                None => {
                    if is_notes && let Some(text) = non_empty(strip_notes_label(body)) {
                        notes.push(text);
                    }
                    comment = Some(is_notes);
                }
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with('|') {
            mode = None;
            continue;
        }

        let Some(item) = bullet_item(trimmed) else {
            match mode {
                Some(Field::Notes) => notes.push(trimmed.to_string()),
                Some(Field::Animation) if animation.description.is_empty() => {
                    animation.description = trimmed.to_string();
                }
                _ => {}
            }
            continue;
        };

        if let Some((label, value)) = labelled(item)
            && let Some(field) = Field::from_label(label)
        {
            match field {
                Field::Title => title_override = non_empty(value),
                Field::Subtitle => subtitle = non_empty(value),
                Field::Content => {
                    if let Some(point) = non_empty(value) {
                        points.push(point);
                    }
                }
                Field::Visual => {}
                Field::Background => visual.background = non_empty(value),
                Field::CoreImage => visual.core_image = non_empty(value),
                Field::Layout => visual.layout = non_empty(value),
                Field::ImageUrl => visual.image_url = non_empty(value),
                Field::Animation => {
                    if let Some(description) = non_empty(value) {
                        animation.description = description;
                    }
                }
                Field::Notes => {
                    if let Some(text) = non_empty(value) {
                        notes.push(text);
                    }
                }
            }

            mode = match field {
                Field::Title | Field::Subtitle => None,
                Field::Background | Field::CoreImage | Field::Layout | Field::ImageUrl => {
                    Some(Field::Visual)
                }
                other => Some(other),
            };
            continue;
        }

        match mode {
            Some(Field::Animation) => animation.elements.push(item.to_string()),
            Some(Field::Notes) => notes.push(item.to_string()),
            Some(Field::Visual) => {
                if visual.layout.is_none() {
                    visual.layout = non_empty(item);
                }
            }
            _ => {
                if item != TABLE_PLACEHOLDER && !item.is_empty() {
                    points.push(item.to_string());
                }
            }
        }
    }

    let title = title_override.or_else(|| non_empty(heading))?;
    let raw = block.join("\n");
    let notes = notes.join("\n");

    Some(OutlineSection {
        title,
        subtitle,
        points,
        visual_suggestions: (!visual.is_empty()).then_some(visual),
        animation_effects: (!animation.is_empty()).then_some(animation),
        speaker_notes: non_empty(&notes),
        raw_content: non_empty(&raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::build_outline_markdown;

    const LABELLED: &str = "# Quarterly Review

---

### Page 1: Results

*   **Title**: Results
*   **Subtitle**: Q3 in numbers

*   **Content**:
    *   Revenue up 12%
    *   Churn down

*   **Visual**:
    *   **Background**: dark gradient
    *   **Layout**: two columns

*   **Animation**: fade in
    *   numbers count up

<!-- speaker notes
Mention the new region.
Thank the team.
-->

---

### Page 2: 下一步

*   **标题**: 下一步
*   **核心内容**:
    *   扩大团队
";

    #[test]
    fn parses_labelled_dialect() {
        let outline = parse_outline(LABELLED);
        assert_eq!(outline.title, "Quarterly Review");
        assert_eq!(outline.sections.len(), 2);

        let first = &outline.sections[0];
        assert_eq!(first.title, "Results");
        assert_eq!(first.subtitle.as_deref(), Some("Q3 in numbers"));
        assert_eq!(first.points, vec!["Revenue up 12%", "Churn down"]);

        let visual = first.visual_suggestions.as_ref().expect("visual suggestions");
        assert_eq!(visual.background.as_deref(), Some("dark gradient"));
        assert_eq!(visual.layout.as_deref(), Some("two columns"));

        let animation = first.animation_effects.as_ref().expect("animation");
        assert_eq!(animation.description, "fade in");
        assert_eq!(animation.elements, vec!["numbers count up"]);

        assert_eq!(
            first.speaker_notes.as_deref(),
            Some("Mention the new region.\nThank the team.")
        );

        let second = &outline.sections[1];
        assert_eq!(second.title, "下一步");
        assert_eq!(second.points, vec!["扩大团队"]);
    }

    #[test]
    fn parses_plain_headings() {
        let markdown = "# Deck\n\n## Intro\n- one\n- two\n<!-- speaker notes: hi -->\n\n## Outro\n* bye\n";
        let outline = parse_outline(markdown);

        assert_eq!(outline.sections.len(), 2);
        assert_eq!(outline.sections[0].points, vec!["one", "two"]);
        assert_eq!(outline.sections[0].speaker_notes.as_deref(), Some("hi"));
        assert_eq!(outline.sections[1].points, vec!["bye"]);
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let outline = parse_outline("## Only section\n- point");
        assert_eq!(outline.title, DEFAULT_OUTLINE_TITLE);
        assert_eq!(outline.sections.len(), 1);
    }

    #[test]
    fn empty_headings_are_dropped() {
        let outline = parse_outline("# Deck\n## \n- orphan\n## Kept\n");
        assert_eq!(outline.sections.len(), 1);
        assert_eq!(outline.sections[0].title, "Kept");
    }

    #[test]
    fn strips_page_prefixes() {
        assert_eq!(strip_page_prefix("Page 3: Intro"), "Intro");
        assert_eq!(strip_page_prefix("page 12 - Intro"), "Intro");
        assert_eq!(strip_page_prefix("第2页：结论"), "结论");
        assert_eq!(strip_page_prefix("Pages of history"), "Pages of history");
    }

    #[test]
    fn table_stays_in_raw_content() {
        let markdown = "# T\n### Page 1: Data\n*   **Title**: Data\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        let outline = parse_outline(markdown);
        let section = &outline.sections[0];

        assert!(section.points.is_empty());
        let table = section.table().expect("table block");
        assert_eq!(table.rows, vec!["| 1 | 2 |"]);
    }

    #[test]
    fn rendered_markdown_reparses_to_same_sections() {
        let outline = parse_outline(LABELLED);
        let rendered = build_outline_markdown(&outline);
        let reparsed = parse_outline(&rendered);

        assert_eq!(reparsed.title, outline.title);
        assert_eq!(reparsed.sections.len(), outline.sections.len());
        for (left, right) in reparsed.sections.iter().zip(&outline.sections) {
            assert_eq!(left.title, right.title);
            assert_eq!(left.points, right.points);
            assert_eq!(left.speaker_notes, right.speaker_notes);
        }
    }
}
