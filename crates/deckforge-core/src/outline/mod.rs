//! Presentation outline model.
//!
//! An [`Outline`] is an ordered list of [`OutlineSection`]s under a deck
//! title. Sections are never edited in place: pagination and regeneration
//! produce new sections and replace the outline as a whole.

mod parse;
mod render;

use serde::{Deserialize, Serialize};

pub use self::parse::parse_outline;
pub use self::render::{
    TABLE_PLACEHOLDER, build_outline_markdown, render_section_content,
};
use crate::pagination::TableBlock;

/// Title used when the outline markdown has no `# Title` line.
pub const DEFAULT_OUTLINE_TITLE: &str = "Untitled Presentation";

/// Visual hints attached to a section by the outline generator.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualSuggestion {
    /// Background treatment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Core image description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_image: Option<String>,
    /// Layout description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    /// Link to a concrete image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl VisualSuggestion {
    /// Returns true when no field is set.
    pub fn is_empty(&self) -> bool {
        self.background.is_none()
            && self.core_image.is_none()
            && self.layout.is_none()
            && self.image_url.is_none()
    }
}

/// Animation description with optional element-level steps.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationEffect {
    /// Free-text description of the animation.
    #[serde(default)]
    pub description: String,
    /// Ordered element-level animation steps.
    #[serde(default)]
    pub elements: Vec<String>,
}

impl AnimationEffect {
    /// Returns true when neither a description nor steps are present.
    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty() && self.elements.is_empty()
    }
}

/// A single slide-sized section of the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Section title, never empty.
    pub title: String,
    /// Optional subtitle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Ordered bullet points.
    #[serde(default)]
    pub points: Vec<String>,
    /// Visual hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_suggestions: Option<VisualSuggestion>,
    /// Animation hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_effects: Option<AnimationEffect>,
    /// Speaker notes, possibly multi-line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_notes: Option<String>,
    /// Verbatim markdown block the section was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl OutlineSection {
    /// Creates a section with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            points: Vec::new(),
            visual_suggestions: None,
            animation_effects: None,
            speaker_notes: None,
            raw_content: None,
        }
    }

    /// Sets the subtitle.
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Sets the bullet points.
    pub fn with_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.points = points.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the visual suggestions.
    pub fn with_visual_suggestions(mut self, visual: VisualSuggestion) -> Self {
        self.visual_suggestions = Some(visual);
        self
    }

    /// Sets the animation effects.
    pub fn with_animation_effects(mut self, animation: AnimationEffect) -> Self {
        self.animation_effects = Some(animation);
        self
    }

    /// Sets the speaker notes.
    pub fn with_speaker_notes(mut self, notes: impl Into<String>) -> Self {
        self.speaker_notes = Some(notes.into());
        self
    }

    /// Sets the raw markdown content.
    pub fn with_raw_content(mut self, raw: impl Into<String>) -> Self {
        self.raw_content = Some(raw.into());
        self
    }

    /// Returns the first markdown table embedded in the raw content.
    pub fn table(&self) -> Option<TableBlock> {
        self.raw_content.as_deref().and_then(TableBlock::extract)
    }

    /// Returns the raw content, rendering it from the fields when absent.
    pub fn content_markdown(&self) -> String {
        match self.raw_content.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
            _ => render_section_content(
                &self.title,
                self.subtitle.as_deref(),
                &self.points,
                self.visual_suggestions.as_ref(),
                self.animation_effects.as_ref(),
                self.speaker_notes.as_deref(),
                None,
            ),
        }
    }
}

/// Structured presentation outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Deck title.
    pub title: String,
    /// Sections in source order.
    #[serde(default)]
    pub sections: Vec<OutlineSection>,
    /// Markdown the outline was parsed from or rendered to.
    #[serde(default)]
    pub raw_markdown: String,
}

impl Outline {
    /// Creates an outline and renders its markdown.
    pub fn new(title: impl Into<String>, sections: Vec<OutlineSection>) -> Self {
        let mut outline = Self {
            title: title.into(),
            sections,
            raw_markdown: String::new(),
        };
        outline.raw_markdown = build_outline_markdown(&outline);
        outline
    }

    /// Parses an outline from markdown.
    pub fn from_markdown(markdown: &str) -> Self {
        parse_outline(markdown)
    }

    /// Renders the outline back to markdown.
    pub fn to_markdown(&self) -> String {
        build_outline_markdown(self)
    }

    /// Returns true when the outline has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Returns the number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }
}
