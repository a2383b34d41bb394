//! Role-tagged chat messages with text and image parts.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// Input from the caller.
    User,
    /// Earlier model output.
    Assistant,
}

/// A single part of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text { text: String },
    /// Base64-encoded image.
    Image { media_type: String, data: String },
}

impl ContentPart {
    /// Returns the part as a data URI for image parts.
    pub fn data_uri(&self) -> Option<String> {
        match self {
            Self::Image { media_type, data } => Some(format!("data:{media_type};base64,{data}")),
            Self::Text { .. } => None,
        }
    }
}

/// A role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    /// Creates a text message with the given role.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    /// Creates a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Creates a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Creates an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Creates a user message carrying text and a PNG image.
    pub fn user_with_png(text: impl Into<String>, png: &[u8]) -> Self {
        Self {
            role: Role::User,
            content: vec![
                ContentPart::Text { text: text.into() },
                ContentPart::Image {
                    media_type: "image/png".to_string(),
                    data: STANDARD.encode(png),
                },
            ],
        }
    }

    /// Returns the concatenated text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns true if the message carries an image.
    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|part| matches!(part, ContentPart::Image { .. }))
    }

    /// Flattens the message into a single prompt string.
    ///
    /// Images are inlined as `[Image: <data uri>]` markers.
    pub fn to_prompt(&self) -> String {
        self.content
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => text.clone(),
                ContentPart::Image { .. } => {
                    format!("[Image: {}]", part.data_uri().unwrap_or_default())
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
