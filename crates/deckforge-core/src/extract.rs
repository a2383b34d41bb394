//! Extraction of code and JSON from free-form model output.
//!
//! Generative backends wrap their payloads inconsistently: sometimes in a
//! language-tagged fence, sometimes in a bare fence, sometimes surrounded by
//! prose. Both extractors try fixed strategies in order and fall back to the
//! trimmed input.

const FENCE: &str = "```";

/// Extracts the body of the first fenced code block.
///
/// Tries a fence tagged with `language` first (when non-empty), then any
/// fence, and finally returns the trimmed text.
pub fn extract_code_block<'a>(text: &'a str, language: &str) -> &'a str {
    if !language.is_empty()
        && let Some(body) = tagged_fence(text, language)
    {
        return body;
    }

    if let Some(body) = generic_fence(text) {
        return body;
    }

    text.trim()
}

/// Extracts a JSON payload from a model response.
///
/// Strategies, in order: a ```` ```json ```` fence, any fence, the substring
/// between the first `{` and the last `}`, and finally the trimmed text.
pub fn extract_json(text: &str) -> &str {
    if let Some(body) = tagged_fence(text, "json") {
        return body;
    }

    if let Some(body) = generic_fence(text) {
        return body;
    }

    let trimmed = text.trim();
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && start < end
    {
        return &trimmed[start..=end];
    }

    trimmed
}

/// Finds the first fence whose info string is exactly `language`.
fn tagged_fence<'a>(text: &'a str, language: &str) -> Option<&'a str> {
    let marker = format!("{FENCE}{language}");
    text.match_indices(&marker).find_map(|(start, _)| {
        let after = &text[start + marker.len()..];
        if !after.starts_with(char::is_whitespace) {
            return None;
        }
        let end = after.find(FENCE)?;
        Some(after[..end].trim())
    })
}

fn generic_fence(text: &str) -> Option<&str> {
    let start = text.find(FENCE)?;
    let after = &text[start + FENCE.len()..];
    // Skip the info string when the fence is tagged.
    let body_start = match after.find('\n') {
        Some(newline) if !after[..newline].contains(FENCE) => newline + 1,
        _ => 0,
    };
    let body = &after[body_start..];
    let end = body.find(FENCE)?;
    Some(body[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_block_prefers_language_fence() {
        let text = "intro\n```text\nnope\n```\n```vue\n<template></template>\n```";
        assert_eq!(extract_code_block(text, "vue"), "<template></template>");
    }

    #[test]
    fn language_tag_must_match_exactly() {
        let text = "```vuex\nstore\n```\n```vue\n<template></template>\n```";
        assert_eq!(extract_code_block(text, "vue"), "<template></template>");

        let text = "```vuex\nstore\n```";
        assert_eq!(extract_code_block(text, "vue"), "store");
    }

    #[test]
    fn code_block_falls_back_to_any_fence() {
        let text = "Here you go:\n```html\n<div></div>\n```";
        assert_eq!(extract_code_block(text, "vue"), "<div></div>");
    }

    #[test]
    fn code_block_without_fence_returns_trimmed_text() {
        assert_eq!(extract_code_block("  <template/>  \n", "vue"), "<template/>");
    }

    #[test]
    fn json_from_tagged_fence() {
        let text = "Verdict:\n```json\n{\"ok\": true}\n```\ntrailing";
        assert_eq!(extract_json(text), "{\"ok\": true}");
    }

    #[test]
    fn json_from_generic_fence() {
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn json_from_braces() {
        let text = "Sure! {\"a\": {\"b\": 2}} hope that helps";
        assert_eq!(extract_json(text), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn json_fallback_is_trimmed_text() {
        assert_eq!(extract_json("  not json  "), "not json");
        assert_eq!(extract_json("} backwards {"), "} backwards {");
    }
}
