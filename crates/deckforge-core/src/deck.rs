//! Generated components, component naming and deck assembly.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Fallback base name used when a title has no usable characters.
const FALLBACK_NAME: &str = "Slide";

/// Separator between slides in the assembled deck document.
pub const SLIDE_SEPARATOR: &str = "\n\n---\n\n";

/// A generated slide component.
///
/// Retry counters are diagnostic metadata only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedComponent {
    /// Unique component name within the session.
    pub name: String,
    /// Component source.
    pub code: String,
    /// Title of the section the component was generated from.
    pub section_title: String,
    /// Structural validation warnings left after retries.
    #[serde(default)]
    pub validation_warnings: Vec<String>,
    /// Reflection and visual review warnings.
    #[serde(default)]
    pub reflection_warnings: Vec<String>,
    /// Structural validation retries performed.
    #[serde(default)]
    pub validation_retries: u32,
    /// Static reflection rewrites performed.
    #[serde(default)]
    pub reflection_retries: u32,
    /// Visual fix rewrites performed.
    #[serde(default)]
    pub visual_retries: u32,
    /// Whether a screenshot was captured during visual review.
    #[serde(default)]
    pub screenshot_captured: bool,
    /// Whether generation failed and `code` is a placeholder.
    #[serde(default)]
    pub failed: bool,
}

impl GeneratedComponent {
    /// Creates a component with no warnings.
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        section_title: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            section_title: section_title.into(),
            ..Self::default()
        }
    }

    /// Creates a placeholder component for a section whose generation failed.
    pub fn placeholder(
        name: impl Into<String>,
        section_title: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        let section_title = section_title.into();
        let code = format!(
            "<template>\n  <div class=\"w-full h-full overflow-hidden flex items-center justify-center\">\n    <h1 class=\"text-4xl font-bold\">{}</h1>\n  </div>\n</template>\n",
            escape_html(&section_title)
        );
        Self {
            name: name.into(),
            code,
            validation_warnings: vec![format!("Component generation failed: {reason}")],
            section_title,
            failed: true,
            ..Self::default()
        }
    }

    /// Returns every warning attached to the component.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.validation_warnings
            .iter()
            .chain(&self.reflection_warnings)
            .map(String::as_str)
    }
}

/// A single slide of the assembled deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Ordered per-slide frontmatter entries.
    #[serde(default)]
    pub frontmatter: Vec<(String, String)>,
    /// Slide body.
    pub content: String,
    /// Component rendered by the slide.
    pub component_name: String,
}

impl Slide {
    /// Creates the default slide wrapping a component.
    pub fn for_component(component: &GeneratedComponent) -> Self {
        Self {
            frontmatter: vec![("layout".to_string(), "default".to_string())],
            content: format!("<{} />", component.name),
            component_name: component.name.clone(),
        }
    }
}

/// Converts a section title into an ASCII PascalCase identifier.
///
/// Non-alphanumeric ASCII characters are dropped and words are capitalized.
/// Identifiers starting with a digit are prefixed with `Slide`; an empty
/// result becomes `Slide`.
pub fn sanitize_component_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let pascal: String = cleaned
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut out = first.to_ascii_uppercase().to_string();
                    out.push_str(&chars.as_str().to_ascii_lowercase());
                    out
                }
                None => String::new(),
            }
        })
        .collect();

    match pascal.chars().next() {
        None => FALLBACK_NAME.to_string(),
        Some(first) if !first.is_ascii_alphabetic() => format!("{FALLBACK_NAME}{pascal}"),
        Some(_) => pascal,
    }
}

/// Assigns a unique component name to every title, in order.
///
/// Names end with `Slide`; titles without usable characters become
/// `Slide{position}`. Collisions get numeric suffixes starting at 2.
pub fn assign_component_names<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    let mut used = HashSet::with_capacity(titles.len());

    titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let base = sanitize_component_name(title.as_ref());
            let candidate = if base == FALLBACK_NAME {
                format!("{FALLBACK_NAME}{}", index + 1)
            } else if base.ends_with(FALLBACK_NAME) {
                base
            } else {
                format!("{base}{FALLBACK_NAME}")
            };

            let mut name = candidate.clone();
            let mut suffix = 2;
            while used.contains(&name) {
                name = format!("{candidate}{suffix}");
                suffix += 1;
            }
            used.insert(name.clone());
            name
        })
        .collect()
}

/// Joins slides into a deck document.
///
/// The deck frontmatter (if any) is followed by a blank line; slides are
/// separated by [`SLIDE_SEPARATOR`].
pub fn assemble_deck(slides: &[Slide], deck_frontmatter: &[(String, String)]) -> String {
    let body = slides
        .iter()
        .map(|slide| match frontmatter_block(&slide.frontmatter) {
            Some(block) => format!("{block}\n\n{}", slide.content),
            None => slide.content.clone(),
        })
        .collect::<Vec<_>>()
        .join(SLIDE_SEPARATOR);

    match frontmatter_block(deck_frontmatter) {
        Some(block) => format!("{block}\n\n{body}"),
        None => body,
    }
}

fn frontmatter_block(entries: &[(String, String)]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let mut lines = vec!["---".to_string()];
    lines.extend(entries.iter().map(|(k, v)| format!("{k}: {v}")));
    lines.push("---".to_string());
    Some(lines.join("\n"))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_titles() {
        assert_eq!(sanitize_component_name("market overview"), "MarketOverview");
        assert_eq!(sanitize_component_name("Q3 results!"), "Q3Results");
        assert_eq!(sanitize_component_name("2024 plan"), "Slide2024Plan");
        assert_eq!(sanitize_component_name("市场概览"), "Slide");
        assert_eq!(sanitize_component_name(""), "Slide");
    }

    #[test]
    fn names_are_unique_for_duplicate_titles() {
        let titles = ["Intro", "Intro", "Intro", "市场", "", "Intro Slide"];
        let names = assign_component_names(&titles);

        assert_eq!(
            names,
            vec![
                "IntroSlide",
                "IntroSlide2",
                "IntroSlide3",
                "Slide4",
                "Slide5",
                "IntroSlide4",
            ]
        );
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), titles.len());
    }

    #[test]
    fn positional_names_never_collide() {
        let titles = ["Slide 2", "中文", "Slide2"];
        let names = assign_component_names(&titles);
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn assembles_deck_with_frontmatter() {
        let components = [
            GeneratedComponent::new("IntroSlide", "", "Intro"),
            GeneratedComponent::new("EndSlide", "", "End"),
        ];
        let slides: Vec<Slide> = components.iter().map(Slide::for_component).collect();
        let deck = assemble_deck(
            &slides,
            &[
                ("theme".to_string(), "default".to_string()),
                ("title".to_string(), "Deck".to_string()),
            ],
        );

        assert_eq!(
            deck,
            "---\ntheme: default\ntitle: Deck\n---\n\n---\nlayout: default\n---\n\n<IntroSlide />\n\n---\n\n---\nlayout: default\n---\n\n<EndSlide />"
        );
    }

    #[test]
    fn assembles_without_frontmatter() {
        let slides = vec![
            Slide {
                frontmatter: Vec::new(),
                content: "a".into(),
                component_name: "A".into(),
            },
            Slide {
                frontmatter: Vec::new(),
                content: "b".into(),
                component_name: "B".into(),
            },
        ];
        assert_eq!(assemble_deck(&slides, &[]), "a\n\n---\n\nb");
    }

    #[test]
    fn placeholder_is_marked_failed() {
        let component = GeneratedComponent::placeholder("XSlide", "A <b>", "timeout");
        assert!(component.failed);
        assert!(component.code.contains("A &lt;b&gt;"));
        assert_eq!(component.warnings().count(), 1);
    }
}
