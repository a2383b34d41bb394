//! Validation rule definitions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::Result;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Blocks validity.
    Error,
    /// Informational only.
    Warning,
}

/// A class-string rule applied to the root element of the template.
///
/// The rule passes when `pattern` matches anywhere in the root element's
/// class attribute; otherwise an issue with `message` and `severity` is
/// reported.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    id: String,
    pattern: Regex,
    message: String,
    severity: Severity,
}

impl ValidationRule {
    /// Compiles a new rule.
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        message: impl Into<String>,
        severity: Severity,
    ) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            pattern: Regex::new(pattern)?,
            message: message.into(),
            severity,
        })
    }

    /// Returns the rule identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the message reported on failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the severity reported on failure.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns true if the class string satisfies the rule.
    pub fn is_satisfied_by(&self, classes: &str) -> bool {
        self.pattern.is_match(classes)
    }
}

/// Rule id reported when the markup has no template block.
pub const NO_TEMPLATE_RULE: &str = "no_template";

/// Rule id reported when the template has no root element.
pub const NO_ROOT_ELEMENT_RULE: &str = "no_root_element";

/// Returns the default slide layout rules.
///
/// The root container must fill the slide height and clip its overflow;
/// filling the width is recommended.
pub fn default_rules() -> Vec<ValidationRule> {
    let specs = [
        (
            "root_height",
            r"\b(h-full|h-screen|min-h-full|min-h-screen)\b",
            "Root container is missing a height constraint; add h-full or h-screen so the component fills the slide height",
            Severity::Error,
        ),
        (
            "root_width",
            r"\b(w-full|w-screen)\b",
            "Root container is missing a width constraint; add w-full so the component fills the slide width",
            Severity::Warning,
        ),
        (
            "overflow_control",
            r"\b(overflow-hidden|overflow-auto|overflow-clip)\b",
            "Root container is missing overflow control; add overflow-hidden so content cannot spill past the slide",
            Severity::Error,
        ),
    ];

    specs
        .into_iter()
        .filter_map(|(id, pattern, message, severity)| {
            ValidationRule::new(id, pattern, message, severity).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_compile() {
        let rules = default_rules();
        let ids: Vec<&str> = rules.iter().map(ValidationRule::id).collect();
        assert_eq!(ids, vec!["root_height", "root_width", "overflow_control"]);
    }

    #[test]
    fn rule_matches_whole_words() {
        let rule = ValidationRule::new("h", r"\bh-full\b", "m", Severity::Error).unwrap();
        assert!(rule.is_satisfied_by("flex h-full"));
        assert!(!rule.is_satisfied_by("flex h-fullish"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(ValidationRule::new("bad", "(", "m", Severity::Error).is_err());
    }

    #[test]
    fn severity_strings() {
        assert_eq!(Severity::Error.as_ref(), "error");
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
    }
}
