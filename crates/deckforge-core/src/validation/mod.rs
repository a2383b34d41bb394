//! Structural validation of generated slide components.
//!
//! The validator extracts the first `<template>` block of a single-file
//! component, locates its root element and checks the root's class string
//! against an ordered list of [`ValidationRule`]s.

mod rules;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use self::rules::{
    NO_ROOT_ELEMENT_RULE, NO_TEMPLATE_RULE, Severity, ValidationRule, default_rules,
};
use crate::TRACING_TARGET;

static TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<template[^>]*>([\s\S]*?)</template>").expect("template pattern is valid")
});

static ROOT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([a-zA-Z][a-zA-Z0-9-]*)[^>]*>").expect("root element pattern is valid")
});

static CLASS_DOUBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bclass="([^"]*)""#).expect("class pattern is valid"));

static CLASS_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bclass='([^']*)'").expect("class pattern is valid"));

/// A single issue found in a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Identifier of the failed rule.
    pub rule_id: String,
    /// Human-readable message.
    pub message: String,
    /// Issue severity.
    pub severity: Severity,
}

/// Outcome of validating a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Issues in rule order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns true if no issue has error severity.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Returns the messages of error-severity issues.
    pub fn errors(&self) -> Vec<&str> {
        self.messages(Severity::Error)
    }

    /// Returns the messages of warning-severity issues.
    pub fn warnings(&self) -> Vec<&str> {
        self.messages(Severity::Warning)
    }

    /// Returns true if the markup lacks a template or a root element.
    pub fn is_structural_failure(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.rule_id == NO_TEMPLATE_RULE || i.rule_id == NO_ROOT_ELEMENT_RULE)
    }

    fn messages(&self, severity: Severity) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .map(|i| i.message.as_str())
            .collect()
    }

    fn fatal(rule_id: &str, message: &str) -> Self {
        Self {
            issues: vec![ValidationIssue {
                rule_id: rule_id.to_string(),
                message: message.to_string(),
                severity: Severity::Error,
            }],
        }
    }
}

/// Component validator holding an ordered rule list.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Vec<ValidationRule>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Validator {
    /// Creates a validator with custom rules.
    pub fn new(rules: Vec<ValidationRule>) -> Self {
        Self { rules }
    }

    /// Returns the configured rules.
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Validates component markup.
    pub fn validate(&self, markup: &str) -> ValidationResult {
        let Some(template) = extract_template(markup) else {
            return ValidationResult::fatal(NO_TEMPLATE_RULE, "Component is missing a <template> block");
        };
        let Some(root) = extract_root_element(template) else {
            return ValidationResult::fatal(
                NO_ROOT_ELEMENT_RULE,
                "Component template is missing a root element",
            );
        };

        let classes = extract_class_attribute(root);
        let issues: Vec<ValidationIssue> = self
            .rules
            .iter()
            .filter(|rule| !rule.is_satisfied_by(classes))
            .map(|rule| ValidationIssue {
                rule_id: rule.id().to_string(),
                message: rule.message().to_string(),
                severity: rule.severity(),
            })
            .collect();

        let result = ValidationResult { issues };
        tracing::debug!(
            target: TRACING_TARGET,
            root_classes = classes,
            is_valid = result.is_valid(),
            issues = result.issues.len(),
            "Component validated"
        );
        result
    }
}

/// Validates markup against the default rules.
pub fn validate(markup: &str) -> ValidationResult {
    Validator::default().validate(markup)
}

/// Formats issues as a numbered list for a fix prompt.
///
/// Returns an empty string when the result is valid and has no warnings.
pub fn format_validation_errors_for_prompt(result: &ValidationResult) -> String {
    let errors = result.errors();
    let warnings = result.warnings();
    if result.is_valid() && warnings.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "## Validation issues".to_string(),
        String::new(),
        "The generated component has the following problems:".to_string(),
        String::new(),
    ];
    let numbered = errors
        .iter()
        .map(|m| ("Error", m))
        .chain(warnings.iter().map(|m| ("Warning", m)));
    for (index, (label, message)) in numbered.enumerate() {
        lines.push(format!("{}. **{label}**: {message}", index + 1));
    }
    lines.push(String::new());
    lines.push(
        "Fix the problems above and make sure the root container carries the required classes."
            .to_string(),
    );
    lines.join("\n")
}

fn extract_template(markup: &str) -> Option<&str> {
    TEMPLATE
        .captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn extract_root_element(template: &str) -> Option<&str> {
    let mut rest = template.trim();
    while let Some(comment) = rest.strip_prefix("<!--") {
        let Some(end) = comment.find("-->") else {
            break;
        };
        rest = comment[end + 3..].trim_start();
    }
    ROOT_ELEMENT.find(rest).map(|m| m.as_str())
}

fn extract_class_attribute(root: &str) -> &str {
    CLASS_DOUBLE
        .captures(root)
        .or_else(|| CLASS_SINGLE.captures(root))
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(classes: &str) -> String {
        format!(
            "<template>\n  <!-- root -->\n  <div class=\"{classes}\">\n    <h1>Hi</h1>\n  </div>\n</template>\n<script setup>\n</script>"
        )
    }

    #[test]
    fn complete_root_is_valid() {
        let result = validate(&component("w-full h-full overflow-hidden flex"));
        assert!(result.is_valid());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn missing_width_is_only_a_warning() {
        let result = validate(&component("h-screen overflow-hidden"));
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
        assert!(result.errors().is_empty());
    }

    #[test]
    fn adding_height_class_removes_error() {
        let before = validate(&component("w-full overflow-hidden"));
        let after = validate(&component("w-full overflow-hidden h-full"));

        assert!(before.issues.iter().any(|i| i.rule_id == "root_height"));
        assert!(!after.issues.iter().any(|i| i.rule_id == "root_height"));
        assert!(!before.is_valid());
        assert!(after.is_valid());
    }

    #[test]
    fn missing_template_fails_fast() {
        let result = validate("<div class=\"h-full\"></div>");
        assert!(!result.is_valid());
        assert!(result.is_structural_failure());
        assert_eq!(result.issues[0].rule_id, NO_TEMPLATE_RULE);
    }

    #[test]
    fn missing_root_fails_fast() {
        let result = validate("<template>just text</template>");
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].rule_id, NO_ROOT_ELEMENT_RULE);
    }

    #[test]
    fn single_quoted_class_is_read() {
        let markup = "<TEMPLATE><section class='h-full w-full overflow-clip'></section></TEMPLATE>";
        assert!(validate(markup).issues.is_empty());
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let rule = ValidationRule::new("grid", r"\bgrid\b", "needs grid", Severity::Error).unwrap();
        let validator = Validator::new(vec![rule]);

        assert!(validator.validate(&component("flex")).issues.len() == 1);
        assert!(validator.validate(&component("grid")).is_valid());
    }

    #[test]
    fn prompt_formatting_numbers_errors_then_warnings() {
        assert_eq!(
            format_validation_errors_for_prompt(&validate(&component("h-full w-full overflow-hidden"))),
            ""
        );

        let text = format_validation_errors_for_prompt(&validate(&component("")));
        assert!(text.contains("1. **Error**"));
        assert!(text.contains("2. **Error**"));
        assert!(text.contains("3. **Warning**"));
    }
}
