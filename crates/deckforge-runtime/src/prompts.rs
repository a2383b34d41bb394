//! Prompt templates.

use std::fmt::Write;

use deckforge_core::outline::OutlineSection;

use crate::design::{DesignBrief, DesignSystem};

pub(crate) const OUTLINE_SYSTEM: &str = "You are a presentation designer who turns requirements into clear, well structured slide outlines.";

pub(crate) const COMPONENT_SYSTEM: &str = "You are a frontend engineer who builds polished, animated Vue slide components.";

pub(crate) const FIX_SYSTEM: &str = "You are a frontend engineer who repairs Vue slide components.";

pub(crate) const REVIEW_SYSTEM: &str = "You are a strict but pragmatic slide reviewer.";

pub(crate) const REWRITE_SYSTEM: &str = "You are a frontend engineer who improves slide layout and readability while keeping the content.";

pub(crate) const VISUAL_SYSTEM: &str = "You are a visual QA reviewer for presentation slides. You inspect screenshots for layout defects.";

pub(crate) const DESIGN_SYSTEM: &str = "You are a presentation design director who defines one consistent design system for a whole deck.";

pub(crate) const REFINER_SYSTEM: &str = "You regroup slide bullet points so each group fits on one slide.";

const COMPONENT_RULES: &str = "\
Requirements:
1. Output one Vue single-file component inside a ```vue code block.
2. The root element of the template must carry `w-full h-full overflow-hidden`.
3. Use UnoCSS utility classes; keep every element inside a 1280x720 slide.
4. Do not add explanations outside the code block.";

fn push_section(out: &mut String, heading: &str, body: &str) {
    let _ = write!(out, "## {heading}\n\n{}\n\n", body.trim());
}

fn push_design(out: &mut String, design: Option<&DesignSystem>) {
    if let Some(design) = design {
        push_section(out, "Design system", &design.to_prompt_context());
    }
}

fn section_brief(section: &OutlineSection) -> String {
    format!("Title: {}\n\n{}", section.title, section.content_markdown())
}

fn bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn outline_prompt(
    requirement: &str,
    supplement: Option<&str>,
    research_findings: Option<&str>,
) -> String {
    let mut out = String::new();
    push_section(&mut out, "Requirement", requirement);
    if let Some(supplement) = supplement.filter(|s| !s.trim().is_empty()) {
        push_section(&mut out, "Supplementary requirement", supplement);
    }
    if let Some(findings) = research_findings.filter(|s| !s.trim().is_empty()) {
        push_section(&mut out, "Research findings", findings);
    }
    out.push_str(
        "## Output format\n\n\
         Write a markdown outline:\n\
         - `# Title` for the deck title.\n\
         - One `### Page N: Heading` block per slide, separated by `---`.\n\
         - Inside a page use `*   **Subtitle**:`, `*   **Content**:` with nested bullets, \
         `*   **Visual**:` and `*   **Animation**:`.\n\
         - Put speaker notes in `<!-- speaker notes ... -->`.\n\
         - Use 3 to 7 pages. Output the outline only.",
    );
    out
}

pub(crate) fn component_prompt(section: &OutlineSection, design: Option<&DesignSystem>) -> String {
    let mut out = String::new();
    push_section(&mut out, "Slide", &section_brief(section));
    push_design(&mut out, design);
    out.push_str(COMPONENT_RULES);
    out
}

pub(crate) fn fix_prompt(code: &str, error_text: &str) -> String {
    let mut out = String::new();
    push_section(&mut out, "Component", &format!("```vue\n{code}\n```"));
    out.push_str(error_text.trim());
    out.push_str("\n\n");
    out.push_str(COMPONENT_RULES);
    out
}

pub(crate) fn reflection_review_prompt(
    section: &OutlineSection,
    code: &str,
    design: Option<&DesignSystem>,
    static_issues: &[String],
    schema: &str,
) -> String {
    let mut out = String::new();
    push_section(&mut out, "Slide outline", &section_brief(section));
    push_section(&mut out, "Component", &format!("```vue\n{code}\n```"));
    push_design(&mut out, design);
    if static_issues.is_empty() {
        push_section(&mut out, "Static check findings", "None.");
    } else {
        push_section(&mut out, "Static check findings", &bullet_list(static_issues));
    }
    let _ = write!(
        out,
        "## Task\n\n\
         Decide whether the component needs a rewrite for readability, density or layout. \
         Answer with a JSON object matching this schema and nothing else:\n\n```json\n{schema}\n```"
    );
    out
}

pub(crate) fn reflection_rewrite_prompt(
    section: &OutlineSection,
    code: &str,
    issues: &[String],
    instructions: &str,
    design: Option<&DesignSystem>,
) -> String {
    let mut out = String::new();
    push_section(&mut out, "Slide outline", &section_brief(section));
    push_section(&mut out, "Current component", &format!("```vue\n{code}\n```"));
    push_design(&mut out, design);
    if !issues.is_empty() {
        push_section(&mut out, "Issues", &bullet_list(issues));
    }
    if !instructions.trim().is_empty() {
        push_section(&mut out, "Rewrite instructions", instructions);
    }
    out.push_str(COMPONENT_RULES);
    out
}

pub(crate) fn visual_review_prompt(
    requirement: &str,
    design: Option<&DesignSystem>,
    schema: &str,
) -> String {
    let mut out = String::new();
    push_section(&mut out, "Slide content", requirement);
    push_design(&mut out, design);
    let _ = write!(
        out,
        "## Task\n\n\
         Inspect the attached 1280x720 screenshot for overflow, clipped or overlapping text, \
         poor contrast, empty areas and misalignment. \
         Answer with a JSON object matching this schema and nothing else:\n\n```json\n{schema}\n```"
    );
    out
}

pub(crate) fn visual_fix_prompt(
    section: &OutlineSection,
    code: &str,
    issues: &[String],
    suggestions: &[String],
    design: Option<&DesignSystem>,
) -> String {
    let mut out = String::new();
    push_section(&mut out, "Slide outline", &section_brief(section));
    push_section(&mut out, "Current component", &format!("```vue\n{code}\n```"));
    push_section(&mut out, "Visual issues", &bullet_list(issues));
    if !suggestions.is_empty() {
        push_section(&mut out, "Suggested fixes", &bullet_list(suggestions));
    }
    push_design(&mut out, design);
    out.push_str(COMPONENT_RULES);
    out
}

pub(crate) fn design_prompt(brief: DesignBrief<'_>, schema: &str) -> String {
    let mut out = String::new();
    push_section(&mut out, "Requirement", brief.requirement);
    if let Some(supplement) = brief.supplement.filter(|s| !s.trim().is_empty()) {
        push_section(&mut out, "Supplementary requirement", supplement);
    }
    if let Some(findings) = brief.research_findings.filter(|s| !s.trim().is_empty()) {
        push_section(&mut out, "Research findings", findings);
    }
    let outline = match brief.outline_markdown.trim() {
        "" => "(no outline)",
        outline => outline,
    };
    push_section(&mut out, "Outline", outline);
    let _ = write!(
        out,
        "## Task\n\n\
         Define a reusable design system for the whole deck. Use semantic keys \
         (primary, secondary, accent, background, text) for colours. \
         Answer with a JSON object matching this schema and nothing else:\n\n```json\n{schema}\n```"
    );
    out
}

pub(crate) fn refiner_prompt(section: &OutlineSection, max_bullets: usize, max_chars: usize) -> String {
    let mut out = String::new();
    push_section(&mut out, "Slide title", &section.title);
    push_section(&mut out, "Points", &bullet_list(&section.points));
    let _ = write!(
        out,
        "## Task\n\n\
         Split the points into groups of at most {max_bullets} points and about {max_chars} \
         characters each. Keep the original order and wording. \
         Answer with JSON only: {{\"groups\": [[\"point\", ...], ...]}}"
    );
    out
}
