//! Rule-based pagination of overflowing outline sections.
//!
//! A section overflows when it has too many bullet points, too much weighted
//! text, or a table with too many rows. Overflowing sections are split into
//! continuation sections:
//!
//! 1. bullet points longer than the slide budget are broken at sentence
//!    boundaries, falling back to hard chunks;
//! 2. points are packed greedily into groups bounded by both the bullet count
//!    and the unit budget;
//! 3. table rows are chunked independently and appended as table-only slides;
//! 4. the number of resulting slides is capped at `1 + max_splits_per_section`,
//!    overflow being merged back into the last retained slide.

mod config;
mod table;
mod weight;

use serde::{Deserialize, Serialize};

pub use self::config::PaginationConfig;
pub use self::table::{TableBlock, count_table_rows, is_table_separator};
pub use self::weight::{
    CJK_UNIT_WEIGHT, LIMIT_UNIT_FACTOR, char_units, is_cjk, weighted_length, weighted_limit_units,
};
use crate::TRACING_TARGET;
use crate::outline::{Outline, OutlineSection, render_section_content};

/// Weighted units of speaker notes counted towards a slide.
const NOTES_LIMIT_CHARS: usize = 200;

/// Characters that end a sentence when followed by whitespace.
const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？', '.', '!', '?', ';', '；'];

/// Outcome of splitting a single section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Resulting sections in order.
    pub sections: Vec<OutlineSection>,
    /// Guardrail warnings.
    pub warnings: Vec<String>,
    /// Whether the section was changed.
    pub changed: bool,
    /// Whether any resulting section still overflows.
    pub still_overflowing: bool,
}

impl SplitOutcome {
    fn unchanged(section: &OutlineSection, config: &PaginationConfig) -> Self {
        Self {
            still_overflowing: section_overflows(section, config),
            sections: vec![section.clone()],
            warnings: Vec::new(),
            changed: false,
        }
    }
}

/// Outcome of a pagination pass over a whole outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationPass {
    /// Outline after the pass.
    pub outline: Outline,
    /// Warnings emitted during the pass.
    pub warnings: Vec<String>,
    /// Whether any section changed.
    pub changed: bool,
    /// Indices (in the new outline) of sections that still overflow.
    pub overflowing: Vec<usize>,
}

impl PaginationPass {
    /// Returns true if at least one section still overflows.
    pub fn still_overflowing(&self) -> bool {
        !self.overflowing.is_empty()
    }
}

/// Intermediate slide content produced while splitting.
#[derive(Debug, Clone, Default)]
struct SectionChunk {
    points: Vec<String>,
    table_rows: Option<Vec<String>>,
}

/// Estimates the weighted units of a section's visible text.
pub fn estimate_section_units(section: &OutlineSection) -> usize {
    let mut total = weighted_length(&section.title);
    if let Some(subtitle) = &section.subtitle {
        total += weighted_length(subtitle);
    }
    total += section.points.iter().map(|p| weighted_length(p)).sum::<usize>();
    if let Some(notes) = &section.speaker_notes {
        total += weighted_length(notes).min(weighted_limit_units(NOTES_LIMIT_CHARS));
    }
    total
}

/// Returns true if the section exceeds any of the configured limits.
pub fn section_overflows(section: &OutlineSection, config: &PaginationConfig) -> bool {
    let max_units = weighted_limit_units(config.max_chars);
    if !section.points.is_empty() && section.points.len() > config.max_bullets {
        return true;
    }
    if estimate_section_units(section) > max_units {
        return true;
    }
    if count_table_rows(section.raw_content.as_deref()) > config.max_table_rows {
        return true;
    }
    section.points.is_empty()
        && section
            .raw_content
            .as_deref()
            .is_some_and(|raw| weighted_length(raw) > max_units)
}

/// Splits the section if it overflows; otherwise returns it unchanged.
pub fn split_section(section: &OutlineSection, config: &PaginationConfig) -> SplitOutcome {
    if !section_overflows(section, config) {
        return SplitOutcome::unchanged(section, config);
    }
    force_split_section(section, config)
}

/// Splits the section regardless of whether it overflows.
pub fn force_split_section(section: &OutlineSection, config: &PaginationConfig) -> SplitOutcome {
    let has_raw = section
        .raw_content
        .as_deref()
        .is_some_and(|raw| !raw.trim().is_empty());
    if section.points.is_empty() && !has_raw {
        return SplitOutcome::unchanged(section, config);
    }

    let table = section.table();
    let (points, expanded) = expand_points(&section.points, config);
    let groups = group_points(&points, config);
    let mut chunks = build_chunks(groups, table.as_ref(), config);

    let mut warnings = Vec::new();
    let max_sections = config.max_sections();
    if chunks.len() > max_sections {
        let warning = format!(
            "Pagination guardrail hit for '{}': split count {} exceeds max {}. Merging overflow content.",
            section.title,
            chunks.len(),
            max_sections
        );
        tracing::warn!(target: TRACING_TARGET, section = %section.title, chunks = chunks.len(), max_sections, "Pagination guardrail hit");
        warnings.push(warning);
        merge_chunks(&mut chunks, max_sections);
    }

    let sections = build_sections_from_chunks(section, chunks, table.as_ref(), config);
    let table_split = table
        .as_ref()
        .is_some_and(|t| t.row_count() > config.max_table_rows);
    let changed = expanded || sections.len() > 1 || table_split;
    let still_overflowing = sections.iter().any(|s| section_overflows(s, config));

    SplitOutcome {
        sections,
        warnings,
        changed,
        still_overflowing,
    }
}

/// Builds continuation sections from explicit point groups.
///
/// Used when point groups come from somewhere other than the rule-based
/// grouping, e.g. an LLM regrouping of a stubborn section.
pub fn build_sections_from_groups(
    section: &OutlineSection,
    groups: Vec<Vec<String>>,
    config: &PaginationConfig,
) -> Vec<OutlineSection> {
    if groups.is_empty() {
        return vec![section.clone()];
    }
    let chunks = groups
        .into_iter()
        .map(|points| SectionChunk {
            points,
            table_rows: None,
        })
        .collect();
    build_sections_from_chunks(section, chunks, None, config)
}

/// Runs one pagination pass over every section of the outline.
pub fn paginate_outline(outline: &Outline, config: &PaginationConfig) -> PaginationPass {
    let mut sections = Vec::with_capacity(outline.sections.len());
    let mut warnings = Vec::new();
    let mut overflowing = Vec::new();
    let mut changed = false;

    for section in &outline.sections {
        let outcome = split_section(section, config);
        changed |= outcome.changed;
        warnings.extend(outcome.warnings);
        for split in outcome.sections {
            if section_overflows(&split, config) {
                overflowing.push(sections.len());
            }
            sections.push(split);
        }
    }

    let outline = if changed {
        Outline::new(outline.title.clone(), sections)
    } else {
        outline.clone()
    };

    PaginationPass {
        outline,
        warnings,
        changed,
        overflowing,
    }
}

/// Appends the continuation suffix to titles of non-first slides.
///
/// Idempotent: a title already ending with the suffix is returned as is.
pub fn continuation_title(title: &str, index: usize, suffix: &str) -> String {
    if index == 0 || suffix.is_empty() || title.ends_with(suffix) {
        return title.to_string();
    }
    format!("{title}{suffix}")
}

fn expand_points(points: &[String], config: &PaginationConfig) -> (Vec<String>, bool) {
    let max_units = weighted_limit_units(config.max_chars);
    let mut expanded = Vec::with_capacity(points.len());
    let mut changed = false;

    for point in points {
        if weighted_length(point) > max_units {
            expanded.extend(split_point_text(point, max_units));
            changed = true;
        } else {
            expanded.push(point.clone());
        }
    }

    (expanded, changed)
}

fn group_points(points: &[String], config: &PaginationConfig) -> Vec<Vec<String>> {
    let max_units = weighted_limit_units(config.max_chars);
    let mut groups = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_units = 0;

    for point in points {
        let units = weighted_length(point);
        let bullets_full = config.max_bullets > 0 && current.len() + 1 > config.max_bullets;
        let units_full = max_units > 0 && current_units + units > max_units;
        if !current.is_empty() && (bullets_full || units_full) {
            groups.push(std::mem::take(&mut current));
            current_units = 0;
        }
        current.push(point.clone());
        current_units += units;
    }

    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn build_chunks(
    groups: Vec<Vec<String>>,
    table: Option<&TableBlock>,
    config: &PaginationConfig,
) -> Vec<SectionChunk> {
    let mut chunks: Vec<SectionChunk> = groups
        .into_iter()
        .map(|points| SectionChunk {
            points,
            table_rows: None,
        })
        .collect();

    match table {
        Some(table) => {
            for rows in chunk_rows(&table.rows, config.max_table_rows) {
                chunks.push(SectionChunk {
                    points: Vec::new(),
                    table_rows: Some(rows),
                });
            }
        }
        None if chunks.is_empty() => chunks.push(SectionChunk::default()),
        None => {}
    }

    chunks
}

fn merge_chunks(chunks: &mut Vec<SectionChunk>, max_sections: usize) {
    if max_sections == 0 || chunks.len() <= max_sections {
        return;
    }
    let overflow = chunks.split_off(max_sections);
    let Some(last) = chunks.last_mut() else {
        return;
    };
    for extra in overflow {
        last.points.extend(extra.points);
        if let Some(rows) = extra.table_rows {
            last.table_rows.get_or_insert_with(Vec::new).extend(rows);
        }
    }
}

fn build_sections_from_chunks(
    section: &OutlineSection,
    chunks: Vec<SectionChunk>,
    table: Option<&TableBlock>,
    config: &PaginationConfig,
) -> Vec<OutlineSection> {
    let original_table = table.cloned().or_else(|| section.table());

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let title = continuation_title(&section.title, index, &config.continuation_suffix);
            let subtitle = if index == 0 { section.subtitle.clone() } else { None };
            let speaker_notes = if index == 0 {
                section.speaker_notes.clone()
            } else {
                None
            };
            let chunk_table = match (&original_table, chunk.table_rows) {
                (Some(table), Some(rows)) if !rows.is_empty() => Some(table.with_rows(rows)),
                _ => None,
            };

            let raw_content = render_section_content(
                &title,
                subtitle.as_deref(),
                &chunk.points,
                section.visual_suggestions.as_ref(),
                section.animation_effects.as_ref(),
                speaker_notes.as_deref(),
                chunk_table.as_ref(),
            );

            OutlineSection {
                title,
                subtitle,
                points: chunk.points,
                visual_suggestions: section.visual_suggestions.clone(),
                animation_effects: section.animation_effects.clone(),
                speaker_notes,
                raw_content: Some(raw_content),
            }
        })
        .collect()
}

fn split_point_text(text: &str, max_units: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return chunk_text(text, max_units);
    }

    let mut groups = Vec::new();
    let mut current = String::new();
    let mut current_units = 0;
    for sentence in sentences {
        let units = weighted_length(&sentence);
        if !current.is_empty() && max_units > 0 && current_units + units > max_units {
            groups.push(std::mem::take(&mut current));
            current_units = 0;
        }
        if !current.is_empty() && !ends_with_cjk(&current) {
            current.push(' ');
        }
        current.push_str(&sentence);
        current_units += units;
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
        .into_iter()
        .flat_map(|group| {
            if max_units > 0 && weighted_length(&group) > max_units {
                chunk_text(&group, max_units)
            } else {
                vec![group]
            }
        })
        .collect()
}

fn ends_with_cjk(text: &str) -> bool {
    text.chars()
        .next_back()
        .is_some_and(|c| is_cjk(c) || matches!(c, '。' | '！' | '？' | '；'))
}

/// Splits text after sentence terminators that are followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = SENTENCE_TERMINATORS.contains(&c)
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if at_boundary {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Hard-chunks text at character boundaries within the unit budget.
fn chunk_text(text: &str, max_units: usize) -> Vec<String> {
    if max_units == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut units = 0;
    for c in text.chars() {
        let c_units = char_units(c);
        if !buffer.is_empty() && units + c_units > max_units {
            chunks.push(std::mem::take(&mut buffer));
            units = 0;
        }
        buffer.push(c);
        units += c_units;
    }
    if !buffer.is_empty() {
        chunks.push(buffer);
    }

    chunks
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn chunk_rows(rows: &[String], size: usize) -> Vec<Vec<String>> {
    if size == 0 {
        return vec![rows.to_vec()];
    }
    rows.chunks(size).map(<[String]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig::default()
            .with_max_bullets(5)
            .with_max_chars(300)
            .with_max_table_rows(8)
            .with_max_splits_per_section(3)
            .with_continuation_suffix(" (cont.)")
    }

    fn section_with_points(count: usize) -> OutlineSection {
        let points: Vec<String> = (1..=count).map(|i| format!("Point {i}")).collect();
        let raw = render_section_content("Overview", None, &points, None, None, None, None);
        OutlineSection::new("Overview")
            .with_points(points)
            .with_raw_content(raw)
    }

    fn section_with_table(rows: usize) -> OutlineSection {
        let mut raw = String::from("*   **Title**: Metrics\n\n| Name | Value |\n| --- | --- |\n");
        for i in 1..=rows {
            raw.push_str(&format!("| row{i} | {i} |\n"));
        }
        OutlineSection::new("Metrics").with_raw_content(raw)
    }

    #[test]
    fn bullet_overflow_splits_five_and_two() {
        let outcome = split_section(&section_with_points(7), &config());

        assert_eq!(outcome.sections.len(), 2);
        assert_eq!(outcome.sections[0].points.len(), 5);
        assert_eq!(outcome.sections[1].points.len(), 2);
        assert_eq!(outcome.sections[1].title, "Overview (cont.)");
        assert!(outcome.changed);
        assert!(!outcome.still_overflowing);
    }

    #[test]
    fn table_split_keeps_header_and_rows() {
        let cfg = config().with_max_table_rows(2);
        let outcome = split_section(&section_with_table(3), &cfg);

        assert_eq!(outcome.sections.len(), 2);
        let first = outcome.sections[0].table().expect("first table");
        let second = outcome.sections[1].table().expect("second table");
        assert_eq!(first.rows, vec!["| row1 | 1 |", "| row2 | 2 |"]);
        assert_eq!(second.rows, vec!["| row3 | 3 |"]);
        assert_eq!(second.header, "| Name | Value |");
        assert!(outcome.sections[1].title.ends_with(" (cont.)"));
        assert!(outcome.changed);
    }

    #[test]
    fn guardrail_merges_overflow_chunks() {
        let cfg = config().with_max_bullets(3).with_max_splits_per_section(1);
        let outcome = split_section(&section_with_points(12), &cfg);

        assert_eq!(outcome.sections.len(), 2);
        assert_eq!(outcome.sections[0].points.len(), 3);
        assert_eq!(outcome.sections[1].points.len(), 9);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Overview"));
        assert!(outcome.still_overflowing);
    }

    #[test]
    fn non_overflowing_section_is_unchanged() {
        let section = section_with_points(3);
        let outcome = split_section(&section, &config());

        assert_eq!(outcome.sections, vec![section]);
        assert!(!outcome.changed);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn empty_section_is_returned_as_is() {
        let section = OutlineSection::new("Blank");
        let outcome = force_split_section(&section, &config());
        assert_eq!(outcome.sections, vec![section]);
        assert!(!outcome.changed);
    }

    #[test]
    fn subtitle_and_notes_stay_on_first_slide() {
        let section = section_with_points(7)
            .with_subtitle("Sub")
            .with_speaker_notes("Notes");
        let outcome = split_section(&section, &config());

        assert_eq!(outcome.sections[0].subtitle.as_deref(), Some("Sub"));
        assert_eq!(outcome.sections[0].speaker_notes.as_deref(), Some("Notes"));
        assert!(outcome.sections[1].subtitle.is_none());
        assert!(outcome.sections[1].speaker_notes.is_none());
    }

    #[test]
    fn long_point_is_split_at_sentences() {
        let cfg = config().with_max_chars(10);
        let point = "First sentence here. Second one follows. Third closes it.".to_string();
        let section = OutlineSection::new("T").with_points([point]);
        let outcome = split_section(&section, &cfg);

        assert!(outcome.changed);
        let points: Vec<&String> = outcome.sections.iter().flat_map(|s| &s.points).collect();
        assert!(points.len() >= 3);
        assert_eq!(points[0], "First sentence here.");
    }

    #[test]
    fn long_point_without_boundaries_is_hard_chunked() {
        let chunks = chunk_text(&"中".repeat(10), 8);
        assert_eq!(chunks, vec!["中中中中", "中中中中", "中中"]);
    }

    #[test]
    fn sentences_need_trailing_whitespace() {
        assert_eq!(split_sentences("a. b! c"), vec!["a.", "b!", "c"]);
        assert_eq!(split_sentences("v1.2 is out"), vec!["v1.2 is out"]);
        assert_eq!(split_sentences("第一。 第二"), vec!["第一。", "第二"]);
    }

    #[test]
    fn continuation_suffix_is_idempotent() {
        let once = continuation_title("Intro", 1, " (cont.)");
        let twice = continuation_title(&once, 1, " (cont.)");
        assert_eq!(once, "Intro (cont.)");
        assert_eq!(once, twice);
        assert_eq!(continuation_title("Intro", 0, " (cont.)"), "Intro");
    }

    #[test]
    fn overflow_checks() {
        let cfg = config();
        assert!(!section_overflows(&section_with_points(5), &cfg));
        assert!(section_overflows(&section_with_points(6), &cfg));
        assert!(section_overflows(&section_with_table(9), &cfg));

        let wordy = OutlineSection::new("W").with_points(["x".repeat(601)]);
        assert!(section_overflows(&wordy, &cfg));

        let raw_only = OutlineSection::new("R").with_raw_content("y".repeat(601));
        assert!(section_overflows(&raw_only, &cfg));
    }

    #[test]
    fn notes_contribution_is_capped() {
        let section = OutlineSection::new("N").with_speaker_notes("z".repeat(5_000));
        assert_eq!(estimate_section_units(&section), 1 + 400);
    }

    #[test]
    fn points_and_table_become_separate_chunks() {
        let mut section = section_with_table(3);
        section.points = vec!["a".into(), "b".into()];
        let cfg = config().with_max_table_rows(2);
        let outcome = split_section(&section, &cfg);

        assert_eq!(outcome.sections.len(), 3);
        assert_eq!(outcome.sections[0].points, vec!["a", "b"]);
        assert!(outcome.sections[0].table().is_none());
        assert_eq!(outcome.sections[1].table().map(|t| t.row_count()), Some(2));
        assert_eq!(outcome.sections[2].table().map(|t| t.row_count()), Some(1));
    }

    #[test]
    fn repeated_pass_is_stable() {
        let outline = Outline::new("Deck", vec![section_with_points(7)]);
        let first = paginate_outline(&outline, &config());
        assert!(first.changed);

        let reparsed = Outline::from_markdown(&first.outline.raw_markdown);
        let second = paginate_outline(&reparsed, &config());
        assert!(!second.changed);
        assert_eq!(second.outline.sections.len(), 2);
    }

    #[test]
    fn groups_from_refiner_are_materialized() {
        let section = section_with_points(4).with_subtitle("S");
        let groups = vec![vec!["a".to_string()], vec!["b".to_string(), "c".to_string()]];
        let sections = build_sections_from_groups(&section, groups, &config());

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].points, vec!["b", "c"]);
        assert_eq!(sections[1].title, "Overview (cont.)");
    }
}
