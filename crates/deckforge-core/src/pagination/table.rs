//! Markdown table detection.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?[\s:-]+\|[\s|:-]*\|?\s*$").expect("table separator pattern is valid")
});

/// A markdown table kept as raw lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Header line.
    pub header: String,
    /// Separator line (`|---|---|`).
    pub separator: String,
    /// Data rows in order.
    pub rows: Vec<String>,
}

impl TableBlock {
    /// Extracts the first table with at least one data row.
    ///
    /// A table starts at a line containing `|` immediately followed by a valid
    /// separator line; rows continue until the first empty or pipe-less line.
    pub fn extract(raw: &str) -> Option<Self> {
        let lines: Vec<&str> = raw.lines().map(str::trim_end).collect();

        for (index, pair) in lines.windows(2).enumerate() {
            let header = pair[0].trim();
            let separator = pair[1].trim();
            if !header.contains('|') || !is_table_separator(separator) {
                continue;
            }

            let rows: Vec<String> = lines[index + 2..]
                .iter()
                .map(|line| line.trim())
                .take_while(|line| !line.is_empty() && line.contains('|'))
                .map(str::to_string)
                .collect();

            if !rows.is_empty() {
                return Some(Self {
                    header: header.to_string(),
                    separator: separator.to_string(),
                    rows,
                });
            }
        }

        None
    }

    /// Returns a copy of the table with a different set of rows.
    pub fn with_rows(&self, rows: Vec<String>) -> Self {
        Self {
            header: self.header.clone(),
            separator: self.separator.clone(),
            rows,
        }
    }

    /// Returns the number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Returns true if `line` is a markdown table separator row.
pub fn is_table_separator(line: &str) -> bool {
    SEPARATOR.is_match(line)
}

/// Counts the data rows of the first table in `raw`.
pub fn count_table_rows(raw: Option<&str>) -> usize {
    raw.and_then(TableBlock::extract)
        .map_or(0, |table| table.row_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_table() {
        let raw = "intro\n| a | b |\n| --- | :-: |\n| 1 | 2 |\n| 3 | 4 |\n\n| x |\n|---|\n| y |";
        let table = TableBlock::extract(raw).expect("table");

        assert_eq!(table.header, "| a | b |");
        assert_eq!(table.separator, "| --- | :-: |");
        assert_eq!(table.rows, vec!["| 1 | 2 |", "| 3 | 4 |"]);
    }

    #[test]
    fn header_without_rows_is_ignored() {
        assert!(TableBlock::extract("| a | b |\n|---|---|\n\ntext").is_none());
    }

    #[test]
    fn separator_detection() {
        assert!(is_table_separator("|---|---|"));
        assert!(is_table_separator("--- | ---"));
        assert!(is_table_separator("| :--- | ---: |"));
        assert!(!is_table_separator("| a | b |"));
        assert!(!is_table_separator("---"));
    }

    #[test]
    fn counts_rows() {
        assert_eq!(count_table_rows(None), 0);
        assert_eq!(count_table_rows(Some("| a |\n|---|\n| 1 |\n| 2 |")), 2);
    }
}
