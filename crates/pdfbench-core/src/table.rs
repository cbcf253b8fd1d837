//! Extracted table grids: structural sanity check and markdown rendering.

// Percentages are ratios of counts
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

/// A table as produced by an extraction engine: ordered rows of optional cells.
///
/// Rows may be ragged and cells may be absent (`None`), which is how engines report
/// merged or undetected cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    #[must_use]
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Build a table where every cell is present.
    #[must_use]
    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|cell| Some(cell.into())).collect())
                .collect(),
        }
    }

    /// Widest row, counting absent cells.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// At least two rows, and at least one row with two or more present cells.
    ///
    /// This only flags the single-row and single-column "tables" engines sometimes
    /// hallucinate; it says nothing about whether the content is right. Empty strings
    /// count as present cells.
    #[must_use]
    pub fn is_structurally_valid(&self) -> bool {
        self.rows.len() >= 2
            && self
                .rows
                .iter()
                .any(|row| row.iter().filter(|cell| cell.is_some()).count() >= 2)
    }

    /// Render as a pipe-table for human inspection.
    ///
    /// Rows are padded to the widest row, absent cells become empty strings, line
    /// breaks inside cells become spaces and cells are trimmed. The first row is the
    /// header. Returns an empty string for a table without any cells.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let num_cols = self.column_count();
        if num_cols == 0 {
            return String::new();
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        for (idx, row) in self.rows.iter().enumerate() {
            let cells: Vec<String> = (0..num_cols)
                .map(|col| {
                    row.get(col)
                        .and_then(Option::as_deref)
                        .map_or_else(String::new, clean_cell)
                })
                .collect();
            lines.push(format!("| {} |", cells.join(" | ")));
            if idx == 0 {
                lines.push(format!("| {} |", vec!["---"; num_cols].join(" | ")));
            }
        }

        lines.join("\n")
    }
}

fn clean_cell(cell: &str) -> String {
    cell.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .replace('|', "\\|")
}

/// Share of structurally valid tables, as a percentage. Zero when there are no tables.
#[must_use]
pub fn structure_pct(tables: &[Table]) -> f64 {
    if tables.is_empty() {
        return 0.0;
    }
    let valid = tables.iter().filter(|t| t.is_structurally_valid()).count();
    valid as f64 / tables.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_column_table_is_invalid() {
        let table = Table::from_strings([["a"], ["b"]]);
        assert!(!table.is_structurally_valid());
    }

    #[test]
    fn test_two_by_two_table_is_valid() {
        let table = Table::from_strings([["a", "b"], ["c", "d"]]);
        assert!(table.is_structurally_valid());
    }

    #[test]
    fn test_single_row_table_is_invalid() {
        let table = Table::from_strings([["a", "b", "c"]]);
        assert!(!table.is_structurally_valid());
    }

    #[test]
    fn test_absent_cells_do_not_count() {
        let table = Table::new(vec![
            vec![Some("a".to_string()), None],
            vec![None, Some("d".to_string())],
        ]);
        assert!(!table.is_structurally_valid());

        let table = Table::new(vec![
            vec![Some("a".to_string()), None, Some(String::new())],
            vec![None],
        ]);
        assert!(table.is_structurally_valid());
    }

    #[test]
    fn test_ragged_table_with_one_wide_row_is_valid() {
        let table = Table::from_strings(vec![vec!["x"], vec!["y", "z"], vec![]]);
        assert!(table.is_structurally_valid());
    }

    #[test]
    fn test_markdown_pads_and_cleans_cells() {
        let table = Table::new(vec![
            vec![Some("Name".to_string()), Some("Value".to_string())],
            vec![Some(" multi\nline ".to_string())],
            vec![None, Some("a|b".to_string())],
        ]);
        assert_eq!(
            table.to_markdown(),
            "| Name | Value |\n| --- | --- |\n| multi line |  |\n|  | a\\|b |"
        );
    }

    #[test]
    fn test_markdown_header_only() {
        let table = Table::from_strings([["h1", "h2"]]);
        assert_eq!(table.to_markdown(), "| h1 | h2 |\n| --- | --- |");
    }

    #[test]
    fn test_markdown_empty_table() {
        assert_eq!(Table::default().to_markdown(), "");
        assert_eq!(Table::new(vec![vec![], vec![]]).to_markdown(), "");
    }

    #[test]
    fn test_structure_pct() {
        assert_eq!(structure_pct(&[]), 0.0);
        let tables = vec![
            Table::from_strings([["a", "b"], ["c", "d"]]),
            Table::from_strings([["a"], ["b"]]),
            Table::from_strings([["a", "b"], ["c", "d"]]),
            Table::from_strings([["only"]]),
        ];
        assert!((structure_pct(&tables) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_deserializes_json_grid_with_nulls() {
        let table: Table = serde_json::from_str(r#"[["a", null], ["b", "c"]]"#).unwrap();
        assert_eq!(table.rows[0][1], None);
        assert!(table.is_structurally_valid());
    }
}
