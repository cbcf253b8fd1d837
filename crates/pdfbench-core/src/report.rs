//! CSV and Markdown serialization of scored records.
//!
//! Both formats share one column order. The CSV export is machine-facing (floats with
//! [`CSV_DECIMALS`] decimals, every column). The Markdown export is human-facing (floats
//! with [`MARKDOWN_DECIMALS`] decimals) and drops the `error_message` column. Rows are
//! written in the order given; nothing is sorted here.

use crate::error::{BenchError, Result};
use crate::record::ResultRecord;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Float precision of CSV exports.
pub const CSV_DECIMALS: usize = 6;

/// Float precision of Markdown exports.
pub const MARKDOWN_DECIMALS: usize = 3;

/// Column left out of the Markdown export.
const ERROR_COLUMN: &str = "error_message";

/// Result Record columns, in field order.
pub const RECORD_COLUMNS: [&str; 13] = [
    "document_id",
    "extractor_id",
    "run_context",
    "page_count",
    "elapsed_seconds",
    "text_char_count",
    "coverage_pct",
    "consensus_pct",
    "table_count",
    "table_structure_pct",
    "image_count",
    "status",
    ERROR_COLUMN,
];

/// Columns of the combined cross-run report.
pub const COMBINED_COLUMNS: [&str; 14] = [
    "document_id",
    "extractor_id",
    "run_context",
    "source_extractor",
    "page_count",
    "elapsed_seconds",
    "text_char_count",
    "coverage_pct",
    "consensus_pct",
    "table_count",
    "table_structure_pct",
    "image_count",
    "status",
    ERROR_COLUMN,
];

/// One cell of a report row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Int(u64),
    Float(f64),
}

impl Cell<'_> {
    fn render(self, decimals: usize) -> String {
        match self {
            Cell::Text(text) => text.to_string(),
            Cell::Int(value) => value.to_string(),
            Cell::Float(value) => format!("{value:.decimals$}"),
        }
    }
}

/// Anything that can be written as a report row.
pub trait ReportRow {
    /// Header names, one per cell.
    fn columns() -> &'static [&'static str];

    /// Cells in [`ReportRow::columns`] order.
    fn cells(&self) -> Vec<Cell<'_>>;
}

impl ReportRow for ResultRecord {
    fn columns() -> &'static [&'static str] {
        &RECORD_COLUMNS
    }

    fn cells(&self) -> Vec<Cell<'_>> {
        let raw = self.raw();
        vec![
            Cell::Text(&raw.document_id),
            Cell::Text(&raw.extractor_id),
            Cell::Text(raw.run_context.as_deref().unwrap_or("")),
            Cell::Int(raw.page_count),
            Cell::Float(raw.elapsed_seconds),
            Cell::Int(raw.text_char_count),
            Cell::Float(self.coverage_pct()),
            Cell::Float(self.consensus_pct()),
            Cell::Int(raw.table_count),
            Cell::Float(raw.table_structure_pct),
            Cell::Int(raw.image_count),
            Cell::Text(raw.status.as_str()),
            Cell::Text(&raw.error_message),
        ]
    }
}

/// A scored record tagged with the export it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRow {
    pub source_extractor: String,
    pub record: ResultRecord,
}

impl ReportRow for CombinedRow {
    fn columns() -> &'static [&'static str] {
        &COMBINED_COLUMNS
    }

    fn cells(&self) -> Vec<Cell<'_>> {
        let mut cells = self.record.cells();
        cells.insert(3, Cell::Text(&self.source_extractor));
        cells
    }
}

/// Render rows as CSV with a header line.
pub fn to_csv<R: ReportRow>(rows: &[R]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(R::columns())?;
    for row in rows {
        writer.write_record(row.cells().into_iter().map(|c| c.render(CSV_DECIMALS)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| BenchError::Csv(err.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render rows as a titled Markdown pipe table, without the error column.
#[must_use]
pub fn to_markdown<R: ReportRow>(title: &str, rows: &[R]) -> String {
    let keep: Vec<bool> = R::columns().iter().map(|c| *c != ERROR_COLUMN).collect();
    let header: Vec<&str> = R::columns()
        .iter()
        .zip(&keep)
        .filter_map(|(c, k)| k.then_some(*c))
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 4);
    lines.push(format!("# {title}"));
    lines.push(String::new());
    lines.push(format!("| {} |", header.join(" | ")));
    lines.push(format!("| {} |", vec!["---"; header.len()].join(" | ")));
    for row in rows {
        let cells: Vec<String> = row
            .cells()
            .into_iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(cell, _)| escape_markdown(&cell.render(MARKDOWN_DECIMALS)))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

fn escape_markdown(cell: &str) -> String {
    cell.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

/// Paths of a written CSV/Markdown report pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub markdown: PathBuf,
}

/// Write `<dir>/<stem>.csv` and `<dir>/<stem>.md`, creating `dir` if needed.
pub fn write_report<R: ReportRow>(
    dir: &Path,
    stem: &str,
    title: &str,
    rows: &[R],
) -> Result<ReportPaths> {
    let paths = ReportPaths {
        csv: dir.join(format!("{stem}.csv")),
        markdown: dir.join(format!("{stem}.md")),
    };
    write_atomic(&paths.csv, to_csv(rows)?.as_bytes())?;
    write_atomic(&paths.markdown, to_markdown(title, rows).as_bytes())?;
    Ok(paths)
}

/// Replace `path` with `contents` so readers never observe a partial file.
///
/// The data goes to a temporary file in the same directory, is synced, then renamed
/// over the destination.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;

    let mut file = tempfile::NamedTempFile::new_in(parent).map_err(|e| BenchError::io(parent, e))?;
    file.write_all(contents).map_err(|e| BenchError::io(path, e))?;
    file.as_file().sync_all().map_err(|e| BenchError::io(path, e))?;
    file.persist(path).map_err(|e| BenchError::io(path, e.error))?;
    Ok(())
}
