//! Cross-run aggregation: merge independently produced exports into one report.
//!
//! Every directory below the root that holds a `benchmark_results.csv` is an export.
//! Its identity comes from its `manifest.json`, or from its position in the
//! `<extractor>/<run>` hierarchy when there is no usable manifest. All rows are loaded,
//! their stored coverage and consensus values are ignored, and the whole corpus is
//! scored again from the measurements and the text artifacts on disk, with peers
//! spanning every extractor and run. Texts are read from the export each row came
//! from, so the root may hold several output roots side by side.
//!
//! Source exports are only read. The combined report goes to the summary directory,
//! which discovery never descends into, so re-running over an unchanged corpus
//! reproduces the report byte for byte.

use crate::error::{BenchError, Result};
use crate::layout::{
    document_stem, text_candidates, text_path, COMBINED_STEM, DEFAULT_RUN_CONTEXT, EXPORT_FILE,
    UNKNOWN_EXTRACTOR,
};
use crate::manifest::Manifest;
use crate::progress::{Progress, ProgressEvent};
use crate::record::{RawRecord, RecordKey, RecordStatus};
use crate::report::{write_report, CombinedRow, ReportPaths};
use crate::scoring::{score_corpus, TextSource};
use crate::similarity::Similarity;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Title of the combined Markdown report.
const COMBINED_TITLE: &str = "Combined benchmark results";

/// Where the text artifacts of an export live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLocation {
    /// The export directory itself.
    pub export_dir: PathBuf,
    /// Top-level directory of the extractor below the root.
    pub extractor_dir: PathBuf,
    /// Run directory name below `extractor_dir`, when the export sits that deep.
    pub run_dir: Option<String>,
}

impl TextLocation {
    /// Paths to try for the text of `stem`: the export's own layout first, then the
    /// [`text_candidates`] derived from the directory hierarchy.
    #[must_use]
    pub fn candidates(&self, stem: &str) -> Vec<PathBuf> {
        let mut candidates = vec![text_path(&self.export_dir, stem)];
        for candidate in text_candidates(&self.extractor_dir, self.run_dir.as_deref(), stem) {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }
}

/// One discovered export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub dir: PathBuf,
    pub extractor_id: String,
    pub run_context: String,
    /// Identity came from `manifest.json` rather than the directory layout.
    pub from_manifest: bool,
    pub texts: TextLocation,
}

/// Parameters of a summary pass.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub input_dir: PathBuf,
    /// Where the combined report is written. Defaults to `<input_dir>/<summary_dir>`.
    pub output_dir: Option<PathBuf>,
    /// Directory name that is never treated as holding exports.
    pub summary_dir: String,
    pub similarity: Similarity,
}

/// Result of a summary pass.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub exports: Vec<Export>,
    pub rows: Vec<CombinedRow>,
    pub reports: ReportPaths,
}

/// Find every export below `root`, sorted by path.
///
/// Directories named `skip_name`, and `skip_dir` itself, are not searched.
pub fn discover_exports(root: &Path, skip_name: &str, skip_dir: Option<&Path>) -> Result<Vec<Export>> {
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| BenchError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| BenchError::io(&dir, e))?;
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if entry.file_name() == skip_name || skip_dir.is_some_and(|skip| path == skip) {
                    continue;
                }
                stack.push(path);
            } else if file_type.is_file() && entry.file_name() == EXPORT_FILE {
                dirs.push(dir.clone());
            }
        }
    }

    dirs.sort();
    Ok(dirs.into_iter().map(|dir| identify_export(root, dir)).collect())
}

fn identify_export(root: &Path, dir: PathBuf) -> Export {
    let parts: Vec<String> = dir
        .strip_prefix(root)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    let (inferred_extractor, inferred_run) = match parts.as_slice() {
        [] => (UNKNOWN_EXTRACTOR, DEFAULT_RUN_CONTEXT),
        [extractor] => (extractor.as_str(), DEFAULT_RUN_CONTEXT),
        [extractor, run, ..] => (extractor.as_str(), run.as_str()),
    };
    let texts = TextLocation {
        export_dir: dir.clone(),
        extractor_dir: parts.first().map_or_else(|| root.to_path_buf(), |p| root.join(p)),
        run_dir: parts.get(1).cloned(),
    };

    match Manifest::read(&dir) {
        Some(manifest) => Export {
            dir,
            extractor_id: manifest.extractor_id,
            run_context: manifest.run_context,
            from_manifest: true,
            texts,
        },
        None => Export {
            extractor_id: inferred_extractor.to_string(),
            run_context: inferred_run.to_string(),
            dir,
            from_manifest: false,
            texts,
        },
    }
}

/// A row as stored in an export. Every field is read as text and parsed leniently.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportRow {
    #[serde(alias = "pdf_file")]
    document_id: String,
    #[serde(alias = "library")]
    extractor_id: String,
    page_count: String,
    #[serde(alias = "extract_time_sec")]
    elapsed_seconds: String,
    #[serde(alias = "text_chars")]
    text_char_count: String,
    table_count: String,
    table_structure_pct: String,
    image_count: String,
    status: String,
    error_message: String,
}

impl ExportRow {
    fn into_record(self, export: &Export) -> RawRecord {
        let extractor_id = if self.extractor_id.trim().is_empty() {
            export.extractor_id.clone()
        } else {
            self.extractor_id.trim().to_string()
        };
        RawRecord {
            document_id: self.document_id.trim().to_string(),
            extractor_id,
            run_context: Some(export.run_context.clone()),
            page_count: parse_count(&self.page_count),
            elapsed_seconds: parse_float(&self.elapsed_seconds),
            text_char_count: parse_count(&self.text_char_count),
            table_count: parse_count(&self.table_count),
            table_structure_pct: parse_float(&self.table_structure_pct),
            image_count: parse_count(&self.image_count),
            status: self.status.parse().unwrap_or(RecordStatus::Error),
            error_message: self.error_message,
        }
        .sanitized()
    }
}

/// Load the rows of one export, tagged with its run context.
///
/// Rows without a document id are dropped. Stored coverage and consensus columns are
/// never read.
pub fn load_export(export: &Export) -> Result<Vec<RawRecord>> {
    let path = export.dir.join(EXPORT_FILE);
    let bytes = fs::read(&path).map_err(|e| BenchError::io(&path, e))?;
    let contents = String::from_utf8_lossy(&bytes);
    let contents = contents.trim_start_matches('\u{feff}');

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());
    let mut records = Vec::new();
    for row in reader.deserialize::<ExportRow>() {
        let row = row?;
        if row.document_id.trim().is_empty() {
            continue;
        }
        records.push(row.into_record(export));
    }
    Ok(records)
}

fn parse_float(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

// Counts may have been written as floats ("12.0")
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_count(value: &str) -> u64 {
    let value = value.trim();
    value.parse::<u64>().unwrap_or_else(|_| {
        let float = parse_float(value);
        if float > 0.0 {
            float as u64
        } else {
            0
        }
    })
}

/// Texts read from export directories, one location per record in corpus order.
///
/// Each record reads from the export it was loaded from, so exports under different
/// roots that declare the same identity never share a text. Missing or unreadable
/// files read as empty text.
#[derive(Debug, Default)]
pub struct DiskTexts {
    locations: Vec<TextLocation>,
}

impl DiskTexts {
    /// Register where the text of the next record lives.
    pub fn push(&mut self, location: TextLocation) {
        self.locations.push(location);
    }
}

impl TextSource for DiskTexts {
    fn text(&self, index: usize, key: &RecordKey) -> String {
        let Some(location) = self.locations.get(index) else {
            return String::new();
        };
        let stem = document_stem(&key.document_id);
        location
            .candidates(&stem)
            .iter()
            .find_map(|candidate| fs::read(candidate).ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

/// Merge every export below `request.input_dir` into one freshly scored report.
pub fn summarize(request: &SummaryRequest, progress: &dyn Progress) -> Result<SummaryOutcome> {
    let root = &request.input_dir;
    if !root.is_dir() {
        return Err(BenchError::MissingDirectory(root.clone()));
    }
    let output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| root.join(&request.summary_dir));

    let exports = discover_exports(root, &request.summary_dir, Some(&output_dir))?;
    if exports.is_empty() {
        return Err(BenchError::NoExports(root.clone()));
    }

    let mut records = Vec::new();
    let mut sources = Vec::new();
    let mut texts = DiskTexts::default();
    for (idx, export) in exports.iter().enumerate() {
        progress.event(ProgressEvent::ExportDiscovered {
            index: idx + 1,
            total: exports.len(),
            path: &export.dir,
        });
        for record in load_export(export)? {
            texts.push(export.texts.clone());
            sources.push(export.extractor_id.clone());
            records.push(record);
        }
    }

    let scored = score_corpus(records, &texts, &request.similarity, progress);
    let rows: Vec<CombinedRow> = sources
        .into_iter()
        .zip(scored)
        .map(|(source_extractor, record)| CombinedRow {
            source_extractor,
            record,
        })
        .collect();

    let reports = write_report(&output_dir, COMBINED_STEM, COMBINED_TITLE, &rows)?;
    progress.event(ProgressEvent::ReportWritten { path: &reports.csv });
    progress.event(ProgressEvent::ReportWritten {
        path: &reports.markdown,
    });

    Ok(SummaryOutcome {
        exports,
        rows,
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_is_lenient() {
        assert_eq!(parse_count("12"), 12);
        assert_eq!(parse_count(" 12.9 "), 12);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count("n/a"), 0);
        assert_eq!(parse_count(""), 0);
    }

    #[test]
    fn test_parse_float_rejects_non_finite() {
        assert_eq!(parse_float("0.5"), 0.5);
        assert_eq!(parse_float("NaN"), 0.0);
        assert_eq!(parse_float("inf"), 0.0);
        assert_eq!(parse_float("abc"), 0.0);
    }

    #[test]
    fn test_identity_inferred_from_path_depth() {
        let root = Path::new("/out");
        let deep = identify_export(root, root.join("lopdf/papers/extra"));
        assert_eq!(deep.extractor_id, "lopdf");
        assert_eq!(deep.run_context, "papers");
        assert_eq!(deep.texts.extractor_dir, Path::new("/out/lopdf"));
        assert_eq!(deep.texts.run_dir.as_deref(), Some("papers"));

        let shallow = identify_export(root, root.join("lopdf"));
        assert_eq!(shallow.extractor_id, "lopdf");
        assert_eq!(shallow.run_context, "default");
        assert_eq!(shallow.texts.run_dir, None);

        let at_root = identify_export(root, root.to_path_buf());
        assert_eq!(at_root.extractor_id, "unknown");
        assert_eq!(at_root.run_context, "default");
        assert!(!at_root.from_manifest);
    }

    #[test]
    fn test_row_aliases_and_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let export_dir = dir.path().join("pymupdf").join("scans");
        fs::create_dir_all(&export_dir).unwrap();
        fs::write(
            export_dir.join(EXPORT_FILE),
            "\u{feff}pdf_file,library,page_count,extract_time_sec,text_chars,text_coverage_pct,status,error_message\n\
             a.pdf,pymupdf,2,0.5,100,55.0,ok,\n\
             b.pdf,,x,-1,3.0,1,weird,oops\n\
             ,pymupdf,1,1,1,1,ok,\n",
        )
        .unwrap();

        let export = identify_export(dir.path(), export_dir);
        let rows = load_export(&export).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].document_id, "a.pdf");
        assert_eq!(rows[0].extractor_id, "pymupdf");
        assert_eq!(rows[0].run_context.as_deref(), Some("scans"));
        assert_eq!(rows[0].page_count, 2);
        assert_eq!(rows[0].text_char_count, 100);
        assert_eq!(rows[0].status, RecordStatus::Ok);

        assert_eq!(rows[1].extractor_id, "pymupdf");
        assert_eq!(rows[1].page_count, 0);
        assert_eq!(rows[1].elapsed_seconds, 0.0);
        assert_eq!(rows[1].text_char_count, 3);
        assert_eq!(rows[1].status, RecordStatus::Error);
        assert_eq!(rows[1].error_message, "oops");
    }

    #[test]
    fn test_disk_texts_fall_back_through_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let extractor_dir = dir.path().join("lopdf");
        fs::create_dir_all(extractor_dir.join("texts")).unwrap();
        fs::write(extractor_dir.join("texts").join("a.txt"), b"flat \xff layout").unwrap();

        let key = RecordKey {
            document_id: "a.pdf".to_string(),
            extractor_id: "lopdf".to_string(),
            run_context: Some("papers".to_string()),
        };
        let mut texts = DiskTexts::default();
        texts.push(TextLocation {
            export_dir: dir.path().join("elsewhere").join("lopdf").join("papers"),
            extractor_dir: extractor_dir.clone(),
            run_dir: Some("papers".to_string()),
        });
        assert_eq!(texts.text(0, &key), "flat \u{fffd} layout");

        let nested = extractor_dir.join("papers").join("a").join("texts");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("a.txt"), "primary").unwrap();
        assert_eq!(texts.text(0, &key), "primary");

        let own = dir.path().join("elsewhere").join("lopdf").join("papers").join("a").join("texts");
        fs::create_dir_all(&own).unwrap();
        fs::write(own.join("a.txt"), "own export").unwrap();
        assert_eq!(texts.text(0, &key), "own export");

        let unknown = RecordKey {
            document_id: "b.pdf".to_string(),
            ..key.clone()
        };
        assert_eq!(texts.text(0, &unknown), "");
        // No location registered for this record
        assert_eq!(texts.text(1, &key), "");
    }

    #[test]
    fn test_candidates_start_at_the_export_and_skip_repeats() {
        let root = Path::new("/all");
        let nested = identify_export(root, root.join("out1/lopdf/papers"));
        let candidates = nested.texts.candidates("a");
        assert_eq!(candidates[0], Path::new("/all/out1/lopdf/papers/a/texts/a.txt"));
        assert_eq!(candidates[1], Path::new("/all/out1/lopdf/a/texts/a.txt"));

        let direct = identify_export(root, root.join("lopdf/papers"));
        let candidates = direct.texts.candidates("a");
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0], Path::new("/all/lopdf/papers/a/texts/a.txt"));
    }

    #[test]
    fn test_discovery_skips_summary_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["b/run", "a/run", "summary", "a/run/summary"] {
            let path = dir.path().join(sub);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join(EXPORT_FILE), "document_id\n").unwrap();
        }

        let exports = discover_exports(dir.path(), "summary", None).unwrap();
        let ids: Vec<&str> = exports.iter().map(|e| e.extractor_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
