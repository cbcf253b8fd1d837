//! On-disk layout of benchmark exports and their artifacts.
//!
//! ```text
//! <root>/<extractor>/<run>/manifest.json
//! <root>/<extractor>/<run>/benchmark_results.{csv,md}
//! <root>/<extractor>/<run>/<stem>/texts/<stem>.txt
//! <root>/<extractor>/<run>/<stem>/tables/<stem>_p<page>_t<n>.md
//! <root>/<extractor>/<run>/<stem>/images/<stem>_p<page>_i<n>.<ext>
//! <root>/<summary>/<run>/pass_results.{csv,md}
//! <root>/<summary>/combined_benchmark_results.{csv,md}
//! ```

use std::path::{Path, PathBuf};

/// Marker file of an export directory.
pub const EXPORT_FILE: &str = "benchmark_results.csv";

/// Report stem of an export directory.
pub const EXPORT_STEM: &str = "benchmark_results";

/// Report stem of the per-pass report.
pub const PASS_STEM: &str = "pass_results";

/// Report stem of the cross-run report.
pub const COMBINED_STEM: &str = "combined_benchmark_results";

/// Identity file of an export directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Default directory (under the output root) for pass and combined reports.
pub const DEFAULT_SUMMARY_DIR: &str = "summary";

/// Run context used when none can be determined.
pub const DEFAULT_RUN_CONTEXT: &str = "default";

/// Extractor used when none can be determined.
pub const UNKNOWN_EXTRACTOR: &str = "unknown";

/// `<root>/<extractor>/<run>`.
#[must_use]
pub fn export_dir(root: &Path, extractor_id: &str, run_context: &str) -> PathBuf {
    root.join(sanitize_component(extractor_id))
        .join(sanitize_component(run_context))
}

/// Per-document artifact directory inside an export.
#[must_use]
pub fn document_dir(export_dir: &Path, stem: &str) -> PathBuf {
    export_dir.join(stem)
}

#[must_use]
pub fn text_path(export_dir: &Path, stem: &str) -> PathBuf {
    document_dir(export_dir, stem)
        .join("texts")
        .join(format!("{stem}.txt"))
}

/// `page` and `index` are 1-based.
#[must_use]
pub fn table_path(export_dir: &Path, stem: &str, page: u32, index: usize) -> PathBuf {
    document_dir(export_dir, stem)
        .join("tables")
        .join(format!("{stem}_p{page}_t{index}.md"))
}

/// `page` and `index` are 1-based.
#[must_use]
pub fn image_path(
    export_dir: &Path,
    stem: &str,
    page: u32,
    index: usize,
    extension: &str,
) -> PathBuf {
    document_dir(export_dir, stem)
        .join("images")
        .join(format!("{stem}_p{page}_i{index}.{extension}"))
}

/// Where a text for `stem` may live, most specific first.
///
/// `extractor_dir` is the extractor's top-level directory and `run_dir` the run
/// directory name below it, when the export sits that deep.
#[must_use]
pub fn text_candidates(extractor_dir: &Path, run_dir: Option<&str>, stem: &str) -> Vec<PathBuf> {
    let file_name = format!("{stem}.txt");
    let mut candidates = Vec::with_capacity(4);
    if let Some(run) = run_dir {
        let run_path = extractor_dir.join(run);
        candidates.push(run_path.join(stem).join("texts").join(&file_name));
        candidates.push(run_path.join("texts").join(&file_name));
    }
    candidates.push(extractor_dir.join(stem).join("texts").join(&file_name));
    candidates.push(extractor_dir.join("texts").join(&file_name));
    candidates
}

/// Document stem: the file name without its final extension.
#[must_use]
pub fn document_stem(document_id: &str) -> String {
    Path::new(document_id)
        .file_stem()
        .map_or_else(|| document_id.to_string(), |s| s.to_string_lossy().into_owned())
}

/// Run context derived from the input directory name.
#[must_use]
pub fn run_context_for(input_dir: &Path) -> String {
    input_dir
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(input_dir)
        .file_name()
        .map_or_else(
            || DEFAULT_RUN_CONTEXT.to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
}

/// Make a name safe to use as a single path component.
#[must_use]
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') || c.is_control() { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
