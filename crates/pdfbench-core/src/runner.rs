//! One benchmark pass: every engine over every document of a corpus directory.
//!
//! Each (document, engine) pair is isolated. A failure, or a panic inside the engine,
//! becomes a `status=error` record and the pass moves on. Only setup problems (missing
//! input directory, no documents, unwritable output root or reports) abort the pass.

use crate::error::{BenchError, ExtractError, Result};
use crate::extract::{check_engine_ids, Engine, Extraction, Extractor};
use crate::layout::{self, EXPORT_STEM, PASS_STEM};
use crate::manifest::Manifest;
use crate::progress::{Progress, ProgressEvent};
use crate::record::{Measurements, RawRecord, ResultRecord};
use crate::report::{write_report, ReportPaths};
use crate::scoring::score_corpus;
use crate::similarity::Similarity;
use crate::table::{structure_pct, Table};
use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Parameters of a benchmark pass.
#[derive(Debug, Clone)]
pub struct BenchmarkRequest {
    pub input_dir: PathBuf,
    pub output_root: PathBuf,
    /// Defaults to the input directory's name.
    pub run_context: Option<String>,
    pub summary_dir: String,
    pub similarity: Similarity,
}

/// The export written for one engine.
#[derive(Debug, Clone)]
pub struct EngineExport {
    pub extractor_id: String,
    pub dir: PathBuf,
    pub reports: ReportPaths,
    pub manifest: PathBuf,
}

/// Result of a benchmark pass.
#[derive(Debug, Clone)]
pub struct BenchmarkPass {
    pub run_context: String,
    /// Scored records, document by document, engines in the order given.
    pub records: Vec<ResultRecord>,
    pub exports: Vec<EngineExport>,
    pub pass_reports: ReportPaths,
}

impl BenchmarkPass {
    #[must_use]
    pub fn document_count(&self) -> usize {
        let mut documents: Vec<&str> = self
            .records
            .iter()
            .map(|r| r.raw().document_id.as_str())
            .collect();
        documents.sort_unstable();
        documents.dedup();
        documents.len()
    }
}

/// PDF files directly inside `input_dir`, sorted by path.
///
/// Two files whose stems match (`a.pdf` and `a.PDF`) would write into the same artifact
/// directory and are rejected.
pub fn discover_documents(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(BenchError::MissingDirectory(input_dir.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in fs::read_dir(input_dir).map_err(|e| BenchError::io(input_dir, e))? {
        let entry = entry.map_err(|e| BenchError::io(input_dir, e))?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            documents.push(path);
        }
    }

    if documents.is_empty() {
        return Err(BenchError::NoDocuments(input_dir.to_path_buf()));
    }
    documents.sort();

    let mut stems: HashMap<String, &PathBuf> = HashMap::new();
    for path in &documents {
        let stem = layout::document_stem(&path.file_name().unwrap_or_default().to_string_lossy());
        if let Some(first) = stems.insert(stem.clone(), path) {
            return Err(BenchError::DuplicateStem {
                stem,
                first: first.clone(),
                second: path.clone(),
            });
        }
    }
    Ok(documents)
}

/// Run every engine over every document, score the pass and write its reports.
pub fn run_benchmark(
    request: &BenchmarkRequest,
    engines: &[Engine],
    progress: &dyn Progress,
) -> Result<BenchmarkPass> {
    check_engine_ids(engines, &request.summary_dir)?;
    let documents = discover_documents(&request.input_dir)?;
    fs::create_dir_all(&request.output_root)
        .map_err(|e| BenchError::io(&request.output_root, e))?;

    let run_context = request
        .run_context
        .clone()
        .unwrap_or_else(|| layout::run_context_for(&request.input_dir));
    let available: Vec<bool> = engines.iter().map(Extractor::is_available).collect();

    progress.event(ProgressEvent::PassStarted {
        total: documents.len(),
        engines: engines.len(),
    });

    let mut raws = Vec::with_capacity(documents.len() * engines.len());
    let mut texts = HashMap::new();
    for (idx, path) in documents.iter().enumerate() {
        let document_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = layout::document_stem(&document_id);
        progress.event(ProgressEvent::DocumentStarted {
            index: idx + 1,
            total: documents.len(),
            document: &document_id,
        });

        for (engine, &is_available) in engines.iter().zip(&available) {
            let extractor = engine.id();
            if !is_available {
                progress.event(ProgressEvent::PairSkipped {
                    document: &document_id,
                    extractor,
                    reason: "engine not available",
                });
                raws.push(RawRecord::skipped(&document_id, extractor).with_run_context(&run_context));
                continue;
            }

            let export_dir = layout::export_dir(&request.output_root, extractor, &run_context);
            let record = match run_pair(engine, path, &export_dir, &stem) {
                Ok((measurements, text)) => {
                    progress.event(ProgressEvent::PairFinished {
                        document: &document_id,
                        extractor,
                        elapsed_seconds: measurements.elapsed_seconds,
                    });
                    let record = RawRecord::ok(&document_id, extractor, measurements)
                        .with_run_context(&run_context);
                    texts.insert(record.key(), text);
                    record
                }
                Err(err) => {
                    let record = RawRecord::failed(&document_id, extractor, &err)
                        .with_run_context(&run_context);
                    progress.event(ProgressEvent::PairFailed {
                        document: &document_id,
                        extractor,
                        error: &record.error_message,
                    });
                    record
                }
            };
            raws.push(record);
        }
    }

    let records = score_corpus(raws, &texts, &request.similarity, progress);

    let mut exports = Vec::with_capacity(engines.len());
    for engine in engines {
        let extractor_id = engine.id();
        let dir = layout::export_dir(&request.output_root, extractor_id, &run_context);
        let rows: Vec<ResultRecord> = records
            .iter()
            .filter(|r| r.raw().extractor_id == extractor_id)
            .cloned()
            .collect();
        let title = format!("Benchmark results: {extractor_id} ({run_context})");
        let reports = write_report(&dir, EXPORT_STEM, &title, &rows)?;
        let manifest = Manifest::new(extractor_id, &run_context, request.similarity.strategy())
            .write(&dir)?;
        progress.event(ProgressEvent::ReportWritten { path: &reports.csv });
        exports.push(EngineExport {
            extractor_id: extractor_id.to_string(),
            dir,
            reports,
            manifest,
        });
    }

    let pass_dir = request
        .output_root
        .join(&request.summary_dir)
        .join(layout::sanitize_component(&run_context));
    let title = format!("Benchmark results: {run_context}");
    let pass_reports = write_report(&pass_dir, PASS_STEM, &title, &records)?;
    progress.event(ProgressEvent::ReportWritten {
        path: &pass_reports.csv,
    });

    Ok(BenchmarkPass {
        run_context,
        records,
        exports,
        pass_reports,
    })
}

/// Extract one document with one engine and persist its artifacts.
fn run_pair(
    engine: &Engine,
    path: &Path,
    export_dir: &Path,
    stem: &str,
) -> std::result::Result<(Measurements, String), ExtractError> {
    // Leftovers of an earlier pass must not mix with this one
    let document_dir = layout::document_dir(export_dir, stem);
    if document_dir.exists() {
        fs::remove_dir_all(&document_dir).map_err(|source| ExtractError::Artifact {
            path: document_dir.clone(),
            source,
        })?;
    }

    let start = Instant::now();
    let extraction = extract_isolated(engine, path)?;
    let elapsed_seconds = start.elapsed().as_secs_f64();

    persist_artifacts(&extraction, export_dir, stem)?;

    let text_char_count = extraction.text_char_count();
    let Extraction {
        text,
        page_count,
        tables,
        images,
    } = extraction;
    let tables: Vec<Table> = tables.into_iter().map(|t| t.table).collect();

    let measurements = Measurements {
        page_count,
        elapsed_seconds,
        text_char_count,
        table_count: tables.len() as u64,
        table_structure_pct: structure_pct(&tables),
        image_count: images.len() as u64,
    };
    Ok((measurements, text))
}

fn extract_isolated(engine: &Engine, path: &Path) -> std::result::Result<Extraction, ExtractError> {
    catch_unwind(AssertUnwindSafe(|| engine.extract(path)))
        .unwrap_or_else(|payload| Err(ExtractError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "malformed PDF".to_string()
    }
}

fn persist_artifacts(
    extraction: &Extraction,
    export_dir: &Path,
    stem: &str,
) -> std::result::Result<(), ExtractError> {
    write_artifact(&layout::text_path(export_dir, stem), extraction.text.as_bytes())?;

    let mut per_page: HashMap<u32, usize> = HashMap::new();
    for table in &extraction.tables {
        let index = per_page.entry(table.page).or_insert(0);
        *index += 1;
        let mut markdown = table.table.to_markdown();
        markdown.push('\n');
        let path = layout::table_path(export_dir, stem, table.page, *index);
        write_artifact(&path, markdown.as_bytes())?;
    }

    per_page.clear();
    for image in &extraction.images {
        let index = per_page.entry(image.page).or_insert(0);
        *index += 1;
        let path = layout::image_path(export_dir, stem, image.page, *index, &image.extension);
        write_artifact(&path, &image.bytes)?;
    }
    Ok(())
}

fn write_artifact(path: &Path, bytes: &[u8]) -> std::result::Result<(), ExtractError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExtractError::Artifact {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, bytes).map_err(|source| ExtractError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}
