//! Progress reporting handle passed explicitly into every long-running operation.
//!
//! Library code never logs on its own; it emits [`ProgressEvent`]s into whatever
//! [`Progress`] the caller hands in. [`TracingProgress`] forwards them to `tracing`,
//! [`NullProgress`] drops them.

use std::path::Path;

/// Something worth telling the user about.
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// A benchmark pass is about to process `total` documents with `engines` engines.
    PassStarted { total: usize, engines: usize },
    /// Extraction of the `index`-th document (1-based) starts.
    DocumentStarted {
        index: usize,
        total: usize,
        document: &'a str,
    },
    PairFinished {
        document: &'a str,
        extractor: &'a str,
        elapsed_seconds: f64,
    },
    PairFailed {
        document: &'a str,
        extractor: &'a str,
        error: &'a str,
    },
    PairSkipped {
        document: &'a str,
        extractor: &'a str,
        reason: &'a str,
    },
    /// An export directory was found by the summary pass.
    ExportDiscovered {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    /// Coverage and consensus for one document group were computed.
    GroupScored {
        index: usize,
        total: usize,
        document: &'a str,
        records: usize,
    },
    ReportWritten { path: &'a Path },
}

/// Sink for [`ProgressEvent`]s.
pub trait Progress {
    fn event(&self, event: ProgressEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl Progress for NullProgress {
    fn event(&self, _event: ProgressEvent<'_>) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn event(&self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::PassStarted { total, engines } => {
                tracing::info!("Starting benchmark: {total} documents x {engines} engines");
            }
            ProgressEvent::DocumentStarted {
                index,
                total,
                document,
            } => {
                tracing::info!("Processing {} | {document}", progress_label(index, total));
            }
            ProgressEvent::PairFinished {
                document,
                extractor,
                elapsed_seconds,
            } => {
                tracing::info!("Done: {document} | {extractor} | {elapsed_seconds:.3}s");
            }
            ProgressEvent::PairFailed {
                document,
                extractor,
                error,
            } => {
                tracing::warn!("Failed: {document} | {extractor} | {error}");
            }
            ProgressEvent::PairSkipped {
                document,
                extractor,
                reason,
            } => {
                tracing::warn!("Skipped: {document} | {extractor} | {reason}");
            }
            ProgressEvent::ExportDiscovered { index, total, path } => {
                tracing::info!("Reading {} | {}", progress_label(index, total), path.display());
            }
            ProgressEvent::GroupScored {
                index,
                total,
                document,
                records,
            } => {
                tracing::debug!(
                    "Scoring {} | {document} ({records} records)",
                    progress_label(index, total)
                );
            }
            ProgressEvent::ReportWritten { path } => {
                tracing::info!("Report written: {}", path.display());
            }
        }
    }
}

impl<P: Progress + ?Sized> Progress for &P {
    fn event(&self, event: ProgressEvent<'_>) {
        (**self).event(event);
    }
}

/// `"3/10 (30.0%)"`, or `"0/0 (0.0%)"` for an empty total.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn progress_label(current: usize, total: usize) -> String {
    if total == 0 {
        return "0/0 (0.0%)".to_string();
    }
    format!(
        "{current}/{total} ({:.1}%)",
        current as f64 / total as f64 * 100.0
    )
}
