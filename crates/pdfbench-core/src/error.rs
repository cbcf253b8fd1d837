//! Error types for benchmark passes.
//!
//! Only setup failures surface as [`BenchError`]. Anything that goes wrong while a
//! single engine processes a single document is an [`ExtractError`], which the runner
//! folds into a `status=error` record instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a whole benchmark or summary pass.
///
/// These are raised before any record is produced (missing input, empty corpus) or
/// while persisting reports. Per-document extraction problems never end up here.
#[derive(Error, Debug)]
pub enum BenchError {
    /// The input directory contained no PDF files.
    #[error("No PDF files found in: {}", .0.display())]
    NoDocuments(PathBuf),

    /// A directory the pass depends on does not exist.
    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The summary pass found nothing to merge.
    #[error("No benchmark exports found under: {}", .0.display())]
    NoExports(PathBuf),

    /// An engine name on the command line or in the config is not known.
    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    /// Two engines would share an export directory, or one would hide its export.
    #[error("Invalid engine '{name}': {reason}")]
    InvalidEngine { name: String, reason: &'static str },

    /// Two documents of the corpus would share an artifact directory.
    #[error("Documents {} and {} share the artifact name '{stem}'", first.display(), second.display())]
    DuplicateStem {
        stem: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Filesystem error tied to a concrete path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV read or write failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (manifest) serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl BenchError {
    /// Wrap an [`std::io::Error`] with the path it happened at.
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Failure of one engine on one document.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open PDF: {0}")]
    Open(String),

    #[error("text extraction failed: {0}")]
    Text(String),

    #[error("engine panicked: {0}")]
    Panicked(String),

    #[error("command `{program}` exited with {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: String,
        stderr: String,
    },

    #[error("invalid engine output: {0}")]
    InvalidOutput(String),

    #[error("failed to write artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
