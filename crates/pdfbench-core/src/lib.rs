//! # pdfbench-core
//!
//! Metric computation and aggregation for PDF text-extraction benchmarks.
//!
//! A benchmark pass runs a set of extraction [`Engine`]s over a corpus directory and
//! produces one [`RawRecord`] per (document, engine) pair. The [`scoring`] module turns
//! raw records into [`ResultRecord`]s by computing two relative scores per document
//! group:
//!
//! - **coverage**: text length relative to the longest output for the same document
//! - **consensus**: mean [`Similarity`] against every peer output for the same document
//!
//! Reports are written by [`report`]. The [`summary`] module later re-discovers
//! exports from many passes and scores the union from scratch.
//!
//! ## Example
//!
//! ```
//! use pdfbench_core::{score_corpus, Measurements, NullProgress, RawRecord, Similarity};
//! use std::collections::HashMap;
//!
//! let a = RawRecord::ok("doc.pdf", "a", Measurements { text_char_count: 10, ..Default::default() });
//! let b = RawRecord::ok("doc.pdf", "b", Measurements { text_char_count: 5, ..Default::default() });
//! let texts: HashMap<_, _> = [(a.key(), "same words".to_string()), (b.key(), "Same  WORDS".to_string())]
//!     .into_iter()
//!     .collect();
//!
//! let scored = score_corpus(vec![a, b], &texts, &Similarity::default(), &NullProgress);
//! assert_eq!(scored[0].coverage_pct(), 100.0);
//! assert_eq!(scored[1].coverage_pct(), 50.0);
//! assert_eq!(scored[0].consensus_pct(), 100.0);
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod layout;
pub mod manifest;
pub mod normalize;
pub mod progress;
pub mod record;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod similarity;
pub mod summary;
pub mod table;

pub use config::{load_config, resolve_config, Config};
pub use error::{BenchError, ExtractError, Result};
pub use extract::{Engine, Extraction, Extractor};
pub use manifest::Manifest;
pub use normalize::normalize;
pub use progress::{progress_label, NullProgress, Progress, ProgressEvent, TracingProgress};
pub use record::{Measurements, RawRecord, RecordKey, RecordStatus, ResultRecord};
pub use report::{to_csv, to_markdown, write_report, CombinedRow, ReportPaths, ReportRow};
pub use runner::{run_benchmark, BenchmarkPass, BenchmarkRequest};
pub use scoring::{score_corpus, score_group, TextSource};
pub use similarity::{Similarity, SimilarityStrategy};
pub use summary::{summarize, SummaryOutcome, SummaryRequest};
pub use table::{structure_pct, Table};
