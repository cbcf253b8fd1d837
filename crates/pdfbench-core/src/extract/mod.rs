//! Extraction engines.
//!
//! [`Engine`] is the closed set of engines a benchmark pass can run. Each variant
//! implements [`Extractor`]; the runner only ever talks to the enum.

pub mod command;
mod lopdf_engine;
mod pdf_extract_engine;

pub use command::{CommandEngine, OutputFormat};
pub use lopdf_engine::LopdfEngine;
pub use pdf_extract_engine::PdfExtractEngine;

use crate::config::Config;
use crate::error::{BenchError, ExtractError, Result};
use crate::layout;
use crate::table::Table;
use std::collections::HashSet;
use std::path::Path;

/// A table together with the page it was found on (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    pub page: u32,
    pub table: Table,
}

/// Raw bytes of an embedded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub page: u32,
    /// File extension for the stored bytes, without the dot.
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Everything one engine produced for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub page_count: u64,
    pub tables: Vec<PageTable>,
    pub images: Vec<ImageBlob>,
}

impl Extraction {
    /// Length of the raw text in characters.
    #[must_use]
    pub fn text_char_count(&self) -> u64 {
        self.text.chars().count() as u64
    }
}

/// A PDF text-extraction engine.
pub trait Extractor {
    /// Id used in records and export paths.
    fn id(&self) -> &str;

    /// Whether the engine can run on this machine.
    fn is_available(&self) -> bool;

    fn extract(&self, path: &Path) -> std::result::Result<Extraction, ExtractError>;
}

/// The engines a pass can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Engine {
    PdfExtract(PdfExtractEngine),
    Lopdf(LopdfEngine),
    Command(CommandEngine),
}

impl Engine {
    /// Engines compiled into the binary.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::PdfExtract(PdfExtractEngine),
            Self::Lopdf(LopdfEngine),
        ]
    }

    /// Built-in engines followed by the command engines from `config`.
    ///
    /// Fails when a command engine's name clashes with another engine or with the
    /// summary directory (see [`check_engine_ids`]).
    pub fn all(config: &Config) -> Result<Vec<Self>> {
        let mut engines = Self::builtin();
        engines.extend(
            config
                .command_engines()
                .iter()
                .map(|command| Self::Command(CommandEngine::from_config(command))),
        );
        check_engine_ids(&engines, config.summary_dir())?;
        Ok(engines)
    }

    /// Engines named in `names`, in that order and without repeats. An empty list
    /// selects all engines.
    pub fn select(config: &Config, names: &[String]) -> Result<Vec<Self>> {
        let available = Self::all(config)?;
        if names.is_empty() {
            return Ok(available);
        }
        let mut seen = HashSet::new();
        names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .map(|name| {
                available
                    .iter()
                    .find(|engine| engine.id() == name.as_str())
                    .cloned()
                    .ok_or_else(|| BenchError::UnknownEngine(name.clone()))
            })
            .collect()
    }
}

impl Extractor for Engine {
    fn id(&self) -> &str {
        match self {
            Self::PdfExtract(engine) => engine.id(),
            Self::Lopdf(engine) => engine.id(),
            Self::Command(engine) => engine.id(),
        }
    }

    fn is_available(&self) -> bool {
        match self {
            Self::PdfExtract(engine) => engine.is_available(),
            Self::Lopdf(engine) => engine.is_available(),
            Self::Command(engine) => engine.is_available(),
        }
    }

    fn extract(&self, path: &Path) -> std::result::Result<Extraction, ExtractError> {
        match self {
            Self::PdfExtract(engine) => engine.extract(path),
            Self::Lopdf(engine) => engine.extract(path),
            Self::Command(engine) => engine.extract(path),
        }
    }
}

/// Every engine gets its own export directory `<output_root>/<id>`, so ids must be
/// unique, usable verbatim as a directory name, and distinct from `summary_dir`,
/// which export discovery never enters.
pub fn check_engine_ids(engines: &[Engine], summary_dir: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for engine in engines {
        let id = engine.id();
        let reason = if id.is_empty() || layout::sanitize_component(id) != id {
            Some("not usable as a directory name")
        } else if id == summary_dir {
            Some("reserved for the summary directory")
        } else if !seen.insert(id) {
            Some("defined more than once")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(BenchError::InvalidEngine {
                name: id.to_string(),
                reason,
            });
        }
    }
    Ok(())
}

/// Page count from the PDF page tree.
pub(crate) fn page_count(path: &Path) -> std::result::Result<u64, ExtractError> {
    let doc = lopdf::Document::load(path).map_err(|e| ExtractError::Open(e.to_string()))?;
    Ok(doc.get_pages().len() as u64)
}
