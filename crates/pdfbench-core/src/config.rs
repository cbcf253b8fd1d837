//! Configuration loading for pdfbench.

use crate::error::{BenchError, Result};
use crate::extract::command::OutputFormat;
use crate::layout::DEFAULT_SUMMARY_DIR;
use crate::similarity::{Similarity, SimilarityStrategy, DEFAULT_MAX_CHARS, DEFAULT_MAX_TOKENS};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pdfbench.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    pub scoring: Option<ScoringConfig>,
    pub layout: Option<LayoutConfig>,
    pub engines: Option<EnginesConfig>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    pub similarity: Option<SimilarityStrategy>,
    pub max_chars: Option<usize>,
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub summary_dir: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct EnginesConfig {
    pub command: Option<Vec<CommandEngineConfig>>,
}

/// An external extraction program.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CommandEngineConfig {
    /// Extractor id used in reports and directory names.
    pub name: String,
    pub program: String,
    /// `{input}` is replaced by the PDF path; the path is appended when absent.
    pub args: Option<Vec<String>>,
    pub format: Option<OutputFormat>,
}

impl Config {
    /// The deployment's similarity scorer. `override_strategy` wins over the file.
    pub fn similarity(&self, override_strategy: Option<SimilarityStrategy>) -> Similarity {
        let scoring = self.scoring.clone().unwrap_or_default();
        let strategy = override_strategy
            .or(scoring.similarity)
            .unwrap_or_default();
        Similarity::new(strategy).with_limits(
            scoring.max_chars.unwrap_or(DEFAULT_MAX_CHARS),
            scoring.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        )
    }

    /// Directory name (under the output root) holding pass and combined reports.
    pub fn summary_dir(&self) -> &str {
        self.layout
            .as_ref()
            .and_then(|layout| layout.summary_dir.as_deref())
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or(DEFAULT_SUMMARY_DIR)
    }

    pub fn command_engines(&self) -> &[CommandEngineConfig] {
        self.engines
            .as_ref()
            .and_then(|engines| engines.command.as_deref())
            .unwrap_or(&[])
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "pdfbench")?;
    Some(dirs.config_dir().join("config.toml"))
}

/// Load the config from an explicit path, `./pdfbench.toml`, or the per-user
/// config dir, in that order.
///
/// An explicit path must exist. The implicit locations fall back to defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(BenchError::Config {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }
        return load_config(path);
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return load_config(&local);
    }
    match default_config_path() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    toml::from_str(&contents).map_err(|e| BenchError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
