//! External extraction programs.
//!
//! The program receives the PDF path as an argument and writes its result to stdout,
//! either as plain text or as a JSON object:
//!
//! ```json
//! {"text": "...", "page_count": 3, "tables": [[["a", null], ["b", "c"]]]}
//! ```
//!
//! `page_count` and `tables` are optional. A table entry is either a bare grid or
//! `{"page": 2, "rows": [...]}`. When the program reports no page count it is read
//! from the PDF itself.

use super::{page_count, Extraction, Extractor, PageTable};
use crate::config::CommandEngineConfig;
use crate::error::ExtractError;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Placeholder replaced by the PDF path in command arguments.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// What the program writes to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEngine {
    name: String,
    program: String,
    args: Vec<String>,
    format: OutputFormat,
}

#[derive(Debug, Deserialize)]
struct CommandOutput {
    text: String,
    page_count: Option<u64>,
    #[serde(default)]
    tables: Vec<CommandTable>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandTable {
    Paged { page: u32, rows: Table },
    Grid(Table),
}

impl CommandEngine {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            format: OutputFormat::Text,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn from_config(config: &CommandEngineConfig) -> Self {
        Self::new(&config.name, &config.program)
            .with_args(config.args.clone().unwrap_or_default())
            .with_format(config.format.unwrap_or_default())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with the placeholder substituted, or the path appended.
    fn command_args(&self, input: &Path) -> Vec<OsString> {
        let mut substituted = false;
        let mut args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| {
                if arg == INPUT_PLACEHOLDER {
                    substituted = true;
                    input.as_os_str().to_os_string()
                } else if arg.contains(INPUT_PLACEHOLDER) {
                    substituted = true;
                    OsString::from(arg.replace(INPUT_PLACEHOLDER, &input.to_string_lossy()))
                } else {
                    OsString::from(arg)
                }
            })
            .collect();
        if !substituted {
            args.push(input.as_os_str().to_os_string());
        }
        args
    }

    fn parse_output(&self, stdout: &[u8], input: &Path) -> Result<Extraction, ExtractError> {
        match self.format {
            OutputFormat::Text => Ok(Extraction {
                text: String::from_utf8_lossy(stdout).into_owned(),
                page_count: page_count(input).unwrap_or(0),
                tables: Vec::new(),
                images: Vec::new(),
            }),
            OutputFormat::Json => {
                let output: CommandOutput = serde_json::from_slice(stdout)
                    .map_err(|e| ExtractError::InvalidOutput(e.to_string()))?;
                let page_count = match output.page_count {
                    Some(count) => count,
                    None => page_count(input).unwrap_or(0),
                };
                let tables = output
                    .tables
                    .into_iter()
                    .map(|table| match table {
                        CommandTable::Paged { page, rows } => PageTable {
                            page: page.max(1),
                            table: rows,
                        },
                        CommandTable::Grid(table) => PageTable { page: 1, table },
                    })
                    .collect();
                Ok(Extraction {
                    text: output.text,
                    page_count,
                    tables,
                    images: Vec::new(),
                })
            }
        }
    }
}

impl Extractor for CommandEngine {
    fn id(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let output = Command::new(&self.program)
            .args(self.command_args(path))
            .output()?;

        if !output.status.success() {
            return Err(ExtractError::CommandFailed {
                program: self.program.clone(),
                code: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |code| code.to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        self.parse_output(&output.stdout, path)
    }
}
