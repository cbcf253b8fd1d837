//! Result records: one row per (document, extractor) attempt.
//!
//! A [`RawRecord`] holds what the extraction run measured. The derived coverage and
//! consensus scores only exist on a [`ResultRecord`], which can only be produced by
//! [`crate::scoring`]. Going back with [`ResultRecord::into_raw`] drops the derived
//! fields, so re-scoring always starts from measurements alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a stored error message, in characters.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 500;

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Ok,
    Error,
    Skipped,
}

impl RecordStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" => Ok(Self::Ok),
            "error" => Ok(Self::Error),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Identity of a record inside a document group.
///
/// Two records are peers of each other when their keys differ. Within one run that
/// means a different extractor; across runs the same extractor under another run
/// context is a peer too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub document_id: String,
    pub extractor_id: String,
    pub run_context: Option<String>,
}

/// Raw measurements of a successful extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurements {
    pub page_count: u64,
    pub elapsed_seconds: f64,
    pub text_char_count: u64,
    pub table_count: u64,
    pub table_structure_pct: f64,
    pub image_count: u64,
}

/// A record as produced by the extraction run, without derived scores.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub document_id: String,
    pub extractor_id: String,
    pub run_context: Option<String>,
    pub page_count: u64,
    pub elapsed_seconds: f64,
    pub text_char_count: u64,
    pub table_count: u64,
    pub table_structure_pct: f64,
    pub image_count: u64,
    pub status: RecordStatus,
    pub error_message: String,
}

impl RawRecord {
    /// Successful extraction.
    ///
    /// Negative or non-finite timings become 0 and the structure share is forced to 0
    /// when there are no tables.
    #[must_use]
    pub fn ok(
        document_id: impl Into<String>,
        extractor_id: impl Into<String>,
        measurements: Measurements,
    ) -> Self {
        let table_structure_pct = if measurements.table_count == 0 {
            0.0
        } else {
            sanitize_pct(measurements.table_structure_pct)
        };
        Self {
            document_id: document_id.into(),
            extractor_id: extractor_id.into(),
            run_context: None,
            page_count: measurements.page_count,
            elapsed_seconds: sanitize_non_negative(measurements.elapsed_seconds),
            text_char_count: measurements.text_char_count,
            table_count: measurements.table_count,
            table_structure_pct,
            image_count: measurements.image_count,
            status: RecordStatus::Ok,
            error_message: String::new(),
        }
    }

    /// Failed extraction. All measurements are zero; the message is sanitized.
    #[must_use]
    pub fn failed(
        document_id: impl Into<String>,
        extractor_id: impl Into<String>,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            error_message: sanitize_error_message(&error.to_string()),
            status: RecordStatus::Error,
            ..Self::empty(document_id.into(), extractor_id.into())
        }
    }

    /// Extractor was not attempted (for example, not installed).
    #[must_use]
    pub fn skipped(document_id: impl Into<String>, extractor_id: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Skipped,
            ..Self::empty(document_id.into(), extractor_id.into())
        }
    }

    fn empty(document_id: String, extractor_id: String) -> Self {
        Self {
            document_id,
            extractor_id,
            run_context: None,
            page_count: 0,
            elapsed_seconds: 0.0,
            text_char_count: 0,
            table_count: 0,
            table_structure_pct: 0.0,
            image_count: 0,
            status: RecordStatus::Ok,
            error_message: String::new(),
        }
    }

    /// Tag the record with the run that produced it.
    #[must_use]
    pub fn with_run_context(mut self, run_context: impl Into<String>) -> Self {
        self.run_context = Some(run_context.into());
        self
    }

    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            document_id: self.document_id.clone(),
            extractor_id: self.extractor_id.clone(),
            run_context: self.run_context.clone(),
        }
    }

    /// Re-establish the record invariants after loading from an untrusted source.
    #[must_use]
    pub(crate) fn sanitized(mut self) -> Self {
        self.elapsed_seconds = sanitize_non_negative(self.elapsed_seconds);
        self.table_structure_pct = if self.table_count == 0 {
            0.0
        } else {
            sanitize_pct(self.table_structure_pct)
        };
        self.error_message = if self.status == RecordStatus::Error {
            sanitize_error_message(&self.error_message)
        } else {
            String::new()
        };
        self
    }

    /// Attach derived scores. Only the scoring module calls this.
    pub(crate) fn finalize(self, coverage_pct: f64, consensus_pct: f64) -> ResultRecord {
        let consensus_pct = if self.status.is_ok() {
            consensus_pct
        } else {
            0.0
        };
        ResultRecord {
            raw: self,
            coverage_pct,
            consensus_pct,
        }
    }
}

/// A fully scored record, ready for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    raw: RawRecord,
    coverage_pct: f64,
    consensus_pct: f64,
}

impl ResultRecord {
    #[inline]
    #[must_use]
    pub const fn raw(&self) -> &RawRecord {
        &self.raw
    }

    /// Text length relative to the longest output for the same document, 0 to 100.
    #[inline]
    #[must_use]
    pub const fn coverage_pct(&self) -> f64 {
        self.coverage_pct
    }

    /// Mean agreement with every peer output for the same document, 0 to 100.
    #[inline]
    #[must_use]
    pub const fn consensus_pct(&self) -> f64 {
        self.consensus_pct
    }

    /// Drop the derived scores.
    #[must_use]
    pub fn into_raw(self) -> RawRecord {
        self.raw
    }
}

/// Collapse line breaks to spaces and cap the length at [`ERROR_MESSAGE_MAX_CHARS`].
#[must_use]
pub fn sanitize_error_message(message: &str) -> String {
    message
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .chars()
        .take(ERROR_MESSAGE_MAX_CHARS)
        .collect()
}

fn sanitize_non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn sanitize_pct(value: f64) -> f64 {
    sanitize_non_negative(value).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_record_zeroes_structure_without_tables() {
        let record = RawRecord::ok(
            "a.pdf",
            "lopdf",
            Measurements {
                table_count: 0,
                table_structure_pct: 75.0,
                ..Measurements::default()
            },
        );
        assert_eq!(record.table_structure_pct, 0.0);
        assert_eq!(record.status, RecordStatus::Ok);
        assert!(record.error_message.is_empty());
    }

    #[test]
    fn test_ok_record_clamps_bad_numbers() {
        let record = RawRecord::ok(
            "a.pdf",
            "lopdf",
            Measurements {
                elapsed_seconds: f64::NAN,
                table_count: 2,
                table_structure_pct: 250.0,
                ..Measurements::default()
            },
        );
        assert_eq!(record.elapsed_seconds, 0.0);
        assert_eq!(record.table_structure_pct, 100.0);
    }

    #[test]
    fn test_failed_record_message_is_single_line_and_bounded() {
        let long = format!("line one\nline two\r\n{}", "x".repeat(1000));
        let record = RawRecord::failed("a.pdf", "pdf-extract", long);
        assert_eq!(record.status, RecordStatus::Error);
        assert_eq!(record.error_message.chars().count(), ERROR_MESSAGE_MAX_CHARS);
        assert!(!record.error_message.contains('\n'));
        assert!(!record.error_message.contains('\r'));
        assert!(record.error_message.starts_with("line one line two "));
        assert_eq!(record.text_char_count, 0);
    }

    #[test]
    fn test_error_message_truncation_counts_chars_not_bytes() {
        let message = "한".repeat(600);
        let sanitized = sanitize_error_message(&message);
        assert_eq!(sanitized.chars().count(), ERROR_MESSAGE_MAX_CHARS);
    }

    #[test]
    fn test_skipped_record_has_no_message() {
        let record = RawRecord::skipped("a.pdf", "pdftotext").with_run_context("dataset");
        assert_eq!(record.status, RecordStatus::Skipped);
        assert!(record.error_message.is_empty());
        assert_eq!(record.run_context.as_deref(), Some("dataset"));
    }

    #[test]
    fn test_finalize_zeroes_consensus_for_non_ok() {
        let record = RawRecord::failed("a.pdf", "lopdf", "boom").finalize(12.0, 80.0);
        assert_eq!(record.coverage_pct(), 12.0);
        assert_eq!(record.consensus_pct(), 0.0);
    }

    #[test]
    fn test_sanitized_clears_message_on_non_error_rows() {
        let mut record = RawRecord::skipped("a.pdf", "x");
        record.error_message = "module_not_installed".to_string();
        assert!(record.sanitized().error_message.is_empty());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(" OK ".parse::<RecordStatus>(), Ok(RecordStatus::Ok));
        assert_eq!("skipped".parse::<RecordStatus>(), Ok(RecordStatus::Skipped));
        assert!("done".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_key_includes_run_context() {
        let a = RawRecord::skipped("a.pdf", "x").with_run_context("r1");
        let b = RawRecord::skipped("a.pdf", "x").with_run_context("r2");
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
    }
}
