//! Self-declared identity of an export directory.

use crate::error::Result;
use crate::layout::MANIFEST_FILE;
use crate::report::write_atomic;
use crate::similarity::SimilarityStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version string stamped into manifests.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub extractor_id: String,
    pub run_context: String,
    /// Strategy the export's own scores were computed with.
    #[serde(default)]
    pub similarity: SimilarityStrategy,
    #[serde(default)]
    pub tool_version: String,
}

impl Manifest {
    pub fn new(
        extractor_id: impl Into<String>,
        run_context: impl Into<String>,
        similarity: SimilarityStrategy,
    ) -> Self {
        Self {
            extractor_id: extractor_id.into(),
            run_context: run_context.into(),
            similarity,
            tool_version: TOOL_VERSION.to_string(),
        }
    }

    /// Write `manifest.json` into `export_dir`.
    pub fn write(&self, export_dir: &Path) -> Result<PathBuf> {
        let path = export_dir.join(MANIFEST_FILE);
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        write_atomic(&path, json.as_bytes())?;
        Ok(path)
    }

    /// Read the manifest of `export_dir`.
    ///
    /// A missing, unreadable or malformed manifest, or one with a blank identity,
    /// reads as `None`.
    #[must_use]
    pub fn read(export_dir: &Path) -> Option<Self> {
        let contents = std::fs::read(export_dir.join(MANIFEST_FILE)).ok()?;
        let manifest: Self = serde_json::from_slice(&contents).ok()?;
        if manifest.extractor_id.trim().is_empty() || manifest.run_context.trim().is_empty() {
            return None;
        }
        Some(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::new("lopdf", "papers", SimilarityStrategy::EditRatio);
        let path = manifest.write(dir.path()).unwrap();
        assert!(path.ends_with(MANIFEST_FILE));
        assert_eq!(Manifest::read(dir.path()), Some(manifest));
    }

    #[test]
    fn test_missing_or_broken_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Manifest::read(dir.path()), None);

        std::fs::write(dir.path().join(MANIFEST_FILE), "{ not json").unwrap();
        assert_eq!(Manifest::read(dir.path()), None);

        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"extractor_id": " ", "run_context": "x"}"#,
        )
        .unwrap();
        assert_eq!(Manifest::read(dir.path()), None);
    }

    #[test]
    fn test_optional_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"extractor_id": "pymupdf", "run_context": "scans"}"#,
        )
        .unwrap();
        let manifest = Manifest::read(dir.path()).unwrap();
        assert_eq!(manifest.similarity, SimilarityStrategy::TokenJaccard);
        assert!(manifest.tool_version.is_empty());
    }
}
