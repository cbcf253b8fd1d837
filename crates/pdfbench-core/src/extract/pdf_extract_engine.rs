use super::{page_count, Extraction, Extractor};
use crate::error::ExtractError;
use std::path::Path;

/// Text through the `pdf-extract` crate, page count through `lopdf`.
///
/// `pdf_extract` can panic on malformed PDFs; the runner isolates every engine call,
/// so a panic here becomes an error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdfExtractEngine;

impl Extractor for PdfExtractEngine {
    fn id(&self) -> &str {
        "pdf-extract"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let page_count = page_count(path)?;
        let text = pdf_extract::extract_text(path).map_err(|e| ExtractError::Text(e.to_string()))?;

        Ok(Extraction {
            text,
            page_count,
            tables: Vec::new(),
            images: Vec::new(),
        })
    }
}
