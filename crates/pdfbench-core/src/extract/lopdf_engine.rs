use super::{Extraction, Extractor, ImageBlob};
use crate::error::ExtractError;
use std::path::Path;

/// Page-by-page text and embedded images through `lopdf`.
///
/// A page whose content stream cannot be decoded contributes no text and no images;
/// only a document that fails to load is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LopdfEngine;

impl Extractor for LopdfEngine {
    fn id(&self) -> &str {
        "lopdf"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let doc = lopdf::Document::load(path).map_err(|e| ExtractError::Open(e.to_string()))?;
        let pages = doc.get_pages();

        let mut page_texts = Vec::with_capacity(pages.len());
        let mut images = Vec::new();
        for (&page_number, &page_id) in &pages {
            page_texts.push(doc.extract_text(&[page_number]).unwrap_or_default());

            if let Ok(page_images) = doc.get_page_images(page_id) {
                images.extend(page_images.into_iter().map(|image| ImageBlob {
                    page: page_number,
                    extension: image_extension(image.filters.as_deref()).to_string(),
                    bytes: image.content.to_vec(),
                }));
            }
        }

        Ok(Extraction {
            text: page_texts.join("\n"),
            page_count: pages.len() as u64,
            tables: Vec::new(),
            images,
        })
    }
}

/// File extension for an image stream, from the last filter applied to it.
///
/// Only the encodings that are complete image files on their own get a real
/// extension; anything else is stored as raw `bin` data.
fn image_extension(filters: Option<&[String]>) -> &'static str {
    match filters.and_then(<[String]>::last).map(String::as_str) {
        Some("DCTDecode") => "jpg",
        Some("JPXDecode") => "jp2",
        Some("JBIG2Decode") => "jb2",
        _ => "bin",
    }
}
