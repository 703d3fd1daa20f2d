use log::{debug, info, warn};
use pdfium_render::prelude::*;
use std::path::Path;
use tesseract::{OcrEngineMode, PageSegMode, Tesseract};

use crate::models::{DocumentKind, ExtractedContent};
use crate::processing::document::TempArena;
use crate::processing::text_cleanup::TextCleaner;
use crate::utils::CredentialError;

/// A PDF text layer at least this long (trimmed) is used as-is.
pub const MIN_TEXT_LAYER_CHARS: usize = 100;
/// Below this many usable characters a document cannot be compared.
pub const MIN_CONTENT_CHARS: usize = 20;
/// Smallest scale page 1 is rasterized at before OCR.
pub const MIN_RASTER_SCALE: f32 = 2.0;

/// Converts a document on disk into text. Implementations block, so async
/// callers should run them on a blocking thread.
pub trait TextExtraction: Send + Sync {
    fn extract(&self, path: &Path, kind: DocumentKind) -> Result<ExtractedContent, CredentialError>;
}

/// PDF text layer first, then page-1 rasterization and tesseract OCR.
pub struct TesseractExtractor {
    arena: TempArena,
    language: String,
    tessdata: Option<String>,
    raster_scale: f32,
}

impl TesseractExtractor {
    pub fn new(arena: TempArena, language: &str, tessdata: Option<String>, raster_scale: f32) -> Self {
        TesseractExtractor {
            arena,
            language: language.to_string(),
            tessdata,
            raster_scale: raster_scale.max(MIN_RASTER_SCALE),
        }
    }

    pub fn raster_scale(&self) -> f32 {
        self.raster_scale
    }

    fn bind_pdfium() -> Result<Pdfium, CredentialError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| CredentialError::Extraction(format!("Failed to bind pdfium library: {}", e)))?;
        Ok(Pdfium::new(bindings))
    }

    fn extract_pdf(&self, path: &Path) -> Result<ExtractedContent, CredentialError> {
        let pdfium = Self::bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| CredentialError::Extraction(format!("Failed to open PDF: {}", e)))?;

        // Step 1: embedded text layer across all pages
        let mut layer = String::new();
        for page in document.pages().iter() {
            match page.text() {
                Ok(text) => {
                    layer.push_str(&text.all());
                    layer.push('\n');
                }
                Err(e) => debug!("No text layer on page: {}", e),
            }
        }

        let trimmed = layer.trim();
        if trimmed.chars().count() >= MIN_TEXT_LAYER_CHARS {
            info!("Using PDF text layer ({} chars)", trimmed.chars().count());
            return Ok(ExtractedContent {
                raw_text: layer.clone(),
                cleaned_text: trimmed.to_string(),
                source_length: layer.chars().count(),
            });
        }

        // Step 2: scanned PDF, rasterize the first page
        info!(
            "PDF text layer too short ({} chars), rasterizing page 1 at {}x",
            trimmed.chars().count(),
            self.raster_scale
        );

        let page = document
            .pages()
            .first()
            .map_err(|e| CredentialError::Extraction(format!("PDF has no pages: {}", e)))?;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .scale_page_by_factor(self.raster_scale)
                    .render_form_data(true)
                    .render_annotations(true),
            )
            .map_err(|e| CredentialError::Extraction(format!("Failed to render PDF page: {}", e)))?;

        // The guard removes the bitmap whether or not OCR succeeds
        let raster = self.arena.create("raster", ".png")?.into_temp_path();
        bitmap
            .as_image()
            .save(&*raster)
            .map_err(|e| CredentialError::Extraction(format!("Failed to write rasterized page: {}", e)))?;

        // Step 3: OCR the bitmap
        self.ocr_image(&raster)
    }

    fn ocr_image(&self, path: &Path) -> Result<ExtractedContent, CredentialError> {
        let image_path_str = path
            .to_str()
            .ok_or_else(|| CredentialError::Extraction("Failed to convert path to string".to_string()))?;

        let mut tesseract =
            Tesseract::new_with_oem(self.tessdata.as_deref(), Some(self.language.as_str()), OcrEngineMode::LstmOnly)
                .map_err(|e| CredentialError::Extraction(format!("Tesseract init error: {}", e)))?;
        tesseract.set_page_seg_mode(PageSegMode::PsmAutoOsd);

        let raw_text = tesseract
            .set_variable("preserve_interword_spaces", "1")
            .map_err(|e| CredentialError::Extraction(format!("Tesseract set variable error: {}", e)))?
            .set_image(image_path_str)
            .map_err(|e| CredentialError::Extraction(format!("Tesseract set image error: {}", e)))?
            .get_text()
            .map_err(|e| CredentialError::Extraction(format!("Tesseract error: {}", e)))?;

        let cleaned_text = TextCleaner::clean(&raw_text);
        debug!(
            "OCR produced {} chars, {} after cleanup",
            raw_text.chars().count(),
            cleaned_text.chars().count()
        );

        if cleaned_text.is_empty() {
            warn!("OCR found no text in {:?}", path);
        }

        Ok(ExtractedContent {
            source_length: raw_text.chars().count(),
            raw_text,
            cleaned_text,
        })
    }
}

impl TextExtraction for TesseractExtractor {
    fn extract(&self, path: &Path, kind: DocumentKind) -> Result<ExtractedContent, CredentialError> {
        match kind {
            DocumentKind::Pdf => self.extract_pdf(path),
            DocumentKind::Image => self.ocr_image(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_scale_is_clamped() {
        let extractor = TesseractExtractor::new(TempArena::system(), "eng", None, 1.0);
        assert_eq!(extractor.raster_scale(), MIN_RASTER_SCALE);

        let extractor = TesseractExtractor::new(TempArena::system(), "eng", None, 3.0);
        assert_eq!(extractor.raster_scale(), 3.0);
    }
}
