use std::sync::Arc;

use crate::error::{ExtractionError, OcrError};
use crate::processor::render::PageRenderer;
use crate::processor::{ImageRenderableSource, NativeTextSource};

/// A parsed PDF. Each page is one unit.
pub struct PdfDocument {
    bytes: Vec<u8>,
    doc: lopdf::Document,
    pages: Vec<u32>,
    renderer: Arc<dyn PageRenderer>,
}

impl PdfDocument {
    pub fn load(bytes: Vec<u8>, renderer: Arc<dyn PageRenderer>) -> Result<Self, ExtractionError> {
        let doc = lopdf::Document::load_mem(&bytes)
            .map_err(|e| ExtractionError::Unreadable(format!("failed to load PDF: {}", e)))?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();

        log::debug!("Loaded PDF with {} page(s)", pages.len());

        Ok(Self {
            bytes,
            doc,
            pages,
            renderer,
        })
    }

    fn page_number(&self, unit: usize) -> Option<u32> {
        self.pages.get(unit).copied()
    }
}

impl NativeTextSource for PdfDocument {
    fn unit_count(&self) -> usize {
        self.pages.len()
    }

    fn native_text(&self, unit: usize) -> Result<String, ExtractionError> {
        let page = self
            .page_number(unit)
            .ok_or_else(|| ExtractionError::Unreadable(format!("no page for unit {}", unit)))?;
        self.doc
            .extract_text(&[page])
            .map_err(|e| ExtractionError::Unreadable(format!("page {}: {}", page, e)))
    }
}

impl ImageRenderableSource for PdfDocument {
    fn render_unit(&self, unit: usize, dpi: u32) -> Result<Vec<u8>, OcrError> {
        let page = self.page_number(unit).ok_or_else(|| OcrError::Render {
            page: 0,
            reason: format!("no page for unit {}", unit),
        })?;
        self.renderer.render(&self.bytes, page, dpi)
    }
}
