//! Document text extraction.
//!
//! A document is split into units (pages for PDF, a single unit for plain
//! text). Each unit's native text is used when present; units without usable
//! native text are rendered to an image and passed through OCR.

pub mod ocr;
pub mod pdf;
pub mod render;
pub mod text;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, OcrError};
use crate::processor::ocr::OcrEngine;
use crate::processor::pdf::PdfDocument;
use crate::processor::render::PageRenderer;
use crate::processor::text::PlainTextDocument;

/// Placeholder the PDF parser emits for glyphs in CID fonts it cannot decode.
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
        }
    }

    /// File extension used when the document is written to storage.
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "txt",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case("application/pdf") {
            Some(DocumentKind::Pdf)
        } else if essence.to_ascii_lowercase().starts_with("text/") {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }

    /// Guesses the kind from a filename's extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        mime_guess::from_path(filename)
            .first()
            .and_then(|m| Self::from_mime(m.essence_str()))
    }

    /// Guesses the kind from the leading bytes of a document.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PDF_MAGIC) {
            Some(DocumentKind::Pdf)
        } else if std::str::from_utf8(bytes).is_ok() {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }

    /// Resolves a document's kind: explicit declaration first, then the
    /// filename, then the content itself.
    pub fn resolve(declared: Option<Self>, filename: Option<&str>, bytes: &[u8]) -> Option<Self> {
        declared
            .or_else(|| filename.and_then(Self::from_filename))
            .or_else(|| Self::sniff(bytes))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "text" | "txt" => Ok(DocumentKind::Text),
            other => Err(format!("unsupported document kind '{}'", other)),
        }
    }
}

/// Raw bytes of one uploaded document, handed to the extractor by value.
#[derive(Debug, Clone)]
pub struct Document {
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(kind: DocumentKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }
}

/// Text recovered from a document, one fragment per unit in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub fragments: Vec<String>,
    /// Units whose fragment went through the OCR path.
    pub ocr_units: usize,
}

impl ExtractedText {
    /// All fragments joined in order, with no separator.
    pub fn concatenated(&self) -> String {
        self.fragments.concat()
    }

    pub fn is_blank(&self) -> bool {
        self.fragments.iter().all(|f| f.trim().is_empty())
    }
}

/// A document that can report native text per unit.
pub trait NativeTextSource {
    fn unit_count(&self) -> usize;

    fn native_text(&self, unit: usize) -> Result<String, ExtractionError>;
}

/// A document whose units can also be rendered to images for OCR.
pub trait ImageRenderableSource: NativeTextSource {
    fn render_unit(&self, unit: usize, dpi: u32) -> Result<Vec<u8>, OcrError>;
}

/// Turns documents into text, falling back to OCR per unit.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
    renderer: Arc<dyn PageRenderer>,
    dpi: u32,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, renderer: Arc<dyn PageRenderer>, dpi: u32) -> Self {
        Self { ocr, renderer, dpi }
    }

    pub fn extract(&self, document: Document) -> Result<ExtractedText, ExtractionError> {
        match document.kind {
            DocumentKind::Text => {
                let _span = tracing::info_span!("processor.text").entered();
                let source = PlainTextDocument::from_bytes(document.bytes)?;
                self.extract_native(&source)
            }
            DocumentKind::Pdf => {
                let _span = tracing::info_span!("processor.pdf").entered();
                let source = PdfDocument::load(document.bytes, Arc::clone(&self.renderer))?;
                self.extract_with_fallback(&source)
            }
        }
    }

    /// Native text only. Used for sources that have no image form.
    pub fn extract_native<S>(&self, source: &S) -> Result<ExtractedText, ExtractionError>
    where
        S: NativeTextSource + ?Sized,
    {
        let mut fragments = Vec::with_capacity(source.unit_count());
        for unit in 0..source.unit_count() {
            fragments.push(source.native_text(unit)?);
        }

        let extracted = ExtractedText {
            fragments,
            ocr_units: 0,
        };
        if extracted.is_blank() {
            return Err(ExtractionError::NoTextRecovered);
        }
        Ok(extracted)
    }

    /// Native text per unit, OCR for the units that have none.
    pub fn extract_with_fallback<S>(&self, source: &S) -> Result<ExtractedText, ExtractionError>
    where
        S: ImageRenderableSource + ?Sized,
    {
        let unit_count = source.unit_count();
        let mut extracted = ExtractedText {
            fragments: Vec::with_capacity(unit_count),
            ocr_units: 0,
        };
        let mut recovered = 0usize;

        for unit in 0..unit_count {
            let native = source.native_text(unit).unwrap_or_else(|e| {
                log::debug!("Native text unavailable for unit {}: {}", unit, e);
                String::new()
            });

            if has_usable_text(&native) {
                extracted.fragments.push(native);
                recovered += 1;
                continue;
            }

            extracted.ocr_units += 1;
            match self.ocr_unit(source, unit) {
                Ok(text) if !text.trim().is_empty() => {
                    extracted.fragments.push(text);
                    recovered += 1;
                }
                Ok(_) => extracted.fragments.push(String::new()),
                Err(e) => {
                    log::warn!("OCR produced no text for unit {}: {}", unit, e);
                    extracted.fragments.push(String::new());
                }
            }
        }

        if recovered == 0 {
            return Err(ExtractionError::NoTextRecovered);
        }
        Ok(extracted)
    }

    fn ocr_unit<S>(&self, source: &S, unit: usize) -> Result<String, OcrError>
    where
        S: ImageRenderableSource + ?Sized,
    {
        if !self.ocr.is_available() {
            return Err(OcrError::Disabled);
        }
        let _span = tracing::info_span!("processor.ocr_fallback", unit).entered();
        let image = source.render_unit(unit, self.dpi)?;
        self.ocr.recognize(&image)
    }
}

/// Whether native text carries anything beyond whitespace and parser
/// placeholders.
fn has_usable_text(text: &str) -> bool {
    !text.replace(IDENTITY_H_PATTERN, "").trim().is_empty()
}
