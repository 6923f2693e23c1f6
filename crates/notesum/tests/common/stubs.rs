//! Stand-ins for the external OCR and rasterizer tools.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use lopdf::{dictionary, Document, Object, Stream};

use notesum::processor::ocr::OcrEngine;
use notesum::processor::render::PageRenderer;
use notesum::OcrError;

/// Renders page `n` as the bytes `page-n`.
#[derive(Default)]
pub struct StubRenderer;

impl PageRenderer for StubRenderer {
    fn render(&self, _pdf_bytes: &[u8], page: u32, _dpi: u32) -> Result<Vec<u8>, OcrError> {
        Ok(format!("page-{}", page).into_bytes())
    }
}

/// Recognizes `page-n` images from a fixed table; unknown pages yield nothing.
pub struct PageOcr {
    pages: HashMap<u32, String>,
    calls: AtomicUsize,
}

impl PageOcr {
    pub fn new(pages: &[(u32, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(page, text)| (*page, text.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for PageOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = String::from_utf8_lossy(image);
        let page = key
            .strip_prefix("page-")
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| OcrError::Recognition(format!("not a stub image: {}", key)))?;
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}

/// Builds a PDF with one page per entry. `None` pages have no text layer,
/// like a scanned page.
pub fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let content = match page {
            Some(text) => format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", text),
            None => String::new(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize PDF");
    bytes
}
