//! Rasterizing PDF pages for OCR.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::OcrError;

/// Renders one page of a PDF to an image.
pub trait PageRenderer: Send + Sync {
    /// `page` is the 1-based PDF page number.
    fn render(&self, pdf_bytes: &[u8], page: u32, dpi: u32) -> Result<Vec<u8>, OcrError>;
}

/// Renders pages with poppler's `pdftoppm`.
#[derive(Debug, Clone, Default)]
pub struct PdftoppmRenderer {
    binary: Option<PathBuf>,
}

impl PdftoppmRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific `pdftoppm` binary instead of the one on `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    fn binary(&self) -> &Path {
        self.binary
            .as_deref()
            .unwrap_or_else(|| Path::new("pdftoppm"))
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render(&self, pdf_bytes: &[u8], page: u32, dpi: u32) -> Result<Vec<u8>, OcrError> {
        let _span = tracing::info_span!("processor.render", page, dpi).entered();

        let temp_dir = std::env::temp_dir();
        let token = uuid::Uuid::new_v4();
        let pdf_path = temp_dir.join(format!("notesum_render_{}.pdf", token));
        let output_prefix = temp_dir.join(format!("notesum_page_{}", token));
        let image_path = output_prefix.with_extension("png");

        let render_err = |reason: String| OcrError::Render { page, reason };

        std::fs::write(&pdf_path, pdf_bytes)
            .map_err(|e| render_err(format!("failed to write temp PDF: {}", e)))?;

        let output = Command::new(self.binary())
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile")
            .arg(&pdf_path)
            .arg(&output_prefix)
            .output();

        let _ = std::fs::remove_file(&pdf_path);

        let output = output.map_err(|e| {
            render_err(format!(
                "failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
                e
            ))
        })?;

        if !output.status.success() {
            let _ = std::fs::remove_file(&image_path);
            return Err(render_err(format!(
                "pdftoppm failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let image = std::fs::read(&image_path)
            .map_err(|e| render_err(format!("failed to read rendered image: {}", e)));
        let _ = std::fs::remove_file(&image_path);
        image
    }
}
