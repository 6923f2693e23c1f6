//! OCR engines.

use std::sync::Arc;

use crate::config::schema::OcrConfig;
use crate::error::OcrError;

/// Recognizes text in a rendered page image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;

    /// When `false`, callers skip rendering entirely.
    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in used when OCR is switched off or not compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

impl OcrEngine for DisabledOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::Disabled)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Tesseract language string, e.g. `eng+deu`.
pub fn ocr_languages(languages: &[String]) -> String {
    if languages.is_empty() {
        "eng".to_string()
    } else {
        languages.join("+")
    }
}

/// Builds the OCR engine selected by configuration.
pub fn build_ocr(config: &OcrConfig) -> Arc<dyn OcrEngine> {
    if !config.enabled {
        log::info!("OCR disabled by configuration");
        return Arc::new(DisabledOcr);
    }

    #[cfg(feature = "tesseract")]
    {
        Arc::new(tesseract::TesseractOcr::new(&config.languages))
    }

    #[cfg(not(feature = "tesseract"))]
    {
        log::warn!("OCR enabled but this build has no Tesseract support; scanned pages will yield no text");
        Arc::new(DisabledOcr)
    }
}

#[cfg(feature = "tesseract")]
pub mod tesseract {
    use std::io::Cursor;

    use super::{ocr_languages, OcrEngine};
    use crate::error::OcrError;

    #[derive(Debug, Clone)]
    pub struct TesseractOcr {
        languages: String,
    }

    impl TesseractOcr {
        pub fn new(languages: &[String]) -> Self {
            Self {
                languages: ocr_languages(languages),
            }
        }
    }

    impl OcrEngine for TesseractOcr {
        fn recognize(&self, image_data: &[u8]) -> Result<String, OcrError> {
            let _span = tracing::info_span!("processor.ocr").entered();

            let img = image::load_from_memory(image_data)
                .map_err(|e| OcrError::Recognition(format!("failed to load image: {}", e)))?;

            // leptess reads PNG from memory.
            let mut png_data = Vec::new();
            img.write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
                .map_err(|e| OcrError::Recognition(format!("failed to convert image: {}", e)))?;

            let mut lt = leptess::LepTess::new(None, &self.languages).map_err(|e| {
                OcrError::Recognition(format!("failed to initialize Tesseract: {}", e))
            })?;
            lt.set_image_from_mem(&png_data)
                .map_err(|e| OcrError::Recognition(format!("failed to set image: {}", e)))?;

            lt.get_utf8_text()
                .map_err(|e| OcrError::Recognition(e.to_string()))
        }
    }

}
