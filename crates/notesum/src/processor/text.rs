use crate::error::ExtractionError;
use crate::processor::NativeTextSource;

/// A plain-text document: one unit, no image form.
pub struct PlainTextDocument {
    text: String,
}

impl PlainTextDocument {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ExtractionError> {
        let text = String::from_utf8(bytes).map_err(|e| {
            ExtractionError::Unreadable(format!(
                "invalid UTF-8 at byte {}",
                e.utf8_error().valid_up_to()
            ))
        })?;
        Ok(Self { text })
    }
}

impl NativeTextSource for PlainTextDocument {
    fn unit_count(&self) -> usize {
        1
    }

    fn native_text(&self, unit: usize) -> Result<String, ExtractionError> {
        if unit == 0 {
            Ok(self.text.clone())
        } else {
            Err(ExtractionError::Unreadable(format!(
                "plain text has no unit {}",
                unit
            )))
        }
    }
}
