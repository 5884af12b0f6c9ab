// Input extraction: slide decks, PDFs and images to plain text
pub mod image;
pub mod pdf;
pub mod pptx;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ocr::{OcrEngine, OcrError};

pub use self::image::extract_image_text;
pub use pdf::extract_pdf_text;
pub use pptx::extract_pptx_text;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported file `{file}` for {mode} input (expected {expected})")]
    UnsupportedFile {
        file: String,
        mode: InputMode,
        expected: String,
    },

    #[error("cannot parse PPTX: {0}")]
    Pptx(String),

    #[error("cannot parse PDF: {0}")]
    Pdf(String),

    #[error("PDF is encrypted")]
    EncryptedPdf,

    #[error("cannot read image: {0}")]
    Image(String),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("text input is not valid UTF-8")]
    InvalidUtf8,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What kind of content a request carries. One mode per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Text,
    Pptx,
    Pdf,
    Image,
}

impl InputMode {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            InputMode::Text => &[],
            InputMode::Pptx => &["pptx"],
            InputMode::Pdf => &["pdf"],
            InputMode::Image => &["png", "jpg", "jpeg"],
        }
    }

    /// Guess the mode from a file extension; anything unrecognized is text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        [InputMode::Pptx, InputMode::Pdf, InputMode::Image]
            .into_iter()
            .find(|mode| mode.extensions().contains(&ext.as_str()))
            .unwrap_or(InputMode::Text)
    }

    /// Reject files whose extension this mode does not accept. Text accepts
    /// anything.
    pub fn check_file(self, path: &Path) -> Result<(), ExtractionError> {
        if self == InputMode::Text {
            return Ok(());
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if self.extensions().contains(&ext.as_str()) {
            Ok(())
        } else {
            Err(ExtractionError::UnsupportedFile {
                file: path.display().to_string(),
                mode: self,
                expected: self.extensions().join(", "),
            })
        }
    }
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InputMode::Text => "text",
            InputMode::Pptx => "PPTX",
            InputMode::Pdf => "PDF",
            InputMode::Image => "image",
        };
        f.write_str(name)
    }
}

/// Turn raw bytes of the given mode into one text string. The OCR engine is
/// only requested for image input.
pub fn extract<'a, F>(mode: InputMode, bytes: &[u8], ocr: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<&'a dyn OcrEngine, ExtractionError>,
{
    let text = match mode {
        InputMode::Text => {
            String::from_utf8(bytes.to_vec()).map_err(|_| ExtractionError::InvalidUtf8)?
        }
        InputMode::Pptx => extract_pptx_text(bytes)?,
        InputMode::Pdf => extract_pdf_text(bytes)?,
        InputMode::Image => extract_image_text(bytes, ocr()?)?,
    };
    tracing::info!(%mode, chars = text.chars().count(), "text extracted");
    Ok(text)
}
