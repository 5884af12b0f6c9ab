// OCR: PP-OCR text detection + recognition behind a small engine trait
pub mod engine;

use image::RgbImage;
use serde::{Deserialize, Serialize};

pub use engine::OnnxOcrEngine;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl BBox {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
}

/// Lines recognized on one image, in detection order. Each line is its own
/// result so a bad line does not sink the whole image.
#[derive(Debug, Default)]
pub struct OcrPage {
    pub lines: Vec<Result<OcrLine, OcrError>>,
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR model not found: {}", .0.display())]
    MissingModel(std::path::PathBuf),

    #[error("OCR pipeline error: {0}")]
    Runtime(String),

    #[error("unexpected OCR output: {0}")]
    Output(String),

    #[error("failed to stage image for OCR: {0}")]
    Staging(String),
}

pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrPage>, OcrError>;
}
