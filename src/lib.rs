//! aidetect: estimate whether text, slides, PDFs or scanned images were
//! written by a language model, using local ONNX sequence classifiers.

pub mod app;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod detection;
pub mod extraction;
pub mod logging;
pub mod ocr;
pub mod report;
pub mod runtime;
pub mod types;

pub use app::{AppContext, DetectOutcome, DetectRequest, InputSource};
pub use types::{ChunkResult, Detection, DetectorError, Verdict};
