// Core types and constants for aidetect
use serde::{Deserialize, Serialize};

use crate::classifier::registry::ModelLoadError;
use crate::config::ConfigError;
use crate::extraction::ExtractionError;

pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Label reported when there was nothing to classify.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";
/// Label substituted for a chunk whose classification failed.
pub const ERROR_LABEL: &str = "ERROR";

/// Outcome for one chunk of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunk: String,
    pub label: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChunkResult {
    pub fn classified(chunk: impl Into<String>, label: impl Into<String>, score: f32) -> Self {
        Self {
            chunk: chunk.into(),
            label: label.into(),
            score: score.clamp(0.0, 1.0),
            error: None,
        }
    }

    pub fn failed(chunk: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            chunk: chunk.into(),
            label: ERROR_LABEL.to_string(),
            score: 0.0,
            error: Some(reason.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregated label and mean score over all chunks of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: String,
    pub score: f32,
}

impl Verdict {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub verdict: Verdict,
    pub chunks: Vec<ChunkResult>,
}

impl Detection {
    pub fn empty() -> Self {
        Self {
            verdict: Verdict::unknown(),
            chunks: Vec::new(),
        }
    }

    pub fn failed_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_error()).count()
    }
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no usable text: enter some text or supply a file")]
    EmptyInput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("classification task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, DetectorError>;
