// Text classifier adapter
pub mod onnx;
pub mod registry;

pub use onnx::OnnxClassifier;
pub use registry::{ClassifierLoader, ModelLoadError, ModelRegistry, OnnxLoader};

/// A label and the model's confidence in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub score: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("tokenization failed: {0}")]
    Tokenize(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}

/// Pretrained text classifier: short text in, (label, score) out.
///
/// Implementations are loaded once and shared, so `classify` takes `&self`.
pub trait TextClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Classification, ClassificationError>;
}

impl<F> TextClassifier for F
where
    F: Fn(&str) -> Result<Classification, ClassificationError> + Send + Sync,
{
    fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        self(text)
    }
}
