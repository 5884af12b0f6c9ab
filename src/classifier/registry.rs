// Loaded classifiers keyed by model identifier
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{OnnxClassifier, TextClassifier};

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("invalid model identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("model file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("failed to read model config: {0}")]
    Config(String),

    #[error("ONNX Runtime error: {0}")]
    Runtime(String),
}

/// Turns a model identifier into a ready classifier.
pub trait ClassifierLoader: Send + Sync {
    fn load(&self, model_id: &str) -> Result<Arc<dyn TextClassifier>, ModelLoadError>;
}

/// Loads `<models_dir>/<model id>/` as an ONNX classifier. Identifiers may be
/// namespaced (`org/name`), which maps onto nested directories.
pub struct OnnxLoader {
    models_dir: PathBuf,
}

impl OnnxLoader {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn model_dir(&self, model_id: &str) -> Result<PathBuf, ModelLoadError> {
        let relative = Path::new(model_id);
        let well_formed = !model_id.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(ModelLoadError::InvalidIdentifier(model_id.to_string()));
        }
        Ok(self.models_dir.join(relative))
    }
}

impl ClassifierLoader for OnnxLoader {
    fn load(&self, model_id: &str) -> Result<Arc<dyn TextClassifier>, ModelLoadError> {
        let dir = self.model_dir(model_id)?;
        Ok(Arc::new(OnnxClassifier::load(&dir)?))
    }
}

/// A classifier handed out by the registry, plus the load failure that forced
/// a fallback, if any.
pub struct Resolved {
    pub model_id: String,
    pub classifier: Arc<dyn TextClassifier>,
    pub fallback_from: Option<(String, ModelLoadError)>,
}

/// Process-wide cache of classifiers. Each distinct identifier is loaded on
/// first use and kept until the registry is dropped.
pub struct ModelRegistry {
    loader: Box<dyn ClassifierLoader>,
    default_model: String,
    loaded: Mutex<HashMap<String, Arc<dyn TextClassifier>>>,
}

impl ModelRegistry {
    pub fn new(loader: Box<dyn ClassifierLoader>, default_model: impl Into<String>) -> Self {
        Self {
            loader,
            default_model: default_model.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn is_loaded(&self, model_id: &str) -> bool {
        self.loaded
            .lock()
            .map(|cache| cache.contains_key(model_id))
            .unwrap_or(false)
    }

    pub fn get(&self, model_id: &str) -> Result<Arc<dyn TextClassifier>, ModelLoadError> {
        let model_id = model_id.trim();
        // The lock is held across the load so one identifier never loads twice.
        let mut cache = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(classifier) = cache.get(model_id) {
            return Ok(Arc::clone(classifier));
        }

        tracing::info!(model = model_id, "loading classifier");
        let classifier = self.loader.load(model_id)?;
        cache.insert(model_id.to_string(), Arc::clone(&classifier));
        Ok(classifier)
    }

    /// Load the requested model, falling back to the default model when it
    /// cannot be loaded. Fails only when the default fails too.
    pub fn resolve(&self, model_id: &str) -> Result<Resolved, ModelLoadError> {
        match self.get(model_id) {
            Ok(classifier) => Ok(Resolved {
                model_id: model_id.trim().to_string(),
                classifier,
                fallback_from: None,
            }),
            Err(err) if model_id.trim() != self.default_model => {
                tracing::warn!(
                    model = model_id,
                    fallback = %self.default_model,
                    error = %err,
                    "model failed to load, falling back"
                );
                let classifier = self.get(&self.default_model)?;
                Ok(Resolved {
                    model_id: self.default_model.clone(),
                    classifier,
                    fallback_from: Some((model_id.to_string(), err)),
                })
            }
            Err(err) => Err(err),
        }
    }
}
