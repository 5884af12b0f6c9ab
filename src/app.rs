// Application context: settings, lazily loaded models, request flow
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;

use crate::classifier::registry::Resolved;
use crate::classifier::{ClassifierLoader, ModelRegistry, OnnxLoader};
use crate::config::Settings;
use crate::detection;
use crate::extraction::{self, ExtractionError, InputMode};
use crate::ocr::{OcrEngine, OcrError, OnnxOcrEngine};
use crate::types::{DetectorError, Detection, Result};

pub type OcrFactory =
    Box<dyn Fn(&Settings) -> std::result::Result<Arc<dyn OcrEngine>, OcrError> + Send + Sync>;

/// Where the text of a request comes from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Text(String),
    File { path: PathBuf, mode: Option<InputMode> },
}

impl InputSource {
    pub fn mode(&self) -> InputMode {
        match self {
            InputSource::Text(_) => InputMode::Text,
            InputSource::File { path, mode } => mode.unwrap_or_else(|| InputMode::from_path(path)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectRequest {
    pub source: InputSource,
    pub model: String,
    pub chunk_size: usize,
    pub workers: usize,
}

#[derive(Debug)]
pub struct DetectOutcome {
    pub model_id: String,
    pub detection: Detection,
    pub warnings: Vec<String>,
}

/// Owns everything that outlives a single request: configuration, the
/// classifier registry and the OCR engine (built on first image request).
pub struct AppContext {
    pub settings: Settings,
    registry: ModelRegistry,
    ocr: OnceCell<Arc<dyn OcrEngine>>,
    ocr_factory: OcrFactory,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        let loader = OnnxLoader::new(settings.detector.models_dir.clone());
        Self::with_components(
            settings,
            Box::new(loader),
            Box::new(
                |settings: &Settings| -> std::result::Result<Arc<dyn OcrEngine>, OcrError> {
                    Ok(Arc::new(OnnxOcrEngine::new(settings)?))
                },
            ),
        )
    }

    pub fn with_components(
        settings: Settings,
        loader: Box<dyn ClassifierLoader>,
        ocr_factory: OcrFactory,
    ) -> Self {
        let registry = ModelRegistry::new(loader, crate::config::DEFAULT_MODEL);
        Self {
            settings,
            registry,
            ocr: OnceCell::new(),
            ocr_factory,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn ocr(&self) -> std::result::Result<&dyn OcrEngine, OcrError> {
        self.ocr
            .get_or_try_init(|| (self.ocr_factory)(&self.settings))
            .map(|engine| engine.as_ref())
    }

    pub fn extract(&self, source: &InputSource) -> Result<String> {
        let mode = source.mode();
        match source {
            InputSource::Text(text) => Ok(text.clone()),
            InputSource::File { path, mode: explicit } => {
                if explicit.is_some() {
                    mode.check_file(path)?;
                }
                let bytes = std::fs::read(path).map_err(ExtractionError::from)?;
                tracing::info!(file = %path.display(), %mode, bytes = bytes.len(), "extracting");
                let text = extraction::extract(mode, &bytes, || {
                    self.ocr().map_err(ExtractionError::from)
                })?;
                Ok(text)
            }
        }
    }

    /// Extract, pick the model (falling back if needed) and classify.
    pub async fn detect(&self, request: &DetectRequest) -> Result<DetectOutcome> {
        let text = self.extract(&request.source)?;
        if text.trim().is_empty() {
            return Err(DetectorError::EmptyInput);
        }

        let Resolved {
            model_id,
            classifier,
            fallback_from,
        } = self.registry.resolve(&request.model)?;

        let mut warnings = Vec::new();
        if let Some((requested, err)) = fallback_from {
            warnings.push(format!(
                "failed to load model `{requested}`: {err}; using `{model_id}` instead"
            ));
        }

        let detection = if request.workers > 1 {
            detection::detect_concurrent(&text, classifier, request.chunk_size, request.workers)
                .await?
        } else {
            detection::detect(&text, classifier.as_ref(), request.chunk_size)
        };

        Ok(DetectOutcome {
            model_id,
            detection,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classification, ClassificationError, ModelLoadError, TextClassifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OnlyDefault;

    impl ClassifierLoader for OnlyDefault {
        fn load(
            &self,
            model_id: &str,
        ) -> std::result::Result<Arc<dyn TextClassifier>, ModelLoadError> {
            if model_id != crate::config::DEFAULT_MODEL {
                return Err(ModelLoadError::InvalidIdentifier(model_id.to_string()));
            }
            Ok(Arc::new(|_: &str| -> std::result::Result<Classification, ClassificationError> {
                Ok(Classification::new("Real", 0.8))
            }))
        }
    }

    fn context(ocr_builds: Arc<AtomicUsize>) -> AppContext {
        AppContext::with_components(
            Settings::default(),
            Box::new(OnlyDefault),
            Box::new(move |_: &Settings| -> std::result::Result<Arc<dyn OcrEngine>, OcrError> {
                ocr_builds.fetch_add(1, Ordering::SeqCst);
                Err(OcrError::MissingModel(PathBuf::from("det.onnx")))
            }),
        )
    }

    fn request(text: &str, model: &str) -> DetectRequest {
        DetectRequest {
            source: InputSource::Text(text.to_string()),
            model: model.to_string(),
            chunk_size: 512,
            workers: 1,
        }
    }

    #[tokio::test]
    async fn blank_input_is_rejected_before_loading_models() {
        let ctx = context(Arc::new(AtomicUsize::new(0)));
        let result = ctx.detect(&request("  \n ", "anything")).await;
        assert!(matches!(result, Err(DetectorError::EmptyInput)));
        assert!(!ctx.registry().is_loaded(crate::config::DEFAULT_MODEL));
    }

    #[tokio::test]
    async fn unloadable_model_falls_back_with_warning() {
        let ctx = context(Arc::new(AtomicUsize::new(0)));
        let outcome = ctx.detect(&request("some text", "my/custom-model")).await.unwrap();
        assert_eq!(outcome.model_id, crate::config::DEFAULT_MODEL);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("my/custom-model"));
        assert_eq!(outcome.detection.verdict.label, "Real");
    }

    #[tokio::test]
    async fn blank_model_name_falls_back_with_warning() {
        let ctx = context(Arc::new(AtomicUsize::new(0)));
        let outcome = ctx.detect(&request("some text", "")).await.unwrap();
        assert_eq!(outcome.model_id, crate::config::DEFAULT_MODEL);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn ocr_is_not_built_for_text_input() {
        let builds = Arc::new(AtomicUsize::new(0));
        let ctx = context(Arc::clone(&builds));
        ctx.extract(&InputSource::Text("hi".into())).unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_ocr_models_surface_as_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();

        let builds = Arc::new(AtomicUsize::new(0));
        let ctx = context(Arc::clone(&builds));
        let source = InputSource::File { path, mode: None };
        let err = ctx.extract(&source).unwrap_err();
        assert!(matches!(err, DetectorError::Extraction(ExtractionError::Ocr(_))));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_mode_checks_extension() {
        let ctx = context(Arc::new(AtomicUsize::new(0)));
        let source = InputSource::File {
            path: PathBuf::from("slides.pptx"),
            mode: Some(InputMode::Pdf),
        };
        assert!(matches!(
            ctx.extract(&source),
            Err(DetectorError::Extraction(ExtractionError::UnsupportedFile { .. }))
        ));
    }
}
