// ONNX Runtime session setup shared by the classifier and the OCR models
use ort::{
    init,
    session::builder::GraphOptimizationLevel,
    session::Session,
};
use std::path::Path;
use std::sync::Once;

const INTRA_THREADS: usize = 4;

static INIT: Once = Once::new();

/// Build an optimized session for one model file. The global environment is
/// committed once per process before the first session.
pub fn load_session(model_path: &Path) -> ort::Result<Session> {
    INIT.call_once(|| {
        if let Err(e) = init().with_name("aidetect").commit() {
            tracing::warn!(error = %e, "ONNX Runtime environment setup failed, using defaults");
        }
    });

    tracing::debug!(model = %model_path.display(), "loading ONNX session");
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(INTRA_THREADS)?
        .commit_from_file(model_path)
}
