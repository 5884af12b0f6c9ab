// Configuration for aidetect: TOML file with per-field defaults plus env overrides
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::DEFAULT_CHUNK_SIZE;

pub const CONFIG_ENV: &str = "AIDETECT_CONFIG";
pub const MODELS_DIR_ENV: &str = "AIDETECT_MODELS_DIR";
pub const LOCAL_CONFIG_FILE: &str = "aidetect.toml";

pub const DEFAULT_MODEL: &str = "roberta-base-openai-detector";
pub const PRESET_MODELS: &[&str] = &[
    "roberta-base-openai-detector",
    "roberta-large-openai-detector",
];

pub const MIN_DISPLAY_CHUNKS: usize = 1;
pub const MAX_DISPLAY_CHUNKS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectorConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            models_dir: default_models_dir(),
            chunk_size: default_chunk_size(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default)]
    pub show_chunk_text: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_chunks: default_max_chunks(),
            show_chunk_text: false,
        }
    }
}

/// Model files and tuning for the OCR pipeline. Relative paths resolve
/// against the models directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrConfig {
    #[serde(default = "default_det_model")]
    pub det_model: PathBuf,
    #[serde(default = "default_rec_model")]
    pub rec_model: PathBuf,
    #[serde(default = "default_keys")]
    pub keys: PathBuf,
    #[serde(default = "default_rec_score_threshold")]
    pub rec_score_threshold: f32,
    #[serde(default = "default_det_batch_size")]
    pub det_batch_size: usize,
    #[serde(default = "default_rec_batch_size")]
    pub rec_batch_size: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            det_model: default_det_model(),
            rec_model: default_rec_model(),
            keys: default_keys(),
            rec_score_threshold: default_rec_score_threshold(),
            det_batch_size: default_det_batch_size(),
            rec_batch_size: default_rec_batch_size(),
        }
    }
}

fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_models_dir() -> PathBuf { PathBuf::from("./models") }
fn default_chunk_size() -> usize { DEFAULT_CHUNK_SIZE }
fn default_workers() -> usize { 1 }
fn default_max_chunks() -> usize { 10 }
fn default_det_model() -> PathBuf { PathBuf::from("ocr/ppocrv4_mobile_det.onnx") }
fn default_rec_model() -> PathBuf { PathBuf::from("ocr/ppocrv4_mobile_rec.onnx") }
fn default_keys() -> PathBuf { PathBuf::from("ocr/ppocr_keys_v1.txt") }
fn default_rec_score_threshold() -> f32 { 0.3 }
fn default_det_batch_size() -> usize { 1 }
fn default_rec_batch_size() -> usize { 6 }

impl Settings {
    /// Load settings from an explicit path, or from the first config file found
    /// in the usual places. A missing file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match explicit.map(Path::to_path_buf).or_else(locate_config) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Ok(dir) = env::var(MODELS_DIR_ENV) {
            settings.detector.models_dir = PathBuf::from(dir);
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detector.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "detector.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.detector.workers == 0 {
            return Err(ConfigError::Invalid {
                key: "detector.workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.ocr.rec_score_threshold) {
            return Err(ConfigError::Invalid {
                key: "ocr.rec_score_threshold",
                reason: format!("{} is outside 0..=1", self.ocr.rec_score_threshold),
            });
        }
        for (key, value) in [
            ("ocr.det_batch_size", self.ocr.det_batch_size),
            ("ocr.rec_batch_size", self.ocr.rec_batch_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolve an OCR asset path against the models directory.
    pub fn ocr_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.detector.models_dir.join(path)
        }
    }
}

/// Display cap is kept inside the same range the slider used to allow.
pub fn clamp_display_chunks(requested: usize) -> usize {
    requested.clamp(MIN_DISPLAY_CHUNKS, MAX_DISPLAY_CHUNKS)
}

fn locate_config() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("aidetect").join("config.toml"))
        .filter(|path| path.exists())
}
