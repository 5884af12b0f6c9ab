// ONNX sequence-classification model + HF tokenizer
use ndarray::Array1;
use ort::{inputs, session::Session, value::Value};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::tokenizer::{Tokenizer, TruncationParams};

use crate::runtime;

use super::registry::ModelLoadError;
use super::{Classification, ClassificationError, TextClassifier};

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_MAX_TOKENS: usize = 512;

/// Subset of a Hugging Face `config.json` that matters for classification.
#[derive(Debug, Default, Deserialize)]
struct ModelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    max_position_embeddings: Option<usize>,
}

pub struct OnnxClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    wants_token_type_ids: bool,
}

impl OnnxClassifier {
    pub fn load(model_dir: &Path) -> Result<Self, ModelLoadError> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        for required in [&model_path, &tokenizer_path] {
            if !required.exists() {
                return Err(ModelLoadError::MissingFile(required.clone()));
            }
        }

        let config = read_model_config(&model_dir.join(CONFIG_FILE))?;
        let max_tokens = max_tokens_for(&config);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                ..Default::default()
            }))
            .map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;

        let session =
            runtime::load_session(&model_path).map_err(|e| ModelLoadError::Runtime(e.to_string()))?;

        let wants_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let labels = label_table(&config);
        tracing::info!(
            model = %model_dir.display(),
            labels = ?labels,
            max_tokens,
            "classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            labels,
            wants_token_type_ids,
        })
    }

    fn label_for(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{index}"))
    }
}

impl TextClassifier for OnnxClassifier {
    fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassificationError::Tokenize(e.to_string()))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = input_ids.len();
        if seq_len == 0 {
            return Err(ClassificationError::Tokenize("no tokens produced".to_string()));
        }

        let inference = |e: ort::Error| ClassificationError::Inference(e.to_string());
        let input_ids = Value::from_array(([1_usize, seq_len], input_ids.into_boxed_slice()))
            .map_err(inference)?;
        let attention_mask =
            Value::from_array(([1_usize, seq_len], attention_mask.into_boxed_slice()))
                .map_err(inference)?;

        // A panic in an earlier run leaves the session itself usable.
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let outputs = (if self.wants_token_type_ids {
            let token_type_ids =
                Value::from_array(([1_usize, seq_len], vec![0_i64; seq_len].into_boxed_slice()))
                    .map_err(inference)?;
            session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            ])
        } else {
            session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])
        })
        .map_err(inference)?;

        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassificationError::MalformedOutput(e.to_string()))?;
        let num_labels = shape.last().copied().unwrap_or(0) as usize;
        if num_labels == 0 || logits.len() < num_labels {
            return Err(ClassificationError::MalformedOutput(format!(
                "unexpected logits shape {:?}",
                shape
            )));
        }

        let (index, score) = best_label(&logits[..num_labels])?;
        Ok(Classification::new(self.label_for(index), score))
    }
}

fn read_model_config(path: &Path) -> Result<ModelConfig, ModelLoadError> {
    if !path.exists() {
        return Ok(ModelConfig::default());
    }
    let config_error = |e: &dyn std::fmt::Display| {
        ModelLoadError::Config(format!("{}: {e}", path.display()))
    };
    let raw = std::fs::read_to_string(path).map_err(|e| config_error(&e))?;
    serde_json::from_str(&raw).map_err(|e| config_error(&e))
}

// RoBERTa-style position tables reserve two slots for padding offsets.
fn max_tokens_for(config: &ModelConfig) -> usize {
    config
        .max_position_embeddings
        .map(|n| n.saturating_sub(2))
        .filter(|&n| n > 0)
        .map_or(DEFAULT_MAX_TOKENS, |n| n.min(DEFAULT_MAX_TOKENS))
}

fn label_table(config: &ModelConfig) -> Vec<String> {
    let mut indexed: Vec<(usize, String)> = config
        .id2label
        .iter()
        .filter_map(|(id, label)| id.parse::<usize>().ok().map(|i| (i, label.clone())))
        .collect();
    indexed.sort_by_key(|(i, _)| *i);

    let len = indexed.last().map_or(0, |(i, _)| i + 1);
    let mut labels: Vec<String> = (0..len).map(|i| format!("LABEL_{i}")).collect();
    for (i, label) in indexed {
        labels[i] = label;
    }
    labels
}

/// Softmax over the logits, then argmax. Ties go to the lower index.
fn best_label(logits: &[f32]) -> Result<(usize, f32), ClassificationError> {
    if logits.iter().any(|v| !v.is_finite()) {
        return Err(ClassificationError::MalformedOutput(
            "non-finite logits".to_string(),
        ));
    }
    let logits = Array1::from(logits.to_vec());
    let max = logits.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let probs = &exp / exp.sum();

    let mut best = (0, f32::NEG_INFINITY);
    for (i, &p) in probs.iter().enumerate() {
        if p > best.1 {
            best = (i, p);
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_picks_largest_logit() {
        let (index, score) = best_label(&[0.0, 2.0]).unwrap();
        assert_eq!(index, 1);
        assert!((score - 0.880_797).abs() < 1e-4);
    }

    #[test]
    fn equal_logits_favor_first_label() {
        let (index, score) = best_label(&[1.0, 1.0]).unwrap();
        assert_eq!(index, 0);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn nan_logits_are_rejected() {
        assert!(best_label(&[f32::NAN, 1.0]).is_err());
    }

    #[test]
    fn label_table_fills_gaps() {
        let config: ModelConfig =
            serde_json::from_str(r#"{"id2label": {"0": "Fake", "2": "Real"}}"#).unwrap();
        assert_eq!(label_table(&config), vec!["Fake", "LABEL_1", "Real"]);
    }

    #[test]
    fn token_budget_follows_position_table() {
        let roberta: ModelConfig =
            serde_json::from_str(r#"{"max_position_embeddings": 514}"#).unwrap();
        assert_eq!(max_tokens_for(&roberta), 512);

        let small: ModelConfig =
            serde_json::from_str(r#"{"max_position_embeddings": 130}"#).unwrap();
        assert_eq!(max_tokens_for(&small), 128);

        assert_eq!(max_tokens_for(&ModelConfig::default()), 512);
    }

    #[test]
    fn missing_files_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            OnnxClassifier::load(dir.path()),
            Err(ModelLoadError::MissingFile(_))
        ));
    }
}
