//! ONNX Runtime sequence classifier for fine-tuned transformer models.
//!
//! The model directory must contain `model.onnx` (a sequence-classification
//! head exported with one logit per category, in canonical order) and
//! `tokenizer.json`.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

use ort::session::{Session, SessionInputValue};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info};
use triage_core::{Category, Scores};

use crate::classifier::{Classifier, ClassifierError, softmax};

/// BERT-family context window.
const MAX_TOKENS: usize = 512;

/// Transformer classifier backed by ONNX Runtime.
///
/// The session is behind a mutex: inference needs exclusive access, the
/// tokenizer does not.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    name: String,
    /// BERT exports take segment ids; DistilBERT and RoBERTa exports do not.
    token_types: bool,
}

impl OnnxClassifier {
    /// Load a classifier from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path, name: &str) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;

        // Reject heads that were not trained on our label set.
        if let Some(labels) = infer_label_count(session.outputs()[0].dtype()) {
            anyhow::ensure!(
                labels == Category::COUNT,
                "model emits {labels} labels, expected {}",
                Category::COUNT
            );
        }

        let token_types = declares_token_types(session.inputs().iter().map(|i| i.name()));

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        info!(model = %model_path.display(), name, token_types, "loaded classification model");
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            name: name.to_string(),
            token_types,
        })
    }

    /// Raw logits for one text: `[Category::COUNT]`.
    fn logits(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let seq_len = encoding.get_ids().len();
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        let shape = [1i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        let mut inputs = ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
        ];
        if self.token_types {
            let token_type_ids: Vec<i64> =
                encoding.get_type_ids().iter().map(|&t| t as i64).collect();
            let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;
            inputs.push((
                Cow::from("token_type_ids"),
                SessionInputValue::from(type_tensor),
            ));
        }
        let outputs = session.run(inputs)?;

        // Logits: [1, num_labels].
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 2 && dims[0] == 1 && dims[1] as usize == Category::COUNT,
            "unexpected output shape: {dims:?}, expected [1, {}]",
            Category::COUNT
        );

        debug!(tokens = seq_len, "ran classification model");
        Ok(output_data.to_vec())
    }
}

impl Classifier for OnnxClassifier {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn predict(&self, text: &str) -> Result<Scores, ClassifierError> {
        let logits = self
            .logits(text)
            .map_err(|e| ClassifierError::Inference(format!("{e:#}")))?;
        softmax(&logits)
    }
}

fn declares_token_types<'a>(mut input_names: impl Iterator<Item = &'a str>) -> bool {
    input_names.any(|name| name == "token_type_ids")
}

/// Try to infer the label count from the model's output type.
fn infer_label_count(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("ticket-classifier")
    }

    fn require_model() -> PathBuf {
        let dir = model_dir();
        if !dir.join("model.onnx").exists() {
            panic!(
                "Model not found. Export a fine-tuned sequence classifier with 6 labels:\n  \
                 optimum-cli export onnx --task text-classification \
                 --model <checkpoint> models/ticket-classifier"
            );
        }
        dir
    }

    #[test]
    fn segment_ids_only_for_models_that_declare_them() {
        let bert = ["input_ids", "attention_mask", "token_type_ids"];
        let distilbert = ["input_ids", "attention_mask"];
        assert!(declares_token_types(bert.into_iter()));
        assert!(!declares_token_types(distilbert.into_iter()));
    }

    #[test]
    fn load_missing_dir_fails() {
        let err = OnnxClassifier::load(Path::new("/nonexistent/model"), "x")
            .err()
            .expect("load should fail");
        assert!(err.to_string().contains("model.onnx not found"));
    }

    #[test]
    #[ignore = "requires models/ticket-classifier"]
    fn classify_with_model() {
        let dir = require_model();
        let model = OnnxClassifier::load(&dir, "ticket-classifier").unwrap();
        let result = classify(&model, "I cannot access my account").unwrap();
        assert!((result.scores.sum() - 1.0).abs() < 1e-4);
        assert_eq!(result.confidence, result.scores.get(result.category));
        assert_eq!(result.model, "ticket-classifier");
    }

    #[test]
    #[ignore = "requires models/ticket-classifier"]
    fn long_text_is_truncated() {
        let dir = require_model();
        let model = OnnxClassifier::load(&dir, "ticket-classifier").unwrap();
        let text = "my invoice is wrong ".repeat(400);
        assert!(classify(&model, &text).is_ok());
    }
}
