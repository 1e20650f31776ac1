//! Shared, lazily-loaded classifier.
//!
//! A [`ClassifierHandle`] is created once at startup and passed by reference
//! to whatever needs classification. The underlying model is loaded on first
//! use; concurrent first callers wait on the same load. The load runs in its
//! own task, so a caller that gives up does not abandon it. A failed load
//! leaves the handle empty, so the next call tries again.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};
use triage_core::config::{ModelBackend, ModelConfig};
use triage_core::{ClassificationResult, TriageError, validate_text};

use crate::classifier::{Classifier, ClassifierError, classify};
use crate::keyword::{KEYWORD_MODEL_NAME, KeywordClassifier};

type Loader = dyn Fn() -> Result<Arc<dyn Classifier>, ClassifierError> + Send + Sync;

pub struct ClassifierHandle {
    cell: Arc<OnceCell<Arc<dyn Classifier>>>,
    loader: Arc<Loader>,
    /// Name to report before the model is loaded.
    configured_name: String,
}

impl ClassifierHandle {
    /// Handle that runs `loader` on first use.
    pub fn lazy<F>(configured_name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Classifier>, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            loader: Arc::new(loader),
            configured_name: configured_name.into(),
        }
    }

    /// Handle around an already-constructed classifier.
    pub fn ready(classifier: Arc<dyn Classifier>) -> Self {
        let configured_name = classifier.model_name().to_string();
        let again = Arc::clone(&classifier);
        Self {
            cell: Arc::new(OnceCell::new_with(Some(classifier))),
            loader: Arc::new(move || Ok(Arc::clone(&again))),
            configured_name,
        }
    }

    /// Select the classifier implementation for `model`.
    pub fn from_config(model: &ModelConfig) -> Self {
        let dir = model.model_dir();
        match model.backend {
            ModelBackend::Keyword => {
                info!("using keyword classifier");
                Self::ready(Arc::new(KeywordClassifier::new()))
            }
            ModelBackend::Onnx => Self::onnx(dir, model.name.clone()),
            ModelBackend::Auto if onnx_available(&dir) => Self::onnx(dir, model.name.clone()),
            ModelBackend::Auto => {
                warn!(
                    model = %model.name,
                    dir = %dir.display(),
                    "transformer model not available, using keyword classifier"
                );
                Self::ready(Arc::new(KeywordClassifier::new()))
            }
        }
    }

    fn onnx(dir: std::path::PathBuf, name: String) -> Self {
        let configured = name.clone();
        Self::lazy(configured, move || load_onnx(&dir, &name))
    }

    /// The loaded classifier, loading it if necessary.
    pub async fn get(&self) -> Result<Arc<dyn Classifier>, TriageError> {
        if let Some(classifier) = self.cell.get() {
            return Ok(Arc::clone(classifier));
        }
        let cell = Arc::clone(&self.cell);
        let loader = Arc::clone(&self.loader);
        let init = tokio::spawn(async move {
            let classifier = cell
                .get_or_try_init(|| async move {
                    let loaded = tokio::task::spawn_blocking(move || loader())
                        .await
                        .map_err(|e| ClassifierError::Load(format!("loader task failed: {e}")))?;
                    match &loaded {
                        Ok(c) => info!(model = c.model_name(), "classifier ready"),
                        Err(e) => warn!(error = %e, "classifier load failed"),
                    }
                    loaded
                })
                .await
                .map(Arc::clone);
            classifier
        });
        let classifier = init
            .await
            .map_err(|e| ClassifierError::Load(format!("loader task failed: {e}")))??;
        Ok(classifier)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Model name: the loaded model's if available, the configured one otherwise.
    pub fn model_name(&self) -> String {
        match self.cell.get() {
            Some(c) => c.model_name().to_string(),
            None => self.configured_name.clone(),
        }
    }

    /// Classify one text. Blank text is rejected before the model is loaded.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult, TriageError> {
        validate_text(text)?;
        let classifier = self.get().await?;
        let text = text.to_owned();
        tokio::task::spawn_blocking(move || classify(classifier.as_ref(), &text))
            .await
            .map_err(|e| TriageError::Classification(format!("inference task failed: {e}")))?
    }

    /// Classify several texts, failing on the first error.
    pub async fn classify_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<ClassificationResult>, TriageError> {
        if let Some(blank) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(TriageError::Validation(format!(
                "ticket text at index {blank} must not be empty"
            )));
        }
        let classifier = self.get().await?;
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|t| classify(classifier.as_ref(), t))
                .collect()
        })
        .await
        .map_err(|e| TriageError::Classification(format!("inference task failed: {e}")))?
    }
}

impl Default for ClassifierHandle {
    fn default() -> Self {
        Self::ready(Arc::new(KeywordClassifier::new()))
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("model", &self.model_name())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn onnx_available(dir: &Path) -> bool {
    cfg!(feature = "onnx") && dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists()
}

#[cfg(feature = "onnx")]
fn load_onnx(dir: &Path, name: &str) -> Result<Arc<dyn Classifier>, ClassifierError> {
    crate::onnx::OnnxClassifier::load(dir, name)
        .map(|c| Arc::new(c) as Arc<dyn Classifier>)
        .map_err(|e| ClassifierError::Load(format!("{e:#}")))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(dir: &Path, name: &str) -> Result<Arc<dyn Classifier>, ClassifierError> {
    Err(ClassifierError::Unavailable(format!(
        "cannot load '{name}' from {}: built without the `onnx` feature",
        dir.display()
    )))
}
