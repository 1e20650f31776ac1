//! The classification capability and the contract every model must honour.
//!
//! A [`Classifier`] only has to produce a score per category. [`classify`]
//! turns that into a [`ClassificationResult`]: it validates the input before
//! the model is touched and checks the distribution before picking the
//! argmax.

use thiserror::Error;
use triage_core::{ClassificationResult, Scores, TriageError, validate_text};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model load failed: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model emits {got} labels, expected {expected}")]
    LabelCount { expected: usize, got: usize },

    #[error("invalid score distribution: {0}")]
    InvalidScores(String),

    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

impl From<ClassifierError> for TriageError {
    fn from(err: ClassifierError) -> Self {
        TriageError::Classification(err.to_string())
    }
}

/// Anything that can produce a probability distribution over categories.
pub trait Classifier: Send + Sync {
    /// Name reported in responses and health checks.
    fn model_name(&self) -> &str;

    /// Score every category for `text`. Callers guarantee `text` is non-blank.
    fn predict(&self, text: &str) -> Result<Scores, ClassifierError>;
}

/// Classify one ticket text.
///
/// Blank text fails with [`TriageError::Validation`] without invoking the
/// model. Model failures surface as [`TriageError::Classification`].
pub fn classify(classifier: &dyn Classifier, text: &str) -> Result<ClassificationResult, TriageError> {
    validate_text(text)?;
    let scores = classifier.predict(text)?;
    check_distribution(&scores)?;
    Ok(ClassificationResult::from_scores(scores, classifier.model_name()))
}

/// Scores must be finite and non-negative.
fn check_distribution(scores: &Scores) -> Result<(), ClassifierError> {
    for (category, score) in scores.iter() {
        if !score.is_finite() || score < 0.0 {
            return Err(ClassifierError::InvalidScores(format!(
                "{category} = {score}"
            )));
        }
    }
    Ok(())
}

/// Numerically stable softmax into a [`Scores`] distribution.
pub fn softmax(logits: &[f32]) -> Result<Scores, ClassifierError> {
    let values: [f32; triage_core::Category::COUNT] =
        logits.try_into().map_err(|_| ClassifierError::LabelCount {
            expected: triage_core::Category::COUNT,
            got: logits.len(),
        })?;

    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = values.map(|v| (v - max).exp());
    let total: f32 = exps.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(ClassifierError::InvalidScores(format!(
            "softmax over {logits:?}"
        )));
    }
    Ok(Scores::new(exps.map(|e| e / total)))
}
