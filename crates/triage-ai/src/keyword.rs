//! Deterministic keyword classifier.
//!
//! Used when no transformer model is available. Each keyword found as a
//! substring of the lower-cased text adds a fixed weight to its category;
//! the weights are then normalized into a distribution.

use triage_core::{Category, Scores};

use crate::classifier::{Classifier, ClassifierError};

pub const KEYWORD_MODEL_NAME: &str = "mock-classifier";

/// Weight added per matching keyword.
const KEYWORD_WEIGHT: f32 = 0.3;
/// Cap on a single category's raw score before normalization.
const MAX_RAW_SCORE: f32 = 1.0;

fn keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::Billing => &[
            "payment",
            "invoice",
            "billing",
            "charge",
            "refund",
            "subscription",
            "price",
            "cost",
        ],
        Category::Technical => &[
            "error",
            "bug",
            "crash",
            "not working",
            "broken",
            "issue",
            "problem",
            "technical",
        ],
        Category::Access => &[
            "login",
            "password",
            "access",
            "account",
            "permission",
            "unauthorized",
            "locked",
        ],
        Category::BugReport => &["bug", "error", "crash", "broken", "defect"],
        Category::FeatureRequest => &[
            "feature",
            "request",
            "suggestion",
            "improvement",
            "enhancement",
            "add",
        ],
        Category::General => &[],
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Raw, un-normalized keyword weights.
    fn raw_scores(text: &str) -> [f32; Category::COUNT] {
        let lower = text.to_lowercase();
        Category::ALL.map(|category| {
            let hits = keywords(category)
                .iter()
                .filter(|kw| lower.contains(*kw))
                .count();
            (hits as f32 * KEYWORD_WEIGHT).min(MAX_RAW_SCORE)
        })
    }
}

impl Classifier for KeywordClassifier {
    fn model_name(&self) -> &str {
        KEYWORD_MODEL_NAME
    }

    fn predict(&self, text: &str) -> Result<Scores, ClassifierError> {
        let raw = Self::raw_scores(text);
        let total: f32 = raw.iter().sum();
        if total <= 0.0 {
            return Ok(Scores::one_hot(Category::General));
        }
        Ok(Scores::new(raw.map(|s| s / total)))
    }
}
