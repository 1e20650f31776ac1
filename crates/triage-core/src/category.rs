//! The canonical ticket taxonomy.
//!
//! `Category` is the single source of truth for the label set: the classifier
//! emits it, the routing policy is keyed by it, and responses serialize it.
//! Declaration order is the canonical order used for tie-breaking.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownCategory;

/// A support-ticket category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Billing,
    Technical,
    Access,
    General,
    BugReport,
    FeatureRequest,
}

impl Category {
    /// Number of categories. Model heads must emit exactly this many logits.
    pub const COUNT: usize = 6;

    /// All categories in canonical order.
    pub const ALL: [Category; Self::COUNT] = [
        Self::Billing,
        Self::Technical,
        Self::Access,
        Self::General,
        Self::BugReport,
        Self::FeatureRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "billing",
            Self::Technical => "technical",
            Self::Access => "access",
            Self::General => "general",
            Self::BugReport => "bug_report",
            Self::FeatureRequest => "feature_request",
        }
    }

    /// Human-readable label for issue titles and chat headers.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Technical => "Technical",
            Self::Access => "Access",
            Self::General => "General",
            Self::BugReport => "Bug Report",
            Self::FeatureRequest => "Feature Request",
        }
    }

    /// Position in canonical order.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Per-category score distribution, indexed in canonical order.
///
/// Serializes as a JSON object keyed by every category name. Deserializing
/// rejects objects that do not cover the full category set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Category, f32>",
    into = "BTreeMap<Category, f32>"
)]
pub struct Scores([f32; Category::COUNT]);

impl Scores {
    pub fn new(values: [f32; Category::COUNT]) -> Self {
        Self(values)
    }

    /// Distribution with all mass on one category.
    pub fn one_hot(category: Category) -> Self {
        let mut values = [0.0; Category::COUNT];
        values[category.index()] = 1.0;
        Self(values)
    }

    pub fn get(&self, category: Category) -> f32 {
        self.0[category.index()]
    }

    pub fn as_array(&self) -> &[f32; Category::COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f32)> + '_ {
        Category::ALL.into_iter().zip(self.0.iter().copied())
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Highest-scoring category. Ties go to the earliest category in
    /// canonical order.
    pub fn argmax(&self) -> (Category, f32) {
        let mut best = (Category::ALL[0], self.0[0]);
        for (category, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (category, score);
            }
        }
        best
    }
}

impl From<Scores> for BTreeMap<Category, f32> {
    fn from(scores: Scores) -> Self {
        scores.iter().collect()
    }
}

impl TryFrom<BTreeMap<Category, f32>> for Scores {
    type Error = String;

    fn try_from(map: BTreeMap<Category, f32>) -> Result<Self, Self::Error> {
        let mut values = [0.0; Category::COUNT];
        for category in Category::ALL {
            values[category.index()] = *map
                .get(&category)
                .ok_or_else(|| format!("missing score for category '{category}'"))?;
        }
        Ok(Self(values))
    }
}
