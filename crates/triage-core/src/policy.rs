//! Category → escalation parameters.
//!
//! The table is built once at startup and read concurrently afterwards. It
//! must cover every [`Category`]; constructors that take external input
//! validate coverage so that a lookup during routing cannot miss.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::category::Category;
use crate::error::TriageError;

/// Channel used by categories without a dedicated one.
pub const DEFAULT_CHANNEL: &str = "#support-tickets";

/// Issue priority. Serialized with Jira's priority names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    /// Case-insensitive Jira priority name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Low, Self::Medium, Self::High]
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown priority '{s}', expected Low, Medium or High"))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing parameters for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub jira_priority: Priority,
    pub slack_channel: String,
}

impl PolicyEntry {
    pub fn new(jira_priority: Priority, slack_channel: impl Into<String>) -> Self {
        Self {
            jira_priority,
            slack_channel: slack_channel.into(),
        }
    }
}

/// Immutable routing table.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPolicy {
    entries: BTreeMap<Category, PolicyEntry>,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::with_default_channel(DEFAULT_CHANNEL)
    }
}

impl RoutingPolicy {
    /// Built-in table. Categories without a dedicated channel route to
    /// `default_channel` at medium priority. A blank channel is replaced by
    /// [`DEFAULT_CHANNEL`].
    pub fn with_default_channel(default_channel: &str) -> Self {
        let default_channel = match default_channel.trim() {
            "" => {
                warn!("default channel is blank, using {DEFAULT_CHANNEL}");
                DEFAULT_CHANNEL
            }
            channel => channel,
        };
        let entries = Category::ALL
            .into_iter()
            .map(|category| {
                let entry = match category {
                    Category::Billing => PolicyEntry::new(Priority::High, "#billing"),
                    Category::Technical => PolicyEntry::new(Priority::Medium, "#technical"),
                    Category::Access => PolicyEntry::new(Priority::High, "#access"),
                    Category::General => PolicyEntry::new(Priority::Low, "#general"),
                    Category::BugReport | Category::FeatureRequest => {
                        PolicyEntry::new(Priority::Medium, default_channel)
                    }
                };
                (category, entry)
            })
            .collect();
        Self { entries }
    }

    /// Build a table from label-keyed entries, as found in a routing file.
    ///
    /// Fails if a label is not a known category, a channel is blank, or any
    /// category is left without an entry.
    pub fn from_entries(raw: HashMap<String, PolicyEntry>) -> Result<Self, TriageError> {
        let mut entries = BTreeMap::new();
        for (label, entry) in raw {
            let category: Category = label.parse()?;
            if entry.slack_channel.trim().is_empty() {
                return Err(TriageError::RoutingConfig(format!(
                    "empty slack_channel for category '{category}'"
                )));
            }
            entries.insert(category, entry);
        }

        let missing: Vec<&str> = Category::ALL
            .iter()
            .filter(|c| !entries.contains_key(*c))
            .map(|c| c.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(TriageError::RoutingConfig(format!(
                "no routing entry for: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { entries })
    }

    /// Parse a JSON object of `{label: {jira_priority, slack_channel}}`.
    pub fn from_json(json: &str) -> Result<Self, TriageError> {
        let raw: HashMap<String, PolicyEntry> = serde_json::from_str(json)
            .map_err(|e| TriageError::RoutingConfig(format!("parse routing table: {e}")))?;
        Self::from_entries(raw)
    }

    /// Load a routing table file.
    pub fn load(path: &Path) -> Result<Self, TriageError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TriageError::RoutingConfig(format!("read {}: {e}", path.display()))
        })?;
        let policy = Self::from_json(&json)?;
        info!(path = %path.display(), entries = policy.entries.len(), "loaded routing table");
        Ok(policy)
    }

    pub fn lookup(&self, category: Category) -> Result<&PolicyEntry, TriageError> {
        self.entries.get(&category).ok_or_else(|| {
            TriageError::RoutingConfig(format!("no routing entry for category '{category}'"))
        })
    }

    /// Look up by label string.
    pub fn lookup_label(&self, label: &str) -> Result<&PolicyEntry, TriageError> {
        self.lookup(label.parse()?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &PolicyEntry)> {
        self.entries.iter().map(|(c, e)| (*c, e))
    }
}
