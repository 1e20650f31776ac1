//! Request and result types shared by the classifier, the service adapters,
//! and the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::category::{Category, Scores};
use crate::policy::PolicyEntry;

/// A ticket as received from a caller or a mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketInput {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
}

impl TicketInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ticket_id: None,
            subject: None,
            from_email: None,
        }
    }

    pub fn with_id(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_sender(mut self, from_email: impl Into<String>) -> Self {
        self.from_email = Some(from_email.into());
        self
    }
}

/// Output of a classifier for one ticket.
///
/// Construct through [`ClassificationResult::from_scores`] so that
/// `category` is always the argmax and `confidence` its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub confidence: f32,
    pub scores: Scores,
    pub model: String,
}

impl ClassificationResult {
    pub fn from_scores(scores: Scores, model: impl Into<String>) -> Self {
        let (category, confidence) = scores.argmax();
        Self {
            category,
            confidence,
            scores,
            model: model.into(),
        }
    }
}

/// Result of a single issue-creation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
}

impl IssueOutcome {
    pub fn created(key: impl Into<String>, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            success: true,
            issue_key: Some(key.into()),
            issue_id: Some(id.into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Successful update of an existing issue (no new id).
    pub fn updated(key: impl Into<String>) -> Self {
        Self {
            success: true,
            issue_key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn into_mock(mut self) -> Self {
        self.mock = true;
        self
    }

    /// Issue key, only if the attempt succeeded.
    pub fn created_key(&self) -> Option<&str> {
        self.issue_key.as_deref().filter(|_| self.success)
    }
}

/// Result of a single chat-notification attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
}

impl NotificationOutcome {
    pub fn posted(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: Some(channel.into()),
            ts: Some(ts.into()),
            ..Default::default()
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn into_mock(mut self) -> Self {
        self.mock = true;
        self
    }
}

/// Everything the router decided and did for one ticket.
///
/// The classification fields are flattened into the top level of the JSON
/// object, next to the outcomes and the applied policy entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub ticket_id: String,
    #[serde(flatten)]
    pub classification: ClassificationResult,
    pub jira_issue: Option<IssueOutcome>,
    pub slack_message: Option<NotificationOutcome>,
    pub routing_config: PolicyEntry,
}
