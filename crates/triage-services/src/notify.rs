//! Chat notifications for routed tickets.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};
use triage_core::config::SlackConfig;
use triage_core::{Category, NotificationOutcome};

/// Timestamp returned for every mock post.
pub const MOCK_TS: &str = "1234567890.123456";

#[derive(Error, Debug)]
pub enum NotificationError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Slack API error: {0}")]
    Api(String),
}

/// A chat message. `channel: None` posts to the adapter's default channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatMessage {
    pub channel: Option<String>,
    /// Plain-text fallback, also used for notifications.
    pub text: String,
    /// Block Kit layout blocks.
    pub blocks: Vec<Value>,
    pub thread_ts: Option<String>,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn to_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

/// Issue created for a ticket, linked from its notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLink {
    pub key: String,
    pub url: String,
}

/// Announcement of a newly triaged ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketNotification {
    pub ticket_id: String,
    pub category: Category,
    pub summary: String,
    pub channel: String,
    pub issue: Option<IssueLink>,
}

impl TicketNotification {
    /// Header, id/category fields, summary and the optional issue link.
    pub fn to_message(&self) -> ChatMessage {
        let mut blocks = vec![
            json!({
                "type": "header",
                "text": {
                    "type": "plain_text",
                    "text": format!("New {} Ticket", self.category.title()),
                },
            }),
            json!({
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*Ticket ID:*\n{}", self.ticket_id) },
                    { "type": "mrkdwn", "text": format!("*Category:*\n{}", self.category) },
                ],
            }),
            json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": format!("*Summary:*\n{}", self.summary) },
            }),
        ];

        let mut text = format!("New {} ticket: {}", self.category, self.summary);
        if let Some(issue) = &self.issue {
            blocks.push(json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*Jira Issue:* <{}|{}>", issue.url, issue.key),
                },
            }));
            text.push_str(&format!(" (Jira: {})", issue.key));
        }

        ChatMessage {
            channel: Some(self.channel.clone()),
            text,
            blocks,
            thread_ts: None,
        }
    }
}

/// Posts chat messages. Failures are reported in the outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// True when backed by a real workspace.
    fn is_configured(&self) -> bool;

    async fn post_message(&self, message: &ChatMessage) -> NotificationOutcome;

    async fn send_ticket_notification(&self, notification: &TicketNotification) -> NotificationOutcome {
        self.post_message(&notification.to_message()).await
    }
}

/// Notifier that acknowledges every message without sending it.
#[derive(Debug, Clone)]
pub struct MockNotifier {
    default_channel: String,
}

impl MockNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            default_channel: config.default_channel.clone(),
        }
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn is_configured(&self) -> bool {
        false
    }

    async fn post_message(&self, message: &ChatMessage) -> NotificationOutcome {
        let channel = message.channel.as_deref().unwrap_or(&self.default_channel);
        debug!(channel, text = %message.text, "mock message posted");
        NotificationOutcome::posted(channel, MOCK_TS).into_mock()
    }
}

/// Real Slack client when a bot token is configured, mock otherwise.
pub fn from_config(config: &SlackConfig) -> Arc<dyn Notifier> {
    if let Some(client) = remote(config) {
        return client;
    }
    if config.token().is_some() {
        warn!("Slack token set but remote clients are not compiled in, using mock mode");
    } else {
        warn!("Slack token not configured, using mock mode");
    }
    Arc::new(MockNotifier::new(config))
}

#[cfg(feature = "http")]
fn remote(config: &SlackConfig) -> Option<Arc<dyn Notifier>> {
    crate::slack::SlackClient::new(config).map(|c| Arc::new(c) as Arc<dyn Notifier>)
}

#[cfg(not(feature = "http"))]
fn remote(_config: &SlackConfig) -> Option<Arc<dyn Notifier>> {
    None
}
