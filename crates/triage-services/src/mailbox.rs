//! Inbound tickets from a mailbox.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use triage_core::TicketInput;
use triage_core::config::GmailConfig;

/// Default mailbox search: unread messages.
pub const DEFAULT_QUERY: &str = "is:unread";
pub const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Error, Debug)]
pub enum MailboxError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("undecodable message body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailSource {
    Gmail,
    Mock,
}

/// One email turned into a ticket candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailTicket {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub date: String,
    pub body: String,
    /// Subject and body, the text that gets classified.
    pub text: String,
    pub source: MailSource,
}

impl MailTicket {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        from: impl Into<String>,
        date: impl Into<String>,
        body: impl Into<String>,
        source: MailSource,
    ) -> Self {
        let subject = subject.into();
        let body = body.into();
        Self {
            id: id.into(),
            text: format!("{subject}\n\n{body}"),
            subject,
            from: from.into(),
            date: date.into(),
            body,
            source,
        }
    }

    pub fn to_ticket(&self) -> TicketInput {
        TicketInput::new(self.text.clone())
            .with_id(self.id.clone())
            .with_subject(self.subject.clone())
            .with_sender(self.from.clone())
    }
}

/// Result of one mailbox poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxOutcome {
    pub success: bool,
    pub tickets: Vec<MailTicket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
}

impl MailboxOutcome {
    pub fn fetched(tickets: Vec<MailTicket>) -> Self {
        Self {
            success: true,
            tickets,
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
}

/// Reads support requests from a mailbox. Failures are reported in the outcome.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// True when backed by a real mailbox.
    fn is_configured(&self) -> bool;

    async fn fetch_tickets(&self, query: &str, max_results: u32) -> MailboxOutcome;
}

/// Mailbox holding three canned requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockMailbox;

impl MockMailbox {
    pub fn tickets() -> Vec<MailTicket> {
        let date = chrono::Utc::now().to_rfc2822();
        vec![
            MailTicket::new(
                "mock-1",
                "Billing Issue - Payment Failed",
                "customer@example.com",
                date.clone(),
                "I tried to make a payment but it failed. My card was charged but the service shows as unpaid.",
                MailSource::Mock,
            ),
            MailTicket::new(
                "mock-2",
                "Cannot Access Dashboard",
                "user@example.com",
                date.clone(),
                "I cannot log into my account. I keep getting an authentication error.",
                MailSource::Mock,
            ),
            MailTicket::new(
                "mock-3",
                "API Integration Help",
                "developer@example.com",
                date,
                "I need help integrating your API into my application. The documentation is unclear about authentication.",
                MailSource::Mock,
            ),
        ]
    }
}

#[async_trait]
impl Mailbox for MockMailbox {
    fn is_configured(&self) -> bool {
        false
    }

    async fn fetch_tickets(&self, query: &str, max_results: u32) -> MailboxOutcome {
        let mut tickets = Self::tickets();
        tickets.truncate(max_results as usize);
        info!(query, count = tickets.len(), "returning mock tickets");
        MailboxOutcome {
            mock: true,
            ..MailboxOutcome::fetched(tickets)
        }
    }
}

/// Real Gmail client when OAuth credentials are configured, mock otherwise.
pub fn from_config(config: &GmailConfig) -> Arc<dyn Mailbox> {
    if let Some(client) = remote(config) {
        return client;
    }
    if config.credentials().is_some() {
        warn!("Gmail credentials set but remote clients are not compiled in, using mock mode");
    } else {
        warn!("Gmail credentials not configured, using mock mode");
    }
    Arc::new(MockMailbox)
}

#[cfg(feature = "http")]
fn remote(config: &GmailConfig) -> Option<Arc<dyn Mailbox>> {
    crate::gmail::GmailClient::new(config).map(|c| Arc::new(c) as Arc<dyn Mailbox>)
}

#[cfg(not(feature = "http"))]
fn remote(_config: &GmailConfig) -> Option<Arc<dyn Mailbox>> {
    None
}
