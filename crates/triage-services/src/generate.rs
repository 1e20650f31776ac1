//! Suggested replies and summaries from a hosted language model.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use triage_core::Category;
use triage_core::config::WatsonxConfig;

/// Model name reported by the mock summarizer.
pub const MOCK_MODEL: &str = "mock";

const REPLY_MAX_TOKENS: u32 = 300;
const SUMMARY_MAX_TOKENS: u32 = 150;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("watsonx returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("no generated text in response")]
    EmptyResult,
}

/// What a prompt asks for. Selects the canned text used when no model answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Reply,
    Summary,
    Freeform,
}

impl PromptKind {
    pub fn mock_text(self) -> &'static str {
        match self {
            Self::Reply => {
                "Thank you for contacting us. We understand your concern and will look into this matter promptly. Our team will get back to you within 24 hours."
            }
            Self::Summary => {
                "Customer experiencing issue with service. Requires immediate attention from support team."
            }
            Self::Freeform => {
                "This is a mock response. Please configure watsonx.ai credentials for actual AI-generated responses."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub kind: PromptKind,
}

impl GenerationRequest {
    pub fn freeform(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            kind: PromptKind::Freeform,
        }
    }

    /// Prompt for an agent reply to a ticket of the given category.
    pub fn reply(ticket_text: &str, category: Category) -> Self {
        Self {
            prompt: format!(
                "You are a helpful support agent. Generate a professional and empathetic \
                 response to this {category} support ticket.\n\nTicket:\n{ticket_text}\n\nResponse:"
            ),
            max_tokens: REPLY_MAX_TOKENS,
            kind: PromptKind::Reply,
        }
    }

    /// Prompt for a two-to-three sentence summary.
    pub fn summary(ticket_text: &str) -> Self {
        Self {
            prompt: format!(
                "Summarize this support ticket in 2-3 sentences, highlighting the key issue \
                 and urgency.\n\nTicket:\n{ticket_text}\n\nSummary:"
            ),
            max_tokens: SUMMARY_MAX_TOKENS,
            kind: PromptKind::Summary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub text: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationOutcome {
    pub fn generated(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Failed remote call. Still carries usable canned text for the prompt kind.
    pub fn failed(kind: PromptKind, model: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            text: kind.mock_text().into(),
            model: model.into(),
            mock: false,
            error: Some(error.to_string()),
        }
    }
}

/// Text generation. Failures are reported in the outcome.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// True when backed by a hosted model.
    fn is_configured(&self) -> bool;

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome;

    async fn suggest_reply(&self, ticket_text: &str, category: Category) -> GenerationOutcome {
        self.generate(&GenerationRequest::reply(ticket_text, category))
            .await
    }

    async fn summarize(&self, ticket_text: &str) -> GenerationOutcome {
        self.generate(&GenerationRequest::summary(ticket_text)).await
    }
}

/// Summarizer answering every prompt with the canned text for its kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        debug!(kind = ?request.kind, "mock generation");
        GenerationOutcome {
            mock: true,
            ..GenerationOutcome::generated(request.kind.mock_text(), MOCK_MODEL)
        }
    }
}

/// Real watsonx.ai client when an API key and project are configured, mock otherwise.
pub fn from_config(config: &WatsonxConfig) -> Arc<dyn Summarizer> {
    if let Some(client) = remote(config) {
        return client;
    }
    if config.credentials().is_some() {
        warn!("watsonx credentials set but remote clients are not compiled in, using mock mode");
    } else {
        warn!("watsonx credentials not configured, using mock mode");
    }
    Arc::new(MockSummarizer)
}

#[cfg(feature = "http")]
fn remote(config: &WatsonxConfig) -> Option<Arc<dyn Summarizer>> {
    crate::watsonx::WatsonxClient::new(config).map(|c| Arc::new(c) as Arc<dyn Summarizer>)
}

#[cfg(not(feature = "http"))]
fn remote(_config: &WatsonxConfig) -> Option<Arc<dyn Summarizer>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_prompt_names_category() {
        let request = GenerationRequest::reply("I was double charged", Category::Billing);
        assert_eq!(request.kind, PromptKind::Reply);
        assert_eq!(request.max_tokens, 300);
        assert!(request.prompt.contains("this billing support ticket"));
        assert!(request.prompt.ends_with("Ticket:\nI was double charged\n\nResponse:"));
    }

    #[test]
    fn summary_prompt() {
        let request = GenerationRequest::summary("App crashes");
        assert_eq!(request.kind, PromptKind::Summary);
        assert_eq!(request.max_tokens, 150);
        assert!(request.prompt.starts_with("Summarize this support ticket in 2-3 sentences"));
    }

    #[tokio::test]
    async fn mock_text_follows_prompt_kind() {
        let reply = MockSummarizer.suggest_reply("help", Category::Access).await;
        assert!(reply.success && reply.mock);
        assert_eq!(reply.model, MOCK_MODEL);
        assert!(reply.text.starts_with("Thank you for contacting us."));

        let summary = MockSummarizer.summarize("help").await;
        assert!(summary.text.starts_with("Customer experiencing issue"));

        // Wording of a freeform prompt does not change the canned answer.
        let freeform = MockSummarizer
            .generate(&GenerationRequest::freeform("please summarize a response", 50))
            .await;
        assert!(freeform.text.starts_with("This is a mock response."));
    }

    #[test]
    fn failure_carries_canned_text() {
        let outcome = GenerationOutcome::failed(PromptKind::Summary, "granite", "timeout");
        assert!(!outcome.success);
        assert!(!outcome.mock);
        assert_eq!(outcome.text, PromptKind::Summary.mock_text());
        assert_eq!(outcome.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn missing_project_selects_mock() {
        let config = WatsonxConfig {
            api_key: Some("key".into()),
            ..Default::default()
        };
        assert!(!from_config(&config).is_configured());
    }
}
