//! Gmail API client: OAuth refresh-token exchange, message listing and parsing.

use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use tracing::{error, info, warn};
use triage_core::config::GmailConfig;

use crate::mailbox::{MailSource, MailTicket, Mailbox, MailboxError, MailboxOutcome};

/// Gmail emits URL-safe base64, with or without padding.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub struct GmailClient {
    client: reqwest::Client,
    api_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct Message {
    id: String,
    payload: Part,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Body,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize, Default)]
struct Body {
    data: Option<String>,
}

impl GmailClient {
    /// `None` unless client id, client secret and refresh token are all set.
    pub fn new(config: &GmailConfig) -> Option<Self> {
        let (client_id, client_secret, refresh_token) = config.credentials()?;
        info!("Gmail client configured");
        Some(Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
        })
    }

    async fn access_token(&self) -> Result<String, MailboxError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailboxError::Auth(format!("{}: {body}", status.as_u16())));
        }
        let token: TokenResponse = resp.json().await?;
        Ok(token.access_token)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T, MailboxError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailboxError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn try_fetch(&self, query: &str, max_results: u32) -> Result<Vec<MailTicket>, MailboxError> {
        let token = self.access_token().await?;
        let url = format!("{}/users/me/messages", self.api_url);
        info!(url = %url, query, max_results, "listing Gmail messages");
        let list: MessageList = self
            .get(
                &url,
                &token,
                &[("q", query.to_string()), ("maxResults", max_results.to_string())],
            )
            .await?;

        let mut tickets = Vec::with_capacity(list.messages.len());
        for message in list.messages {
            let url = format!("{}/users/me/messages/{}", self.api_url, message.id);
            let parsed = self
                .get::<Message>(&url, &token, &[("format", "full".to_string())])
                .await
                .and_then(parse_message);
            match parsed {
                Ok(ticket) => tickets.push(ticket),
                Err(e) => warn!(id = %message.id, error = %e, "skipping unparseable message"),
            }
        }
        info!(count = tickets.len(), "fetched tickets from Gmail");
        Ok(tickets)
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch_tickets(&self, query: &str, max_results: u32) -> MailboxOutcome {
        match self.try_fetch(query, max_results).await {
            Ok(tickets) => MailboxOutcome::fetched(tickets),
            Err(e) => {
                error!(error = %e, "failed to fetch Gmail tickets");
                MailboxOutcome::failed(e)
            }
        }
    }
}

fn parse_message(message: Message) -> Result<MailTicket, MailboxError> {
    let header = |name: &str| {
        message
            .payload
            .headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.clone())
    };
    let subject = header("Subject").unwrap_or_else(|| "No Subject".into());
    let from = header("From").unwrap_or_else(|| "Unknown".into());
    let date = header("Date").unwrap_or_default();
    let body = extract_body(&message.payload)?;
    Ok(MailTicket::new(
        message.id,
        subject,
        from,
        date,
        body,
        MailSource::Gmail,
    ))
}

/// Concatenated `text/plain` parts, or the payload itself when it is plain text.
fn extract_body(payload: &Part) -> Result<String, MailboxError> {
    if !payload.parts.is_empty() {
        let mut body = String::new();
        for part in payload.parts.iter().filter(|p| p.mime_type == "text/plain") {
            body.push_str(&decode(part)?);
        }
        return Ok(body);
    }
    if payload.mime_type == "text/plain" {
        return decode(payload);
    }
    Ok(String::new())
}

fn decode(part: &Part) -> Result<String, MailboxError> {
    let Some(data) = &part.body.data else {
        return Ok(String::new());
    };
    let bytes = BODY_ENGINE
        .decode(data)
        .map_err(|e| MailboxError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| MailboxError::Decode(e.to_string()))
}
