//! Slack Web API client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use triage_core::NotificationOutcome;
use triage_core::config::SlackConfig;

use crate::notify::{ChatMessage, NotificationError, Notifier};

pub struct SlackClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    default_channel: String,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    channel: Option<String>,
    ts: Option<String>,
    error: Option<String>,
}

impl SlackClient {
    /// `None` unless a bot token is set.
    pub fn new(config: &SlackConfig) -> Option<Self> {
        let token = config.token()?;
        info!(default_channel = %config.default_channel, "Slack client configured");
        Some(Self {
            client: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            default_channel: config.default_channel.clone(),
        })
    }

    async fn try_post(&self, message: &ChatMessage) -> Result<NotificationOutcome, NotificationError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let channel = message.channel.as_deref().unwrap_or(&self.default_channel);
        let mut payload = json!({ "channel": channel, "text": message.text });
        if !message.blocks.is_empty() {
            payload["blocks"] = json!(message.blocks);
        }
        if let Some(ts) = &message.thread_ts {
            payload["thread_ts"] = json!(ts);
        }

        info!(url = %url, channel, "posting Slack message");
        let resp: PostMessageResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;
        if !resp.ok {
            return Err(NotificationError::Api(
                resp.error.unwrap_or_else(|| "Unknown error".into()),
            ));
        }

        info!(channel, "sent Slack message");
        Ok(NotificationOutcome::posted(
            resp.channel.unwrap_or_else(|| channel.to_string()),
            resp.ts.unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl Notifier for SlackClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn post_message(&self, message: &ChatMessage) -> NotificationOutcome {
        self.try_post(message).await.unwrap_or_else(|e| {
            error!(error = %e, "failed to send Slack message");
            NotificationOutcome::failed(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;
    use crate::notify::TicketNotification;
    use axum::Json;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use triage_core::Category;

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    async fn post_message(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let channel = body["channel"].clone();
        seen.lock().unwrap().push((auth, body));
        Json(json!({"ok": true, "channel": channel, "ts": "1700000000.000100"}))
    }

    async fn slack(router: axum::Router) -> SlackClient {
        let base = fake::serve(router).await;
        SlackClient::new(&SlackConfig {
            bot_token: Some("xoxb-test".into()),
            api_url: base,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_ticket_notification() {
        let seen: Seen = Arc::default();
        let client = slack(
            axum::Router::new()
                .route("/chat.postMessage", post(post_message))
                .with_state(seen.clone()),
        )
        .await;

        let notification = TicketNotification {
            ticket_id: "TEST-001".into(),
            category: Category::Billing,
            summary: "Refund request".into(),
            channel: "#billing".into(),
            issue: None,
        };
        let outcome = client.send_ticket_notification(&notification).await;
        assert!(outcome.success);
        assert!(!outcome.mock);
        assert_eq!(outcome.channel.as_deref(), Some("#billing"));
        assert_eq!(outcome.ts.as_deref(), Some("1700000000.000100"));

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth, "Bearer xoxb-test");
        assert_eq!(body["text"], "New billing ticket: Refund request");
        assert_eq!(body["blocks"].as_array().unwrap().len(), 3);
        assert!(body.get("thread_ts").is_none());
    }

    #[tokio::test]
    async fn default_channel_and_thread() {
        let seen: Seen = Arc::default();
        let client = slack(
            axum::Router::new()
                .route("/chat.postMessage", post(post_message))
                .with_state(seen.clone()),
        )
        .await;

        let outcome = client
            .post_message(&ChatMessage::new("follow-up").in_thread("1.2"))
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.channel.as_deref(), Some("#support-tickets"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].1["thread_ts"], "1.2");
        assert!(seen[0].1.get("blocks").is_none());
    }

    #[tokio::test]
    async fn not_ok_is_failure() {
        let client = slack(axum::Router::new().route(
            "/chat.postMessage",
            post(|| async { Json(json!({"ok": false, "error": "channel_not_found"})) }),
        ))
        .await;
        let outcome = client.post_message(&ChatMessage::new("x")).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Slack API error: channel_not_found")
        );
    }

    #[tokio::test]
    async fn missing_error_field_is_unknown_error() {
        let client = slack(axum::Router::new().route(
            "/chat.postMessage",
            post(|| async { Json(json!({"ok": false})) }),
        ))
        .await;
        let outcome = client.post_message(&ChatMessage::new("x")).await;
        assert_eq!(outcome.error.as_deref(), Some("Slack API error: Unknown error"));
    }
}
