//! IBM watsonx.ai text-generation client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use triage_core::config::WatsonxConfig;

use crate::generate::{GenerationError, GenerationOutcome, GenerationRequest, Summarizer};

const API_VERSION: &str = "2023-05-29";
const TEMPERATURE: f32 = 0.7;

pub struct WatsonxClient {
    client: reqwest::Client,
    base_url: String,
    iam_url: String,
    api_key: String,
    project_id: String,
    model_id: String,
}

#[derive(Deserialize)]
struct IamToken {
    access_token: String,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    results: Vec<GeneratedText>,
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

impl WatsonxClient {
    /// `None` unless both the API key and the project id are set.
    pub fn new(config: &WatsonxConfig) -> Option<Self> {
        let (api_key, project_id) = config.credentials()?;
        info!(url = %config.url, model = %config.model_id, "watsonx client configured");
        Some(Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            iam_url: config.iam_url.clone(),
            api_key: api_key.to_string(),
            project_id: project_id.to_string(),
            model_id: config.model_id.clone(),
        })
    }

    /// Exchange the API key for a bearer token.
    async fn access_token(&self) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(&self.iam_url)
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Auth(format!("{}: {body}", status.as_u16())));
        }
        let token: IamToken = resp.json().await?;
        Ok(token.access_token)
    }

    async fn try_generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/ml/v1/text/generation?version={API_VERSION}",
            self.base_url
        );
        let payload = json!({
            "model_id": self.model_id,
            "project_id": self.project_id,
            "input": request.prompt,
            "parameters": {
                "decoding_method": "greedy",
                "max_new_tokens": request.max_tokens,
                "temperature": TEMPERATURE,
            },
        });

        info!(url = %url, kind = ?request.kind, max_tokens = request.max_tokens, "generating text");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let generated: GenerationResponse = resp.json().await?;
        generated
            .results
            .into_iter()
            .next()
            .map(|r| r.generated_text)
            .ok_or(GenerationError::EmptyResult)
    }
}

#[async_trait]
impl Summarizer for WatsonxClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        match self.try_generate(request).await {
            Ok(text) => {
                info!(model = %self.model_id, "generated response");
                GenerationOutcome::generated(text, &self.model_id)
            }
            Err(e) => {
                error!(error = %e, "text generation failed");
                GenerationOutcome::failed(request.kind, &self.model_id, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;
    use crate::generate::PromptKind;
    use axum::Json;
    use axum::extract::{Form, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use triage_core::Category;

    type Seen = Arc<Mutex<Vec<Value>>>;

    async fn iam(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        if form.get("apikey").map(String::as_str) != Some("ibm-key") {
            return (StatusCode::BAD_REQUEST, Json(json!({"errorCode": "BXNIM0415E"})));
        }
        (StatusCode::OK, Json(json!({"access_token": "iam-token", "expires_in": 3600})))
    }

    async fn generation(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer iam-token")
            || !q.contains_key("version")
        {
            return (StatusCode::UNAUTHORIZED, Json(json!({"errors": []})));
        }
        seen.lock().unwrap().push(body);
        (
            StatusCode::OK,
            Json(json!({"results": [{"generated_text": " We are on it."}]})),
        )
    }

    async fn watsonx(api_key: &str) -> (WatsonxClient, Seen) {
        let seen: Seen = Arc::default();
        let router = axum::Router::new()
            .route("/identity/token", post(iam))
            .route("/ml/v1/text/generation", post(generation))
            .with_state(seen.clone());
        let base = fake::serve(router).await;
        let client = WatsonxClient::new(&WatsonxConfig {
            api_key: Some(api_key.into()),
            url: base.clone(),
            project_id: Some("proj-1".into()),
            model_id: "ibm/granite-13b-chat-v2".into(),
            iam_url: format!("{base}/identity/token"),
        })
        .unwrap();
        (client, seen)
    }

    #[tokio::test]
    async fn reply_uses_greedy_decoding() {
        let (client, seen) = watsonx("ibm-key").await;
        let outcome = client
            .suggest_reply("I was double charged", Category::Billing)
            .await;
        assert!(outcome.success);
        assert!(!outcome.mock);
        assert_eq!(outcome.text, " We are on it.");
        assert_eq!(outcome.model, "ibm/granite-13b-chat-v2");

        let seen = seen.lock().unwrap();
        let body = &seen[0];
        assert_eq!(body["project_id"], "proj-1");
        assert_eq!(body["parameters"]["decoding_method"], "greedy");
        assert_eq!(body["parameters"]["max_new_tokens"], 300);
        assert!(body["input"].as_str().unwrap().contains("billing support ticket"));
    }

    #[tokio::test]
    async fn auth_failure_falls_back_to_canned_text() {
        let (client, seen) = watsonx("wrong-key").await;
        let outcome = client.summarize("App crashes on save").await;
        assert!(!outcome.success);
        assert_eq!(outcome.text, PromptKind::Summary.mock_text());
        assert!(outcome.error.unwrap().starts_with("authentication failed"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_results_is_failure() {
        let router = axum::Router::new()
            .route("/identity/token", post(iam))
            .route(
                "/ml/v1/text/generation",
                post(|| async { Json(json!({"results": []})) }),
            );
        let base = fake::serve(router).await;
        let client = WatsonxClient::new(&WatsonxConfig {
            api_key: Some("ibm-key".into()),
            url: base.clone(),
            project_id: Some("proj-1".into()),
            iam_url: format!("{base}/identity/token"),
            ..Default::default()
        })
        .unwrap();

        let outcome = client
            .generate(&GenerationRequest::freeform("hello", 20))
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.text, PromptKind::Freeform.mock_text());
        assert_eq!(outcome.error.as_deref(), Some("no generated text in response"));
    }
}
