//! Jira Cloud REST v3 client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};
use triage_core::IssueOutcome;
use triage_core::config::JiraConfig;

use crate::issues::{IssueCreationError, IssueRequest, IssueTracker, IssueUpdate};

pub struct JiraClient {
    client: reqwest::Client,
    config: JiraConfig,
    email: String,
    api_token: String,
}

#[derive(Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

impl JiraClient {
    /// `None` unless both the account email and the API token are set.
    pub fn new(config: &JiraConfig) -> Option<Self> {
        let (email, api_token) = config.credentials()?;
        info!(url = config.base_url(), project = %config.project_key, "Jira client configured");
        Some(Self {
            client: reqwest::Client::new(),
            email: email.to_string(),
            api_token: api_token.to_string(),
            config: config.clone(),
        })
    }

    async fn try_create(&self, request: &IssueRequest) -> Result<IssueOutcome, IssueCreationError> {
        let url = format!("{}/rest/api/3/issue", self.config.base_url());
        let mut fields = json!({
            "project": { "key": self.config.project_key },
            "summary": request.summary,
            "description": document(&request.description),
            "issuetype": { "name": request.issue_type },
            "priority": { "name": request.priority.as_str() },
        });
        if !request.labels.is_empty() {
            fields["labels"] = json!(request.labels);
        }

        info!(url = %url, priority = %request.priority, "creating Jira issue");
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let status = resp.status();
        if status != reqwest::StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            return Err(IssueCreationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedIssue = resp.json().await?;
        info!(key = %created.key, "created Jira issue");
        let url = self.config.browse_url(&created.key);
        Ok(IssueOutcome::created(created.key, created.id, url))
    }

    async fn try_update(
        &self,
        issue_key: &str,
        update: &IssueUpdate,
    ) -> Result<IssueOutcome, IssueCreationError> {
        if update.is_empty() {
            return Err(IssueCreationError::EmptyUpdate);
        }
        let mut fields = serde_json::Map::new();
        if let Some(summary) = &update.summary {
            fields.insert("summary".into(), json!(summary));
        }
        if let Some(description) = &update.description {
            fields.insert("description".into(), document(description));
        }
        if let Some(priority) = update.priority {
            fields.insert("priority".into(), json!({ "name": priority.as_str() }));
        }

        let url = format!("{}/rest/api/3/issue/{issue_key}", self.config.base_url());
        info!(url = %url, "updating Jira issue");
        let resp = self
            .client
            .put(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .json(&json!({ "fields": fields }))
            .send()
            .await?;
        let status = resp.status();
        if status != reqwest::StatusCode::NO_CONTENT {
            let body = resp.text().await.unwrap_or_default();
            return Err(IssueCreationError::Server {
                status: status.as_u16(),
                body,
            });
        }
        info!(key = issue_key, "updated Jira issue");
        Ok(IssueOutcome::updated(issue_key))
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn create_issue(&self, request: &IssueRequest) -> IssueOutcome {
        self.try_create(request).await.unwrap_or_else(|e| {
            error!(error = %e, "failed to create Jira issue");
            IssueOutcome::failed(e)
        })
    }

    async fn update_issue(&self, issue_key: &str, update: &IssueUpdate) -> IssueOutcome {
        self.try_update(issue_key, update).await.unwrap_or_else(|e| {
            error!(key = issue_key, error = %e, "failed to update Jira issue");
            IssueOutcome::failed(e)
        })
    }
}

/// Plain text as a single-paragraph Atlassian Document Format node.
fn document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }],
        }],
    })
}
