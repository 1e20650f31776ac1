//! Issue tracker capability and its offline stand-in.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use triage_core::config::JiraConfig;
use triage_core::{IssueOutcome, Priority};

/// Issue number assigned to the first mock issue of an adapter.
const FIRST_MOCK_ISSUE: u64 = 1001;

#[derive(Error, Debug)]
pub enum IssueCreationError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Jira returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("no fields to update")]
    EmptyUpdate,
}

/// A new issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub priority: Priority,
    pub labels: Vec<String>,
}

impl IssueRequest {
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
            issue_type: "Task".into(),
            priority: Priority::Medium,
            labels: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = issue_type.into();
        self
    }
}

/// Fields to change on an existing issue. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.description.is_none() && self.priority.is_none()
    }
}

/// Creates and updates issues. Failures are reported in the outcome.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// True when backed by a real tracker.
    fn is_configured(&self) -> bool;

    async fn create_issue(&self, request: &IssueRequest) -> IssueOutcome;

    async fn update_issue(&self, issue_key: &str, update: &IssueUpdate) -> IssueOutcome;
}

/// Tracker that fabricates sequential issue keys without touching the network.
#[derive(Debug)]
pub struct MockIssueTracker {
    config: JiraConfig,
    next: AtomicU64,
}

impl MockIssueTracker {
    pub fn new(config: &JiraConfig) -> Self {
        Self {
            config: config.clone(),
            next: AtomicU64::new(FIRST_MOCK_ISSUE),
        }
    }
}

#[async_trait]
impl IssueTracker for MockIssueTracker {
    fn is_configured(&self) -> bool {
        false
    }

    async fn create_issue(&self, request: &IssueRequest) -> IssueOutcome {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let key = format!("{}-{n}", self.config.project_key);
        debug!(key = %key, summary = %request.summary, "mock issue created");
        let url = self.config.browse_url(&key);
        IssueOutcome::created(key, format!("mock-{n}"), url).into_mock()
    }

    async fn update_issue(&self, issue_key: &str, update: &IssueUpdate) -> IssueOutcome {
        if update.is_empty() {
            return IssueOutcome::failed(IssueCreationError::EmptyUpdate).into_mock();
        }
        debug!(key = issue_key, "mock issue updated");
        IssueOutcome::updated(issue_key).into_mock()
    }
}

/// Real Jira client when credentials are configured, mock otherwise.
pub fn from_config(config: &JiraConfig) -> Arc<dyn IssueTracker> {
    if let Some(client) = remote(config) {
        return client;
    }
    if config.credentials().is_some() {
        warn!("Jira credentials set but remote clients are not compiled in, using mock mode");
    } else {
        warn!("Jira credentials not configured, using mock mode");
    }
    Arc::new(MockIssueTracker::new(config))
}

#[cfg(feature = "http")]
fn remote(config: &JiraConfig) -> Option<Arc<dyn IssueTracker>> {
    crate::jira::JiraClient::new(config).map(|c| Arc::new(c) as Arc<dyn IssueTracker>)
}

#[cfg(not(feature = "http"))]
fn remote(_config: &JiraConfig) -> Option<Arc<dyn IssueTracker>> {
    None
}
