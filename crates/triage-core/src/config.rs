//! Runtime configuration for the triage service.
//!
//! Values come from the environment (via the CLI's `clap` definitions) and are
//! read once at startup. A missing credential set is not an error: it selects
//! that collaborator's mock mode.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const APP_NAME: &str = "AI Triage Agent";
pub const DEFAULT_JIRA_URL: &str = "https://your-domain.atlassian.net";
pub const DEFAULT_JIRA_PROJECT: &str = "SUP";
pub const DEFAULT_WATSONX_URL: &str = "https://us-south.ml.cloud.ibm.com";
pub const DEFAULT_WATSONX_MODEL: &str = "meta-llama/llama-3-8b-instruct";
pub const DEFAULT_MODEL_NAME: &str = "bert-base-uncased";
pub const DEFAULT_MODEL_CACHE_DIR: &str = "./models";

/// Treat empty or whitespace-only values as unset.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub url: String,
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub project_key: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_JIRA_URL.into(),
            email: None,
            api_token: None,
            project_key: DEFAULT_JIRA_PROJECT.into(),
        }
    }
}

impl JiraConfig {
    /// `(email, api_token)` when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((present(&self.email)?, present(&self.api_token)?))
    }

    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn browse_url(&self, issue_key: &str) -> String {
        format!("{}/browse/{issue_key}", self.base_url())
    }
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: Option<String>,
    pub default_channel: String,
    /// Web API base, overridable for testing.
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            default_channel: crate::policy::DEFAULT_CHANNEL.into(),
            api_url: "https://slack.com/api".into(),
        }
    }
}

impl SlackConfig {
    pub fn token(&self) -> Option<&str> {
        present(&self.bot_token)
    }
}

#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub api_url: String,
    pub token_url: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_url: "https://gmail.googleapis.com/gmail/v1".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
        }
    }
}

impl GmailConfig {
    /// `(client_id, client_secret, refresh_token)` when all are set.
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            present(&self.client_id)?,
            present(&self.client_secret)?,
            present(&self.refresh_token)?,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct WatsonxConfig {
    pub api_key: Option<String>,
    pub url: String,
    pub project_id: Option<String>,
    pub model_id: String,
    pub iam_url: String,
}

impl Default for WatsonxConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_WATSONX_URL.into(),
            project_id: None,
            model_id: DEFAULT_WATSONX_MODEL.into(),
            iam_url: "https://iam.cloud.ibm.com/identity/token".into(),
        }
    }
}

impl WatsonxConfig {
    /// `(api_key, project_id)` when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((present(&self.api_key)?, present(&self.project_id)?))
    }
}

/// Which classifier implementation to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelBackend {
    /// ONNX model when compiled in and present on disk, keyword classifier otherwise.
    #[default]
    Auto,
    Onnx,
    Keyword,
}

impl fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Onnx => "onnx",
            Self::Keyword => "keyword",
        })
    }
}

impl FromStr for ModelBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "onnx" => Ok(Self::Onnx),
            "keyword" | "mock" => Ok(Self::Keyword),
            other => Err(format!(
                "unknown model backend '{other}' (expected auto, onnx, keyword)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub cache_dir: PathBuf,
    pub backend: ModelBackend,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.into(),
            cache_dir: PathBuf::from(DEFAULT_MODEL_CACHE_DIR),
            backend: ModelBackend::Auto,
        }
    }
}

impl ModelConfig {
    /// Directory expected to hold `model.onnx` and `tokenizer.json`.
    ///
    /// Hub-style names (`org/model`) map to nested directories.
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.name)
    }
}

/// Full service configuration.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub jira: JiraConfig,
    pub slack: SlackConfig,
    pub gmail: GmailConfig,
    pub watsonx: WatsonxConfig,
    pub model: ModelConfig,
    pub routing_config: Option<PathBuf>,
    pub debug: bool,
}
