//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::{ArgAction, Args};
use triage_core::Settings;
use triage_core::config::{
    DEFAULT_JIRA_PROJECT, DEFAULT_JIRA_URL, DEFAULT_MODEL_CACHE_DIR, DEFAULT_MODEL_NAME,
    DEFAULT_WATSONX_MODEL, DEFAULT_WATSONX_URL, GmailConfig, JiraConfig, ModelBackend,
    ModelConfig, SlackConfig, WatsonxConfig,
};
use triage_core::policy::DEFAULT_CHANNEL;

/// Service configuration. Every option can also be set from the environment.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    // ── Jira ──
    #[arg(long, env = "JIRA_URL", default_value = DEFAULT_JIRA_URL, global = true)]
    pub jira_url: String,
    #[arg(long, env = "JIRA_EMAIL", global = true)]
    pub jira_email: Option<String>,
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true, global = true)]
    pub jira_api_token: Option<String>,
    #[arg(long, env = "JIRA_PROJECT_KEY", default_value = DEFAULT_JIRA_PROJECT, global = true)]
    pub jira_project_key: String,

    // ── Slack ──
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true, global = true)]
    pub slack_bot_token: Option<String>,
    /// Channel for categories without a dedicated one.
    #[arg(long, env = "SLACK_CHANNEL_ID", default_value = DEFAULT_CHANNEL, global = true)]
    pub slack_channel_id: String,

    // ── Gmail ──
    #[arg(long, env = "GMAIL_CLIENT_ID", global = true)]
    pub gmail_client_id: Option<String>,
    #[arg(long, env = "GMAIL_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub gmail_client_secret: Option<String>,
    #[arg(long, env = "GMAIL_REFRESH_TOKEN", hide_env_values = true, global = true)]
    pub gmail_refresh_token: Option<String>,

    // ── watsonx.ai ──
    #[arg(long, env = "WATSONX_API_KEY", hide_env_values = true, global = true)]
    pub watsonx_api_key: Option<String>,
    #[arg(long, env = "WATSONX_URL", default_value = DEFAULT_WATSONX_URL, global = true)]
    pub watsonx_url: String,
    #[arg(long, env = "WATSONX_PROJECT_ID", global = true)]
    pub watsonx_project_id: Option<String>,
    #[arg(long, env = "WATSONX_MODEL_ID", default_value = DEFAULT_WATSONX_MODEL, global = true)]
    pub watsonx_model_id: String,

    // ── Classifier ──
    #[arg(long, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME, global = true)]
    pub model_name: String,
    #[arg(long, env = "MODEL_CACHE_DIR", default_value = DEFAULT_MODEL_CACHE_DIR, global = true)]
    pub model_cache_dir: PathBuf,
    /// auto, onnx or keyword.
    #[arg(long, env = "MODEL_BACKEND", default_value = "auto", global = true)]
    pub model_backend: ModelBackend,

    /// JSON file replacing the built-in category routing table.
    #[arg(long, env = "ROUTING_CONFIG", global = true)]
    pub routing_config: Option<PathBuf>,

    /// Verbose logging. Only `true`, in any case, enables it.
    #[arg(
        long,
        env = "DEBUG",
        global = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_flag,
    )]
    pub debug: bool,
}

/// Lenient boolean: anything but a case-insensitive `true` is false.
fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

impl ConfigArgs {
    pub fn settings(&self) -> Settings {
        Settings {
            jira: JiraConfig {
                url: self.jira_url.clone(),
                email: self.jira_email.clone(),
                api_token: self.jira_api_token.clone(),
                project_key: self.jira_project_key.clone(),
            },
            slack: SlackConfig {
                bot_token: self.slack_bot_token.clone(),
                default_channel: self.slack_channel_id.clone(),
                ..Default::default()
            },
            gmail: GmailConfig {
                client_id: self.gmail_client_id.clone(),
                client_secret: self.gmail_client_secret.clone(),
                refresh_token: self.gmail_refresh_token.clone(),
                ..Default::default()
            },
            watsonx: WatsonxConfig {
                api_key: self.watsonx_api_key.clone(),
                url: self.watsonx_url.clone(),
                project_id: self.watsonx_project_id.clone(),
                model_id: self.watsonx_model_id.clone(),
                ..Default::default()
            },
            model: ModelConfig {
                name: self.model_name.clone(),
                cache_dir: self.model_cache_dir.clone(),
                backend: self.model_backend,
            },
            routing_config: self.routing_config.clone(),
            debug: self.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values_never_fail() {
        for (value, expected) in [
            ("true", true),
            ("TRUE", true),
            ("True", true),
            ("false", false),
            ("False", false),
            ("1", false),
            ("0", false),
            ("", false),
        ] {
            assert_eq!(parse_flag(value), Ok(expected), "{value:?}");
        }
    }
}
