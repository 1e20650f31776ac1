//! Shared application state.

use triage_ai::ClassifierHandle;
use triage_core::{RoutingPolicy, Settings, TriageError};
use triage_services::Services;

use crate::router::TicketRouter;

pub struct AppState {
    pub router: TicketRouter,
}

impl AppState {
    pub fn new(router: TicketRouter) -> Self {
        Self { router }
    }

    /// Build everything from configuration. Fails only on a bad routing file.
    pub fn from_settings(settings: &Settings) -> Result<Self, TriageError> {
        let policy = match &settings.routing_config {
            Some(path) => RoutingPolicy::load(path)?,
            None => RoutingPolicy::with_default_channel(&settings.slack.default_channel),
        };
        let router = TicketRouter::new(
            ClassifierHandle::from_config(&settings.model),
            policy,
            Services::from_settings(settings),
        );
        Ok(Self::new(router))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{Category, Priority};
    use triage_core::config::ModelBackend;
    use triage_core::policy::DEFAULT_CHANNEL;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.model.backend = ModelBackend::Keyword;
        settings
    }

    #[test]
    fn default_channel_follows_slack_config() {
        let mut settings = settings();
        settings.slack.default_channel = "#triage".into();
        let state = AppState::from_settings(&settings).unwrap();
        let policy = state.router.policy();
        assert_eq!(policy.lookup(Category::BugReport).unwrap().slack_channel, "#triage");
        assert_eq!(policy.lookup(Category::Billing).unwrap().slack_channel, "#billing");
    }

    #[test]
    fn empty_default_channel_keeps_every_channel_set() {
        let mut settings = settings();
        settings.slack.default_channel = String::new();
        let state = AppState::from_settings(&settings).unwrap();
        for (category, entry) in state.router.policy().iter() {
            assert!(!entry.slack_channel.is_empty(), "{category} has no channel");
        }
        assert_eq!(
            state.router.policy().lookup(Category::FeatureRequest).unwrap().slack_channel,
            DEFAULT_CHANNEL
        );
    }

    #[test]
    fn routing_file_replaces_table() {
        let path = std::env::temp_dir().join(format!("routing-{}.json", std::process::id()));
        let entries: serde_json::Map<String, serde_json::Value> = Category::ALL
            .iter()
            .map(|c| {
                (
                    c.as_str().to_string(),
                    serde_json::json!({"jira_priority": "Low", "slack_channel": "#all"}),
                )
            })
            .collect();
        std::fs::write(&path, serde_json::Value::Object(entries).to_string()).unwrap();

        let mut settings = settings();
        settings.routing_config = Some(path.clone());
        let state = AppState::from_settings(&settings).unwrap();
        let entry = state.router.policy().lookup(Category::Billing).unwrap();
        assert_eq!(entry.jira_priority, Priority::Low);
        assert_eq!(entry.slack_channel, "#all");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn incomplete_routing_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("routing-partial-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r##"{"billing": {"jira_priority": "High", "slack_channel": "#billing"}}"##,
        )
        .unwrap();

        let mut settings = settings();
        settings.routing_config = Some(path.clone());
        let err = AppState::from_settings(&settings).err().unwrap();
        assert!(matches!(err, TriageError::RoutingConfig(ref m) if m.contains("technical")));
        std::fs::remove_file(path).unwrap();
    }
}
