//! The classification-and-routing pipeline.
//!
//! Validation, classification and policy lookup are fatal: on failure no
//! collaborator is contacted. Issue creation and notification are
//! independent side effects whose failures are recorded in the result. A
//! notification is sent even when issue creation failed, and nothing is
//! rolled back.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use triage_ai::ClassifierHandle;
use triage_core::{
    ClassificationResult, IssueOutcome, RoutingPolicy, RoutingResult, TicketInput, TriageError,
    validate_text,
};
use triage_services::{IssueLink, IssueRequest, Services, TicketNotification};
use uuid::Uuid;

/// Label attached to every issue this service creates.
pub const TRIAGE_LABEL: &str = "ai-triaged";

fn enabled() -> bool {
    true
}

/// A ticket plus the side effects to perform for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(flatten)]
    pub ticket: TicketInput,
    #[serde(default = "enabled")]
    pub create_jira: bool,
    #[serde(default = "enabled")]
    pub send_slack: bool,
}

impl From<TicketInput> for RouteRequest {
    fn from(ticket: TicketInput) -> Self {
        Self {
            ticket,
            create_jira: true,
            send_slack: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub processed: usize,
    pub results: Vec<RoutingResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    #[serde(default)]
    pub include_suggestion: bool,
    #[serde(default)]
    pub include_summary: bool,
}

/// Classification, optionally with a generated reply and summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyResponse {
    #[serde(flatten)]
    pub classification: ClassificationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

pub struct TicketRouter {
    classifier: ClassifierHandle,
    policy: RoutingPolicy,
    services: Services,
}

impl TicketRouter {
    pub fn new(classifier: ClassifierHandle, policy: RoutingPolicy, services: Services) -> Self {
        Self {
            classifier,
            policy,
            services,
        }
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Classify one text and, on request, draft a reply and a summary.
    pub async fn classify(&self, request: &ClassifyRequest) -> Result<ClassifyResponse, TriageError> {
        let classification = self.classifier.classify(&request.text).await?;
        let summarizer = &self.services.summarizer;

        let suggestion = if request.include_suggestion {
            let reply = summarizer
                .suggest_reply(&request.text, classification.category)
                .await;
            Some(reply.text)
        } else {
            None
        };
        let summary = if request.include_summary {
            Some(summarizer.summarize(&request.text).await.text)
        } else {
            None
        };

        info!(
            category = %classification.category,
            confidence = classification.confidence,
            "classified ticket"
        );
        Ok(ClassifyResponse {
            classification,
            suggestion,
            summary,
        })
    }

    /// Classify a ticket, look up its policy, then create an issue and send a
    /// notification as requested.
    pub async fn route(
        &self,
        ticket: TicketInput,
        create_issue: bool,
        send_notification: bool,
    ) -> Result<RoutingResult, TriageError> {
        validate_text(&ticket.text)?;
        let ticket_id = ticket
            .ticket_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let classification = self.classifier.classify(&ticket.text).await?;
        let category = classification.category;
        let policy = self.policy.lookup(category)?.clone();

        let jira_issue = if create_issue {
            let summary = ticket
                .subject
                .clone()
                .unwrap_or_else(|| format!("{} Ticket: {ticket_id}", category.title()));
            let mut description = format!("Ticket ID: {ticket_id}\n\n{}", ticket.text);
            if let Some(email) = &ticket.from_email {
                description.push_str(&format!("\n\nFrom: {email}"));
            }
            let request = IssueRequest::new(summary, description)
                .with_priority(policy.jira_priority)
                .with_labels([category.as_str(), TRIAGE_LABEL]);
            let outcome = self.services.issues.create_issue(&request).await;
            if !outcome.success {
                warn!(ticket_id = %ticket_id, error = ?outcome.error, "issue creation failed");
            }
            Some(outcome)
        } else {
            None
        };

        let slack_message = if send_notification {
            let notification = TicketNotification {
                ticket_id: ticket_id.clone(),
                category,
                summary: ticket
                    .subject
                    .clone()
                    .unwrap_or_else(|| format!("Ticket {ticket_id}")),
                channel: policy.slack_channel.clone(),
                issue: jira_issue.as_ref().and_then(issue_link),
            };
            let outcome = self.services.notifier.send_ticket_notification(&notification).await;
            if !outcome.success {
                warn!(ticket_id = %ticket_id, error = ?outcome.error, "notification failed");
            }
            Some(outcome)
        } else {
            None
        };

        info!(
            ticket_id = %ticket_id,
            category = %category,
            priority = %policy.jira_priority,
            channel = %policy.slack_channel,
            "routed ticket"
        );
        Ok(RoutingResult {
            ticket_id,
            classification,
            jira_issue,
            slack_message,
            routing_config: policy,
        })
    }

    /// Route tickets one after another. The first fatal error aborts the batch.
    pub async fn route_batch(&self, requests: Vec<RouteRequest>) -> Result<BatchResult, TriageError> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let result = self
                .route(request.ticket, request.create_jira, request.send_slack)
                .await?;
            results.push(result);
        }
        info!(processed = results.len(), "routed batch");
        Ok(BatchResult {
            processed: results.len(),
            results,
        })
    }
}

fn issue_link(outcome: &IssueOutcome) -> Option<IssueLink> {
    Some(IssueLink {
        key: outcome.created_key()?.to_string(),
        url: outcome.url.clone().unwrap_or_default(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use triage_ai::ClassifierError;
    use triage_core::{Category, NotificationOutcome, Priority, Settings};
    use triage_services::{ChatMessage, IssueTracker, IssueUpdate, Notifier};

    /// Tracker that records requests and always fails.
    #[derive(Default)]
    pub struct FailingTracker {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl IssueTracker for FailingTracker {
        fn is_configured(&self) -> bool {
            true
        }

        async fn create_issue(&self, _request: &IssueRequest) -> IssueOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            IssueOutcome::failed("Jira returned 503: unavailable")
        }

        async fn update_issue(&self, _key: &str, _update: &IssueUpdate) -> IssueOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            IssueOutcome::failed("Jira returned 503: unavailable")
        }
    }

    /// Notifier that records every message and succeeds.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub messages: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn is_configured(&self) -> bool {
            true
        }

        async fn post_message(&self, message: &ChatMessage) -> NotificationOutcome {
            self.messages.lock().unwrap().push(message.clone());
            NotificationOutcome::posted(message.channel.clone().unwrap_or_default(), "1.1")
        }
    }

    /// Notifier that counts posts and always fails.
    #[derive(Default)]
    pub struct FailingNotifier {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        fn is_configured(&self) -> bool {
            true
        }

        async fn post_message(&self, _message: &ChatMessage) -> NotificationOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            NotificationOutcome::failed("channel_not_found")
        }
    }

    pub fn mock_router() -> TicketRouter {
        TicketRouter::new(
            ClassifierHandle::default(),
            RoutingPolicy::default(),
            Services::mock(&Settings::default()),
        )
    }

    pub fn broken_classifier() -> ClassifierHandle {
        ClassifierHandle::lazy("ticket-bert", || {
            Err(ClassifierError::Load("model.onnx not found".into()))
        })
    }

    #[tokio::test]
    async fn routes_billing_ticket_with_mocks() {
        let router = mock_router();
        let ticket = TicketInput::new("Billing issue with my invoice").with_id("TEST-001");
        let result = router.route(ticket, true, true).await.unwrap();

        assert_eq!(result.ticket_id, "TEST-001");
        assert_eq!(result.classification.category, Category::Billing);
        assert_eq!(result.routing_config.jira_priority, Priority::High);
        assert_eq!(result.routing_config.slack_channel, "#billing");

        let issue = result.jira_issue.unwrap();
        assert!(issue.success && issue.mock);
        let slack = result.slack_message.unwrap();
        assert!(slack.success && slack.mock);
        assert_eq!(slack.channel.as_deref(), Some("#billing"));
    }

    #[tokio::test]
    async fn flags_skip_side_effects() {
        let router = mock_router();
        let result = router
            .route(TicketInput::new("I cannot access my account"), false, false)
            .await
            .unwrap();
        assert_eq!(result.classification.category, Category::Access);
        assert!(result.jira_issue.is_none());
        assert!(result.slack_message.is_none());
    }

    #[tokio::test]
    async fn missing_ticket_id_is_generated() {
        let router = mock_router();
        let a = router.route(TicketInput::new("help"), false, false).await.unwrap();
        let b = router
            .route(TicketInput::new("help").with_id("  "), false, false)
            .await
            .unwrap();
        assert!(Uuid::parse_str(&a.ticket_id).is_ok());
        assert!(Uuid::parse_str(&b.ticket_id).is_ok());
        assert_ne!(a.ticket_id, b.ticket_id);
    }

    #[tokio::test]
    async fn issue_failure_does_not_block_notification() {
        let tracker = Arc::new(FailingTracker::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut services = Services::mock(&Settings::default());
        services.issues = tracker.clone();
        services.notifier = notifier.clone();
        let router = TicketRouter::new(
            ClassifierHandle::default(),
            RoutingPolicy::default(),
            services,
        );

        let result = router
            .route(
                TicketInput::new("Refund my payment").with_id("T-9"),
                true,
                true,
            )
            .await
            .unwrap();

        let issue = result.jira_issue.unwrap();
        assert!(!issue.success);
        assert!(issue.error.unwrap().contains("503"));
        assert!(result.slack_message.unwrap().success);
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 1);

        // No issue key to link.
        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "New billing ticket: Ticket T-9");
        assert_eq!(messages[0].blocks.len(), 3);
    }

    #[tokio::test]
    async fn notification_failure_keeps_created_issue() {
        let notifier = Arc::new(FailingNotifier::default());
        let mut services = Services::mock(&Settings::default());
        services.notifier = notifier.clone();
        let router = TicketRouter::new(
            ClassifierHandle::default(),
            RoutingPolicy::default(),
            services,
        );

        let result = router
            .route(
                TicketInput::new("I cannot access my account").with_id("T-10"),
                true,
                true,
            )
            .await
            .unwrap();

        assert_eq!(result.classification.category, Category::Access);
        let issue = result.jira_issue.unwrap();
        assert!(issue.success);
        assert!(issue.created_key().is_some());
        let message = result.slack_message.unwrap();
        assert!(!message.success);
        assert_eq!(message.error.as_deref(), Some("channel_not_found"));
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn issue_details_follow_ticket_and_policy() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut services = Services::mock(&Settings::default());
        services.notifier = notifier.clone();
        let router = TicketRouter::new(
            ClassifierHandle::default(),
            RoutingPolicy::default(),
            services,
        );

        let ticket = TicketInput::new("The app crash is a defect")
            .with_id("T-7")
            .with_subject("Crash on save")
            .with_sender("dev@example.com");
        let result = router.route(ticket, true, true).await.unwrap();
        let key = result.jira_issue.as_ref().unwrap().created_key().unwrap().to_string();

        let messages = notifier.messages.lock().unwrap();
        let message = &messages[0];
        assert_eq!(
            message.channel.as_deref(),
            Some(result.routing_config.slack_channel.as_str())
        );
        assert!(message.text.starts_with(&format!(
            "New {} ticket: Crash on save",
            result.classification.category
        )));
        assert!(message.text.ends_with(&format!("(Jira: {key})")));
        assert_eq!(message.blocks.len(), 4);
    }

    #[tokio::test]
    async fn classification_failure_contacts_nobody() {
        let tracker = Arc::new(FailingTracker::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let mut services = Services::mock(&Settings::default());
        services.issues = tracker.clone();
        services.notifier = notifier.clone();
        let router = TicketRouter::new(broken_classifier(), RoutingPolicy::default(), services);

        let err = router
            .route(TicketInput::new("Refund my payment"), true, true)
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Classification(_)));
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 0);
        assert!(notifier.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let err = mock_router()
            .route(TicketInput::new(" \n"), true, true)
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
    }

    #[tokio::test]
    async fn batch_routes_in_order() {
        let router = mock_router();
        let requests = vec![
            RouteRequest::from(TicketInput::new("Billing issue with my invoice").with_id("A")),
            RouteRequest {
                create_jira: false,
                ..RouteRequest::from(TicketInput::new("I cannot access my account").with_id("B"))
            },
        ];
        let batch = router.route_batch(requests).await.unwrap();
        assert_eq!(batch.processed, 2);
        assert_eq!(batch.results[0].ticket_id, "A");
        assert_eq!(batch.results[1].classification.category, Category::Access);
        assert!(batch.results[1].jira_issue.is_none());
    }

    #[tokio::test]
    async fn batch_aborts_on_fatal_error() {
        let router = mock_router();
        let requests = vec![
            RouteRequest::from(TicketInput::new("ok")),
            RouteRequest::from(TicketInput::new("")),
        ];
        let err = router.route_batch(requests).await.unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
    }

    #[tokio::test]
    async fn classify_adds_generated_text_on_request() {
        let router = mock_router();
        let plain = router
            .classify(&ClassifyRequest {
                text: "I cannot access my account".into(),
                include_suggestion: false,
                include_summary: false,
            })
            .await
            .unwrap();
        assert_eq!(plain.classification.category, Category::Access);
        assert!(plain.suggestion.is_none() && plain.summary.is_none());

        let full = router
            .classify(&ClassifyRequest {
                text: "I cannot access my account".into(),
                include_suggestion: true,
                include_summary: true,
            })
            .await
            .unwrap();
        assert!(full.suggestion.unwrap().starts_with("Thank you for contacting us."));
        assert!(full.summary.unwrap().starts_with("Customer experiencing issue"));
    }

    #[test]
    fn route_request_defaults_enable_side_effects() {
        let request: RouteRequest =
            serde_json::from_str(r#"{"text": "help", "ticket_id": "X-1"}"#).unwrap();
        assert!(request.create_jira && request.send_slack);
        assert_eq!(request.ticket.ticket_id.as_deref(), Some("X-1"));
    }
}
