//! Collaborator adapters: issue tracker, chat notifier, mailbox and summarizer.
//!
//! Each capability is a trait with a mock implementation that never touches
//! the network. Real clients are compiled in with the `http` feature and are
//! selected when their credentials are configured.

pub mod generate;
pub mod issues;
pub mod mailbox;
pub mod notify;

#[cfg(feature = "http")]
pub mod gmail;
#[cfg(feature = "http")]
pub mod jira;
#[cfg(feature = "http")]
pub mod slack;
#[cfg(feature = "http")]
pub mod watsonx;

use std::sync::Arc;

use triage_core::Settings;

pub use generate::{
    GenerationError, GenerationOutcome, GenerationRequest, MockSummarizer, PromptKind, Summarizer,
};
pub use issues::{IssueCreationError, IssueRequest, IssueTracker, IssueUpdate, MockIssueTracker};
pub use mailbox::{MailSource, MailTicket, Mailbox, MailboxError, MailboxOutcome, MockMailbox};
pub use notify::{
    ChatMessage, IssueLink, MockNotifier, NotificationError, Notifier, TicketNotification,
};

/// The full set of collaborators, chosen once at startup.
#[derive(Clone)]
pub struct Services {
    pub issues: Arc<dyn IssueTracker>,
    pub notifier: Arc<dyn Notifier>,
    pub mailbox: Arc<dyn Mailbox>,
    pub summarizer: Arc<dyn Summarizer>,
}

impl Services {
    /// Real clients where credentials are present, mocks elsewhere.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            issues: issues::from_config(&settings.jira),
            notifier: notify::from_config(&settings.slack),
            mailbox: mailbox::from_config(&settings.gmail),
            summarizer: generate::from_config(&settings.watsonx),
        }
    }

    /// Mocks for every collaborator, regardless of credentials.
    pub fn mock(settings: &Settings) -> Self {
        Self {
            issues: Arc::new(MockIssueTracker::new(&settings.jira)),
            notifier: Arc::new(MockNotifier::new(&settings.slack)),
            mailbox: Arc::new(MockMailbox),
            summarizer: Arc::new(MockSummarizer),
        }
    }

    /// Per-collaborator `"configured"` / `"mock"` status.
    pub fn modes(&self) -> [(&'static str, &'static str); 4] {
        let mode = |configured: bool| if configured { "configured" } else { "mock" };
        [
            ("jira", mode(self.issues.is_configured())),
            ("slack", mode(self.notifier.is_configured())),
            ("gmail", mode(self.mailbox.is_configured())),
            ("watsonx", mode(self.summarizer.is_configured())),
        ]
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Services");
        for (name, mode) in self.modes() {
            s.field(name, &mode);
        }
        s.finish()
    }
}
