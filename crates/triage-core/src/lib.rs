pub mod category;
pub mod config;
pub mod error;
pub mod policy;
pub mod ticket;

pub use category::{Category, Scores};
pub use config::Settings;
pub use error::{TriageError, UnknownCategory, validate_text};
pub use policy::{PolicyEntry, Priority, RoutingPolicy};
pub use ticket::{
    ClassificationResult, IssueOutcome, NotificationOutcome, RoutingResult, TicketInput,
};
