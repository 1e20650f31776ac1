//! Vertical card display for classification and routing results.
//!
//! Each result is rendered as a titled card with aligned `label value`
//! rows, grouped into sections. Empty sections are skipped.

use triage_core::{ClassificationResult, IssueOutcome, NotificationOutcome, RoutingResult};
use triage_server::ClassifyResponse;
use triage_services::MailTicket;

const LABEL_WIDTH: usize = 14;

// ── Public API ──

pub fn print_classification(response: &ClassifyResponse) {
    let c = &response.classification;
    println!("=== {} ({:.2}) ===", c.category, c.confidence);
    println!();
    print_scores(c);
    if response.suggestion.is_some() || response.summary.is_some() {
        println!("Generated");
        row_opt("suggestion", response.suggestion.as_deref());
        row_opt("summary", response.summary.as_deref());
        println!();
    }
}

pub fn print_routing(result: &RoutingResult) {
    let c = &result.classification;
    println!("=== {} ===", result.ticket_id);
    println!();

    println!("Classification");
    row("category", c.category);
    row("confidence", format!("{:.2}", c.confidence));
    row("model", &c.model);
    println!();

    println!("Routing");
    row("priority", result.routing_config.jira_priority);
    row("channel", &result.routing_config.slack_channel);
    println!();

    if let Some(issue) = &result.jira_issue {
        print_issue(issue);
    }
    if let Some(message) = &result.slack_message {
        print_notification(message);
    }
}

pub fn print_mail(ticket: &MailTicket) {
    println!("--- {} ---", ticket.id);
    row("from", &ticket.from);
    row("subject", &ticket.subject);
    if !ticket.date.is_empty() {
        row("date", &ticket.date);
    }
    println!();
}

// ── Sections ──

fn print_scores(c: &ClassificationResult) {
    println!("Scores");
    for (category, score) in c.scores.iter() {
        let marker = if category == c.category { "*" } else { " " };
        println!("  {:<LABEL_WIDTH$} {score:.4} {marker}", category.as_str());
    }
    println!();
}

pub fn print_issue(issue: &IssueOutcome) {
    println!("Issue{}", mock_suffix(issue.mock));
    if issue.success {
        row_opt("key", issue.issue_key.as_deref());
        row_opt("url", issue.url.as_deref());
    } else {
        row_opt("error", issue.error.as_deref());
    }
    println!();
}

fn print_notification(message: &NotificationOutcome) {
    println!("Notification{}", mock_suffix(message.mock));
    if message.success {
        row_opt("channel", message.channel.as_deref());
        row_opt("ts", message.ts.as_deref());
    } else {
        row_opt("error", message.error.as_deref());
    }
    println!();
}

// ── Rows ──

fn row(label: &str, value: impl std::fmt::Display) {
    println!("  {label:<LABEL_WIDTH$} {value}");
}

fn row_opt(label: &str, value: Option<&str>) {
    if let Some(value) = value {
        row(label, value);
    }
}

fn mock_suffix(mock: bool) -> &'static str {
    if mock { " (mock)" } else { "" }
}
