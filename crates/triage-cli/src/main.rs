mod config;
mod display;

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::ConfigArgs;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use triage_core::{Priority, TicketInput};
use triage_core::config::APP_NAME;
use triage_server::{AppState, ClassifyRequest, RouteRequest};
use triage_services::IssueUpdate;
use triage_services::mailbox::{DEFAULT_MAX_RESULTS, DEFAULT_QUERY};

#[derive(Parser, Debug)]
#[command(name = "triage", version, about = "Classify support tickets and route them to Jira and Slack")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
    /// Classify one ticket text.
    Classify {
        text: String,
        /// Draft a reply.
        #[arg(long)]
        suggest: bool,
        /// Summarize the ticket.
        #[arg(long)]
        summarize: bool,
        /// Print JSON instead of a card.
        #[arg(long)]
        json: bool,
    },
    /// Classify one ticket and route it.
    Route {
        text: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        from: Option<String>,
        /// Skip issue creation.
        #[arg(long)]
        no_jira: bool,
        /// Skip the chat notification.
        #[arg(long)]
        no_slack: bool,
        #[arg(long)]
        json: bool,
    },
    /// Pull tickets from the mailbox and route each of them.
    Fetch {
        #[arg(long, default_value = DEFAULT_QUERY)]
        query: String,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max: u32,
        /// List the tickets without routing them.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing issue.
    UpdateIssue {
        key: String,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Low, Medium or High.
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.config.debug);

    let settings = cli.config.settings();
    let state = AppState::from_settings(&settings).context("loading routing table")?;
    let router = &state.router;
    info!(
        model = %router.classifier().model_name(),
        services = ?router.services(),
        "{APP_NAME} v{}",
        env!("CARGO_PKG_VERSION")
    );

    match cli.command {
        Command::Serve { bind } => {
            // Load the model before accepting requests; a failure is retried per request.
            if let Err(e) = router.classifier().get().await {
                warn!(error = %e, "could not preload classifier");
            }
            triage_server::serve(state, bind).await?;
        }
        Command::Classify {
            text,
            suggest,
            summarize,
            json,
        } => {
            let request = ClassifyRequest {
                text,
                include_suggestion: suggest,
                include_summary: summarize,
            };
            let response = router.classify(&request).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                display::print_classification(&response);
            }
        }
        Command::Route {
            text,
            id,
            subject,
            from,
            no_jira,
            no_slack,
            json,
        } => {
            let ticket = TicketInput {
                text,
                ticket_id: id,
                subject,
                from_email: from,
            };
            let result = router.route(ticket, !no_jira, !no_slack).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                display::print_routing(&result);
            }
        }
        Command::Fetch {
            query,
            max,
            dry_run,
            json,
        } => {
            let outcome = router.services().mailbox.fetch_tickets(&query, max).await;
            if !outcome.success {
                anyhow::bail!(
                    "mailbox fetch failed: {}",
                    outcome.error.unwrap_or_default()
                );
            }
            info!(count = outcome.tickets.len(), query = %query, "fetched tickets");

            if dry_run {
                if json {
                    println!("{}", serde_json::to_string_pretty(&outcome.tickets)?);
                } else {
                    outcome.tickets.iter().for_each(display::print_mail);
                }
                return Ok(());
            }

            let requests: Vec<RouteRequest> = outcome
                .tickets
                .iter()
                .map(|t| RouteRequest::from(t.to_ticket()))
                .collect();
            let batch = router.route_batch(requests).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&batch)?);
            } else {
                batch.results.iter().for_each(display::print_routing);
            }
            info!(count = batch.processed, "routed tickets");
        }
        Command::UpdateIssue {
            key,
            summary,
            description,
            priority,
            json,
        } => {
            let update = IssueUpdate {
                summary,
                description,
                priority,
            };
            let outcome = router.services().issues.update_issue(&key, &update).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                display::print_issue(&outcome);
            }
            if !outcome.success {
                anyhow::bail!(
                    "issue update failed: {}",
                    outcome.error.unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
