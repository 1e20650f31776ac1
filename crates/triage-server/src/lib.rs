//! Ticket routing pipeline and its HTTP surface.

pub mod error;
pub mod router;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use router::{BatchResult, ClassifyRequest, ClassifyResponse, RouteRequest, TicketRouter};
pub use state::AppState;

/// The application with all routes and middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::service_routes())
        .merge(routes::triage_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
