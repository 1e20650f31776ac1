//! HTTP routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::warn;
use triage_core::RoutingResult;
use triage_core::config::APP_NAME;

use crate::error::ApiError;
use crate::router::{BatchResult, ClassifyRequest, ClassifyResponse, RouteRequest};
use crate::state::AppState;

type AppStateArc = Arc<AppState>;

pub fn service_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

pub fn triage_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/classify", post(classify))
        .route("/route", post(route))
        .route("/route/batch", post(route_batch))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "classify": "/classify",
            "route": "/route",
            "batch": "/route/batch",
            "health": "/health",
        },
    }))
}

/// Loads the classifier if needed; a load failure reports `degraded`.
async fn health(State(state): State<AppStateArc>) -> Json<Value> {
    let classifier = state.router.classifier();
    match classifier.get().await {
        Ok(model) => Json(json!({
            "status": "healthy",
            "services": { "classifier": "available", "model": model.model_name() },
        })),
        Err(e) => {
            warn!(error = %e, "health check: classifier unavailable");
            Json(json!({
                "status": "degraded",
                "services": { "classifier": "unavailable", "model": classifier.model_name() },
                "error": e.to_string(),
            }))
        }
    }
}

async fn classify(
    State(state): State<AppStateArc>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    Ok(Json(state.router.classify(&req).await?))
}

async fn route(
    State(state): State<AppStateArc>,
    Json(req): Json<RouteRequest>,
) -> Result<Json<RoutingResult>, ApiError> {
    let result = state
        .router
        .route(req.ticket, req.create_jira, req.send_slack)
        .await?;
    Ok(Json(result))
}

async fn route_batch(
    State(state): State<AppStateArc>,
    Json(reqs): Json<Vec<RouteRequest>>,
) -> Result<Json<BatchResult>, ApiError> {
    Ok(Json(state.router.route_batch(reqs).await?))
}
