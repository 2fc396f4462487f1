//! HTTP API for the settlement engine.
//!
//! # Modules
//!
//! - [`settlement`]: Funding, tournament lifecycle, results and balances
//! - [`error`]: Error kind to status code mapping
//! - [`request_id`]: Request correlation middleware
//!
//! # Endpoints Overview
//!
//! ```text
//! GET /fund?playerId&points                  - Credit a player
//! GET /announceTournament?tournamentId&deposit
//! GET /joinTournament?playerId&tournamentId
//! GET /finishTournament?tournamentId         - Settle and pay the winner
//! GET /resultTournament                      - Winners of finished tournaments
//! GET /balance?playerId
//! GET /health                                - Store health status
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod error;
pub mod request_id;
pub mod settlement;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tourney::{ResultReporter, SettlementEngine, Store};
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the engine and reporter share one store.
#[derive(Clone)]
pub struct AppState {
    pub engine: SettlementEngine,
    pub reporter: ResultReporter,
}

impl AppState {
    /// Build the state around an engine, reporting from the engine's store
    pub fn new(engine: SettlementEngine) -> Self {
        let reporter = ResultReporter::new(Arc::clone(engine.store()));
        Self { engine, reporter }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.engine.store()
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use tourney_server::api::{create_router, AppState};
/// # use tourney::{MemoryStore, SettlementEngine};
/// # use std::sync::Arc;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = SettlementEngine::new(Arc::new(MemoryStore::new()));
/// let app = create_router(AppState::new(engine));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/fund", get(settlement::fund))
        .route("/announceTournament", get(settlement::announce_tournament))
        .route("/joinTournament", get(settlement::join_tournament))
        .route("/finishTournament", get(settlement::finish_tournament))
        .route("/resultTournament", get(settlement::result_tournament))
        .route("/balance", get(settlement::balance))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if the store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","backend":"postgres","version":"0.1.0","timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.store().health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "backend": state.store().backend(),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
