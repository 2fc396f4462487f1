//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; the subscriber installed
//! here picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Features:
/// - Request ID correlation
/// - Settlement event fields (operation, tournament, player)
/// - Configurable log levels via RUST_LOG env var
///
/// # Example
///
/// ```no_run
/// use tourney_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the outcome of a settlement request
///
/// # Arguments
///
/// * `operation` - Settlement operation (join, finish, ...)
/// * `tournament_id` - Tournament involved, if any
/// * `player_id` - Player involved, if any
/// * `outcome` - `ok` or an error kind
pub fn log_settlement_event(
    operation: &str,
    tournament_id: Option<i64>,
    player_id: Option<i64>,
    outcome: &str,
) {
    if outcome == "ok" {
        tracing::info!(
            operation = operation,
            tournament_id = tournament_id,
            player_id = player_id,
            "Settlement request succeeded"
        );
    } else {
        tracing::warn!(
            operation = operation,
            tournament_id = tournament_id,
            player_id = player_id,
            outcome = outcome,
            "Settlement request rejected"
        );
    }
}

/// Log API request/response
///
/// # Arguments
///
/// * `request_id` - Correlation id
/// * `method` - HTTP method
/// * `path` - Request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    if duration_ms > 1000 {
        tracing::warn!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "Slow API request"
        );
    } else {
        tracing::info!(
            request_id = request_id,
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}
