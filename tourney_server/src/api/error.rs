//! Mapping of settlement errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tourney::{ErrorKind, TourneyError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by settlement handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or unparsable query parameter
    #[error("there was a missing or invalid {0} parameter")]
    BadParameter(&'static str),

    #[error(transparent)]
    Settlement(#[from] TourneyError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Settlement(e) => status_for(e.kind()),
        }
    }

    /// Metric/log label for the outcome
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::BadParameter(_) => "bad_parameter",
            ApiError::Settlement(e) => kind_label(e.kind()),
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::BadParameter(_) => self.to_string(),
            ApiError::Settlement(e) => e.client_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Settlement request failed");
        }
        let body = ErrorResponse {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound | ErrorKind::NoData => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists
        | ErrorKind::AlreadyEnrolled
        | ErrorKind::AlreadyFinished
        | ErrorKind::TournamentClosed => StatusCode::CONFLICT,
        ErrorKind::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidAmount | ErrorKind::InvalidId => StatusCode::BAD_REQUEST,
        ErrorKind::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Storage | ErrorKind::Overflow => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::AlreadyExists => "already_exists",
        ErrorKind::AlreadyEnrolled => "already_enrolled",
        ErrorKind::InsufficientFunds => "insufficient_funds",
        ErrorKind::TournamentClosed => "tournament_closed",
        ErrorKind::AlreadyFinished => "already_finished",
        ErrorKind::NoData => "no_data",
        ErrorKind::InvalidAmount => "invalid_amount",
        ErrorKind::InvalidId => "invalid_id",
        ErrorKind::Overflow => "overflow",
        ErrorKind::ConcurrencyConflict => "concurrency_conflict",
        ErrorKind::Storage => "storage",
    }
}
