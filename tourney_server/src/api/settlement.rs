//! Settlement API handlers.
//!
//! All routes are `GET` with query parameters:
//!
//! ```bash
//! curl "http://localhost:8080/fund?playerId=1&points=300"
//! curl "http://localhost:8080/announceTournament?tournamentId=1&deposit=100"
//! curl "http://localhost:8080/joinTournament?playerId=1&tournamentId=1"
//! curl "http://localhost:8080/finishTournament?tournamentId=1"
//! curl "http://localhost:8080/resultTournament"
//! curl "http://localhost:8080/balance?playerId=1"
//! ```
//!
//! Amounts are major units; responses carry them as JSON numbers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tourney::{BalanceView, FinishOutcome, TourneyResult, WinnerSummary};

use super::AppState;
use super::error::{ApiError, kind_label};
use super::request_id::RequestId;
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundParams {
    pub player_id: Option<String>,
    pub points: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceParams {
    pub tournament_id: Option<String>,
    pub deposit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    pub player_id: Option<String>,
    pub tournament_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentParams {
    pub tournament_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerParams {
    pub player_id: Option<String>,
}

/// Winner entry; player 0 means nobody was paid
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerEntry {
    pub player_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub prize: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl From<FinishOutcome> for WinnerEntry {
    fn from(outcome: FinishOutcome) -> Self {
        Self {
            player_id: outcome.winner_id.unwrap_or(0),
            prize: outcome.prize_paid,
            balance: outcome.winner_balance,
        }
    }
}

impl From<WinnerSummary> for WinnerEntry {
    fn from(summary: WinnerSummary) -> Self {
        Self {
            player_id: summary.player_id,
            prize: summary.prize,
            balance: summary.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FinishResponse {
    pub winner: WinnerEntry,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub winners: Vec<WinnerEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub player_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl From<BalanceView> for BalanceResponse {
    fn from(view: BalanceView) -> Self {
        Self {
            player_id: view.player_id,
            balance: view.balance,
        }
    }
}

/// Parse a required query parameter
fn required<T: FromStr>(value: Option<String>, name: &'static str) -> Result<T, ApiError> {
    value
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or(ApiError::BadParameter(name))
}

/// Parse a required id parameter; ids start at 1
fn required_id(value: Option<String>, name: &'static str) -> Result<i64, ApiError> {
    let id: i64 = required(value, name)?;
    if id < 1 {
        return Err(ApiError::BadParameter(name));
    }
    Ok(id)
}

/// Log and count the outcome of an engine call
fn observe<T>(
    operation: &'static str,
    tournament_id: Option<i64>,
    player_id: Option<i64>,
    result: TourneyResult<T>,
) -> Result<T, ApiError> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => kind_label(e.kind()),
    };
    metrics::settlement_operations_total(operation, outcome);
    logging::log_settlement_event(operation, tournament_id, player_id, outcome);
    result.map_err(ApiError::from)
}

/// Credit a player, creating the account on first funding.
///
/// # Errors
///
/// - `400 Bad Request`: Missing/invalid parameter or negative amount
pub async fn fund(
    State(state): State<AppState>,
    Query(params): Query<FundParams>,
) -> Result<StatusCode, ApiError> {
    let player_id = required_id(params.player_id, "playerId")?;
    let points: Decimal = required(params.points, "points")?;

    observe(
        "fund",
        None,
        Some(player_id),
        state.engine.fund(player_id, points).await,
    )?;
    Ok(StatusCode::OK)
}

/// Announce a tournament with a fixed deposit.
///
/// # Errors
///
/// - `400 Bad Request`: Missing/invalid parameter or negative deposit
/// - `409 Conflict`: Tournament id already taken
pub async fn announce_tournament(
    State(state): State<AppState>,
    Query(params): Query<AnnounceParams>,
) -> Result<StatusCode, ApiError> {
    let tournament_id = required_id(params.tournament_id, "tournamentId")?;
    let deposit: Decimal = required(params.deposit, "deposit")?;

    observe(
        "announce",
        Some(tournament_id),
        None,
        state
            .engine
            .announce_tournament(tournament_id, deposit)
            .await,
    )?;
    Ok(StatusCode::OK)
}

/// Enter a player into an open tournament.
///
/// # Errors
///
/// - `404 Not Found`: Unknown player or tournament
/// - `409 Conflict`: Tournament finished or player already enrolled
/// - `422 Unprocessable Entity`: Balance below the deposit
pub async fn join_tournament(
    State(state): State<AppState>,
    Query(params): Query<JoinParams>,
) -> Result<StatusCode, ApiError> {
    let player_id = required_id(params.player_id, "playerId")?;
    let tournament_id = required_id(params.tournament_id, "tournamentId")?;

    observe(
        "join",
        Some(tournament_id),
        Some(player_id),
        state.engine.join(player_id, tournament_id).await,
    )?;
    Ok(StatusCode::OK)
}

/// Settle a tournament and pay the winner.
///
/// # Response
///
/// ```json
/// {"winner": {"playerId": 2, "prize": 1.0, "balance": 1.5}}
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Unknown tournament
/// - `409 Conflict`: Already finished
pub async fn finish_tournament(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(params): Query<TournamentParams>,
) -> Result<Json<FinishResponse>, ApiError> {
    let tournament_id = required_id(params.tournament_id, "tournamentId")?;

    let outcome = observe(
        "finish",
        Some(tournament_id),
        None,
        state.engine.finish(tournament_id).await,
    )?;
    if let Some(winner) = outcome.winner_id {
        metrics::prize_paid(outcome.prize_paid.to_f64().unwrap_or_default());
        tracing::info!(
            request_id = request_id.as_str(),
            tournament_id = tournament_id,
            winner = winner,
            prize = %outcome.prize_paid,
            "Prize paid"
        );
    }

    Ok(Json(FinishResponse {
        winner: outcome.into(),
    }))
}

/// Winners of every finished tournament.
///
/// # Errors
///
/// - `404 Not Found`: No tournament has finished yet
pub async fn result_tournament(
    State(state): State<AppState>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let summaries = state.reporter.finished_summaries().await?;
    Ok(Json(ResultsResponse {
        winners: summaries.into_iter().map(WinnerEntry::from).collect(),
    }))
}

/// Current balance of a player.
///
/// # Errors
///
/// - `404 Not Found`: Unknown player
pub async fn balance(
    State(state): State<AppState>,
    Query(params): Query<PlayerParams>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let player_id = required_id(params.player_id, "playerId")?;
    let view = state.reporter.player_balance(player_id).await?;
    Ok(Json(view.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_parses_and_trims() {
        let id: i64 = required(Some(" 42 ".to_string()), "playerId").unwrap();
        assert_eq!(id, 42);

        let amount: Decimal = required(Some("12.345".to_string()), "points").unwrap();
        assert_eq!(amount, Decimal::new(12345, 3));
    }

    #[test]
    fn test_required_rejects_missing_and_garbage() {
        assert!(matches!(
            required::<i64>(None, "playerId"),
            Err(ApiError::BadParameter("playerId"))
        ));
        assert!(required::<i64>(Some("abc".to_string()), "playerId").is_err());
        assert!(required::<Decimal>(Some("1.2.3".to_string()), "points").is_err());
    }

    #[test]
    fn test_required_id_rejects_zero_and_negative() {
        assert_eq!(required_id(Some("7".to_string()), "playerId").unwrap(), 7);
        assert!(matches!(
            required_id(Some("0".to_string()), "playerId"),
            Err(ApiError::BadParameter("playerId"))
        ));
        assert!(matches!(
            required_id(Some("-3".to_string()), "tournamentId"),
            Err(ApiError::BadParameter("tournamentId"))
        ));
    }

    #[test]
    fn test_winner_entry_serializes_numbers() {
        let entry = WinnerEntry::from(FinishOutcome {
            tournament_id: 1,
            winner_id: None,
            prize_paid: Decimal::ZERO,
            winner_balance: Decimal::ZERO,
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["playerId"], 0);
        assert_eq!(json["prize"], 0.0);

        let entry = BalanceResponse {
            player_id: 3,
            balance: Decimal::new(150, 2),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["balance"], 1.5);
    }
}
