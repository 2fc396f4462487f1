//! HTTP integration tests against an in-memory engine.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tourney::settlement::FixedSequence;
use tourney::{MemoryStore, RetryPolicy, SettlementEngine};
use tourney_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use tower::ServiceExt; // For `oneshot` method

/// Helper to create a test router over a fresh store
fn create_test_app(picks: Vec<usize>) -> (axum::Router, MemoryStore) {
    let store = MemoryStore::new();
    let engine = SettlementEngine::new(Arc::new(store.clone()))
        .with_random_source(Arc::new(FixedSequence::new(picks)))
        .with_retry_policy(RetryPolicy {
            max_attempts: 2,
            initial_backoff: std::time::Duration::from_millis(1),
            ..RetryPolicy::default()
        });
    (create_router(AppState::new(engine)), store)
}

/// Helper to issue a GET and return status and parsed body (Null if empty)
async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

// ============================================================================
// Settlement flow
// ============================================================================

#[tokio::test]
async fn test_full_tournament_flow() {
    let (app, _) = create_test_app(vec![1]);

    for uri in [
        "/fund?playerId=2&points=1",
        "/fund?playerId=3&points=1",
        "/announceTournament?tournamentId=1&deposit=0.5",
        "/joinTournament?playerId=2&tournamentId=1",
        "/joinTournament?playerId=3&tournamentId=1",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, Value::Null);
    }

    let (status, body) = get(&app, "/finishTournament?tournamentId=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["winner"]["playerId"], 3);
    assert_eq!(body["winner"]["prize"], 1.0);
    assert_eq!(body["winner"]["balance"], 1.5);

    let (status, body) = get(&app, "/balance?playerId=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playerId"], 2);
    assert_eq!(body["balance"], 0.5);

    let (status, body) = get(&app, "/resultTournament").await;
    assert_eq!(status, StatusCode::OK);
    let winners = body["winners"].as_array().unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0]["playerId"], 3);
    assert_eq!(winners[0]["prize"], 1.0);
}

#[tokio::test]
async fn test_finish_without_entrants_reports_player_zero() {
    let (app, _) = create_test_app(vec![]);
    get(&app, "/announceTournament?tournamentId=5&deposit=10").await;

    let (status, body) = get(&app, "/finishTournament?tournamentId=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["winner"]["playerId"], 0);
    assert_eq!(body["winner"]["prize"], 0.0);
}

#[tokio::test]
async fn test_fund_accumulates_and_rounds() {
    let (app, store) = create_test_app(vec![]);
    get(&app, "/fund?playerId=1&points=12.345").await;
    get(&app, "/fund?playerId=1&points=0.005").await;

    let (_, body) = get(&app, "/balance?playerId=1").await;
    let balance = body["balance"].as_f64().unwrap();
    assert!((balance - 12.34).abs() < 1e-9, "balance was {balance}");
    assert_eq!(store.total_value().await, 1234);
}

// ============================================================================
// Error mapping
// ============================================================================

#[tokio::test]
async fn test_missing_or_invalid_parameters_are_bad_requests() {
    let (app, _) = create_test_app(vec![]);

    for uri in [
        "/fund?playerId=1",
        "/fund?playerId=abc&points=1",
        "/fund?playerId=1&points=lots",
        "/announceTournament?tournamentId=1",
        "/joinTournament?tournamentId=1",
        "/finishTournament",
        "/balance",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("parameter"), "{uri}");
    }
}

#[tokio::test]
async fn test_zero_and_negative_ids_are_bad_requests() {
    let (app, _) = create_test_app(vec![]);

    for uri in [
        "/fund?playerId=0&points=5",
        "/fund?playerId=-7&points=5",
        "/announceTournament?tournamentId=0&deposit=1",
        "/joinTournament?playerId=0&tournamentId=1",
        "/joinTournament?playerId=1&tournamentId=-1",
        "/finishTournament?tournamentId=0",
        "/balance?playerId=0",
    ] {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }

    let (status, _) = get(&app, "/resultTournament").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_negative_amount_is_bad_request() {
    let (app, _) = create_test_app(vec![]);
    let (status, _) = get(&app, "/fund?playerId=1&points=-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_entities_are_not_found() {
    let (app, _) = create_test_app(vec![]);

    let (status, body) = get(&app, "/balance?playerId=404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "player 404 not found");

    let (status, _) = get(&app, "/finishTournament?tournamentId=9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/resultTournament").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_business_rule_violations_map_to_conflict_statuses() {
    let (app, _) = create_test_app(vec![]);
    get(&app, "/fund?playerId=1&points=1").await;
    get(&app, "/announceTournament?tournamentId=1&deposit=1").await;
    get(&app, "/announceTournament?tournamentId=2&deposit=5").await;

    let (status, _) = get(&app, "/announceTournament?tournamentId=1&deposit=1").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = get(&app, "/joinTournament?playerId=1&tournamentId=2").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&app, "/joinTournament?playerId=1&tournamentId=1").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, "/joinTournament?playerId=1&tournamentId=1").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = get(&app, "/finishTournament?tournamentId=1").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, "/finishTournament?tournamentId=1").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_exhausted_conflicts_are_service_unavailable() {
    let (app, store) = create_test_app(vec![]);
    store.fail_next_commits(2);

    let (status, body) = get(&app, "/fund?playerId=1&points=1").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service busy, please retry");
    assert_eq!(store.total_value().await, 0);
}

// ============================================================================
// Health and middleware
// ============================================================================

#[tokio::test]
async fn test_health_check_reports_backend() {
    let (app, _) = create_test_app(vec![]);
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_request_id_is_generated_or_echoed() {
    let (app, _) = create_test_app(vec![]);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    let request = Request::builder()
        .uri("/balance?playerId=1")
        .header(REQUEST_ID_HEADER, "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-abc");
}
