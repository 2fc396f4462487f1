//! Concurrent settlement against a shared store.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tourney::settlement::SeededRandom;
use tourney::store::Store;
use tourney::{
    ErrorKind, MemoryStore, ResultReporter, RetryPolicy, SettlementEngine, TourneyError,
    enrollment,
};

const PLAYERS: i64 = 32;

async fn funded_engine(store: &MemoryStore) -> SettlementEngine {
    let engine = SettlementEngine::new(Arc::new(store.clone()))
        .with_random_source(Arc::new(SeededRandom::new(7)))
        .with_retry_policy(RetryPolicy {
            max_attempts: 8,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
        });
    for id in 1..=PLAYERS {
        engine.fund(id, Decimal::TEN).await.unwrap();
    }
    engine.announce_tournament(1, Decimal::ONE).await.unwrap();
    engine
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_accumulate_every_deposit() {
    let store = MemoryStore::new();
    let engine = funded_engine(&store).await;

    let handles: Vec<_> = (1..=PLAYERS)
        .map(|id| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.join(id, 1).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reporter = ResultReporter::new(Arc::new(store.clone()));
    let t = reporter.tournament(1).await.unwrap();
    assert_eq!(t.prize_pool, PLAYERS * 100);
    assert_eq!(store.total_value().await, i128::from(PLAYERS) * 1000);

    let mut tx = store.begin().await.unwrap();
    let entrants = enrollment::list_players(tx.as_mut(), 1).await.unwrap();
    assert_eq!(entrants, (1..=PLAYERS).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_double_join_enrolls_once() {
    let store = MemoryStore::new();
    let engine = funded_engine(&store).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.join(5, 1).await })
        })
        .collect();

    let mut joined = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => joined += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyEnrolled),
        }
    }
    assert_eq!(joined, 1);

    let reporter = ResultReporter::new(Arc::new(store));
    assert_eq!(reporter.player_balance(5).await.unwrap().balance, Decimal::new(9, 0));
    assert_eq!(reporter.tournament(1).await.unwrap().prize_pool, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_finishes_pay_exactly_once() {
    let store = MemoryStore::new();
    let engine = funded_engine(&store).await;
    for id in 1..=PLAYERS {
        engine.join(id, 1).await.unwrap();
    }

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.finish(1).await })
        })
        .collect();

    let mut payouts = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => payouts.push(outcome),
            Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyFinished),
        }
    }
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].prize_paid, Decimal::from(PLAYERS));
    assert_eq!(store.total_value().await, i128::from(PLAYERS) * 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_joins_racing_finish_never_lose_money() {
    let store = MemoryStore::new();
    let engine = funded_engine(&store).await;

    let mut handles = Vec::new();
    for id in 1..=PLAYERS {
        let joiner = engine.clone();
        handles.push(tokio::spawn(async move {
            joiner.join(id, 1).await.map(|_| ())
        }));
        if id == PLAYERS / 2 {
            let finisher = engine.clone();
            handles.push(tokio::spawn(async move {
                finisher.finish(1).await.map(|_| ())
            }));
        }
    }

    for handle in handles {
        if let Err(e) = handle.await.unwrap() {
            assert_eq!(e.kind(), ErrorKind::TournamentClosed);
        }
    }
    assert_eq!(store.total_value().await, i128::from(PLAYERS) * 1000);
}

#[tokio::test]
async fn test_conflict_exhaustion_surfaces_and_changes_nothing() {
    let store = MemoryStore::new();
    let engine = funded_engine(&store).await;
    engine.join(1, 1).await.unwrap();

    store.fail_next_commits(8);
    let err = engine.finish(1).await.unwrap_err();
    assert!(matches!(
        err,
        TourneyError::ConcurrencyConflict {
            operation: "finish",
            attempts: 8
        }
    ));
    assert!(err.is_retryable());

    let reporter = ResultReporter::new(Arc::new(store.clone()));
    assert!(!reporter.tournament(1).await.unwrap().is_finished());
    assert_eq!(reporter.player_balance(1).await.unwrap().balance, Decimal::new(9, 0));

    let outcome = engine.finish(1).await.unwrap();
    assert_eq!(outcome.winner_id, Some(1));
}
