//! Read-only views over settled tournaments and balances.

use crate::errors::{Entity, StoreResultExt, TourneyError, TourneyResult};
use crate::ledger::{self, PlayerId};
use crate::money::to_major;
use crate::store::{Store, UnitOfWork};
use crate::tournament::{self, Tournament, TournamentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One settled tournament as reported to clients.
///
/// A tournament finished without entrants reports player 0 with zero
/// amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerSummary {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub prize: Decimal,
    /// Winner's balance at read time, not at settlement time
    pub balance: Decimal,
}

/// Player balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub player_id: PlayerId,
    pub balance: Decimal,
}

/// Result reporter
#[derive(Clone)]
pub struct ResultReporter {
    store: Arc<dyn Store>,
}

impl ResultReporter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn begin(&self, operation: &'static str) -> TourneyResult<Box<dyn UnitOfWork>> {
        self.store.begin().await.context(operation, Entity::Store)
    }

    /// Winners of all finished tournaments, oldest settlement first
    ///
    /// # Errors
    ///
    /// * `TourneyError::NoData` - No tournament has finished yet
    pub async fn finished_summaries(&self) -> TourneyResult<Vec<WinnerSummary>> {
        let mut tx = self.begin("report results").await?;
        let finished = tournament::list_finished(tx.as_mut()).await?;
        if finished.is_empty() {
            return Err(TourneyError::NoData);
        }

        let mut summaries = Vec::with_capacity(finished.len());
        for t in &finished {
            summaries.push(summarize(tx.as_mut(), t).await?);
        }

        tx.rollback().await.context("report results", Entity::Store)?;
        Ok(summaries)
    }

    /// Current balance of a player
    ///
    /// # Errors
    ///
    /// * `TourneyError::NotFound` - Unknown player
    pub async fn player_balance(&self, player_id: PlayerId) -> TourneyResult<BalanceView> {
        let mut tx = self.begin("get balance").await?;
        let balance = ledger::get_balance(tx.as_mut(), player_id).await?;
        tx.rollback().await.context("get balance", Entity::Store)?;

        Ok(BalanceView {
            player_id,
            balance: to_major(balance),
        })
    }

    /// Current state of a tournament
    pub async fn tournament(&self, tournament_id: TournamentId) -> TourneyResult<Tournament> {
        let mut tx = self.begin("get tournament").await?;
        let tournament = tournament::get(tx.as_mut(), tournament_id).await?;
        tx.rollback().await.context("get tournament", Entity::Store)?;
        Ok(tournament)
    }
}

async fn summarize(tx: &mut dyn UnitOfWork, t: &Tournament) -> TourneyResult<WinnerSummary> {
    let Some(winner) = t.winner_id else {
        return Ok(WinnerSummary {
            tournament_id: t.id,
            player_id: 0,
            prize: Decimal::ZERO,
            balance: Decimal::ZERO,
        });
    };

    let balance = ledger::get_balance(tx, winner).await?;
    Ok(WinnerSummary {
        tournament_id: t.id,
        player_id: winner,
        prize: to_major(t.prize_paid.unwrap_or_default()),
        balance: to_major(balance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::settlement::{FixedSequence, SettlementEngine};
    use crate::store::MemoryStore;

    fn setup() -> (SettlementEngine, ResultReporter) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let engine = SettlementEngine::new(Arc::clone(&store))
            .with_random_source(Arc::new(FixedSequence::new([0])));
        (engine, ResultReporter::new(store))
    }

    #[tokio::test]
    async fn test_no_finished_tournaments_is_no_data() {
        let (engine, reporter) = setup();
        engine.announce_tournament(1, Decimal::ONE).await.unwrap();

        let err = reporter.finished_summaries().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoData);
    }

    #[tokio::test]
    async fn test_summary_reports_prize_and_current_balance() {
        let (engine, reporter) = setup();
        engine.fund(5, Decimal::new(300, 2)).await.unwrap();
        engine.announce_tournament(1, Decimal::ONE).await.unwrap();
        engine.join(5, 1).await.unwrap();
        engine.finish(1).await.unwrap();
        engine.fund(5, Decimal::ONE).await.unwrap();

        let summaries = reporter.finished_summaries().await.unwrap();
        assert_eq!(
            summaries,
            vec![WinnerSummary {
                tournament_id: 1,
                player_id: 5,
                prize: Decimal::new(100, 2),
                balance: Decimal::new(400, 2),
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_tournament_reports_player_zero() {
        let (engine, reporter) = setup();
        engine.announce_tournament(3, Decimal::ONE).await.unwrap();
        engine.finish(3).await.unwrap();

        let summaries = reporter.finished_summaries().await.unwrap();
        assert_eq!(summaries[0].player_id, 0);
        assert_eq!(summaries[0].prize, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_balance_of_unknown_player_is_not_found() {
        let (_, reporter) = setup();
        let err = reporter.player_balance(77).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
