//! Settlement engine: funding, announcement, join and finish as single
//! units of work.

use super::models::{FinishOutcome, JoinReceipt};
use super::random::{RandomSource, ThreadRandom};
use super::retry::RetryPolicy;
use crate::enrollment;
use crate::errors::{Entity, StoreResultExt, TourneyError, TourneyResult, ensure_valid_id};
use crate::ledger::{self, Player, PlayerId};
use crate::money::{to_major, to_minor};
use crate::store::{Store, UnitOfWork};
use crate::tournament::{self, Tournament, TournamentId};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Settlement engine
#[derive(Clone)]
pub struct SettlementEngine {
    store: Arc<dyn Store>,
    random: Arc<dyn RandomSource>,
    retry: RetryPolicy,
}

impl SettlementEngine {
    /// Create an engine over a store, drawing winners from [`ThreadRandom`]
    ///
    /// # Arguments
    ///
    /// * `store` - Transactional store shared by all operations
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            random: Arc::new(ThreadRandom),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the winner selection source
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Replace the conflict retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Store backing this engine
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn begin(&self, operation: &'static str) -> TourneyResult<Box<dyn UnitOfWork>> {
        self.store.begin().await.context(operation, Entity::Store)
    }

    async fn commit(&self, tx: Box<dyn UnitOfWork>, operation: &'static str) -> TourneyResult<()> {
        tx.commit().await.context(operation, Entity::Store)
    }

    /// Credit a player with an external amount, opening the account on
    /// first funding
    ///
    /// # Arguments
    ///
    /// * `player_id` - Player ID
    /// * `amount` - Major units, rounded half-to-even to cents
    ///
    /// # Returns
    ///
    /// * `TourneyResult<Decimal>` - New balance in major units
    pub async fn fund(&self, player_id: PlayerId, amount: Decimal) -> TourneyResult<Decimal> {
        ensure_valid_id(Entity::Player(player_id))?;
        let amount = to_minor(amount)?;
        let balance = self
            .retry
            .run("fund", move || self.fund_once(player_id, amount))
            .await?;

        log::info!("Funded player {player_id} with {}", to_major(amount));
        Ok(to_major(balance))
    }

    async fn fund_once(&self, player_id: PlayerId, amount: i64) -> TourneyResult<i64> {
        let mut tx = self.begin("fund").await?;
        if ledger::ensure_account(tx.as_mut(), player_id).await? {
            log::debug!("Opening account for player {player_id}");
        }
        let balance = ledger::credit(tx.as_mut(), player_id, amount).await?;
        self.commit(tx, "fund").await?;
        Ok(balance)
    }

    /// Open a named zero-balance account
    pub async fn register_player(
        &self,
        player_id: PlayerId,
        display_name: &str,
    ) -> TourneyResult<Player> {
        ensure_valid_id(Entity::Player(player_id))?;
        self.retry
            .run("register player", move || async move {
                let mut tx = self.begin("register player").await?;
                let player = ledger::open_account(tx.as_mut(), player_id, display_name).await?;
                self.commit(tx, "register player").await?;
                Ok(player)
            })
            .await
    }

    /// Announce an open tournament
    ///
    /// # Arguments
    ///
    /// * `tournament_id` - Tournament ID
    /// * `deposit` - Entry stake in major units
    ///
    /// # Errors
    ///
    /// * `TourneyError::AlreadyExists` - Id taken
    /// * `TourneyError::InvalidAmount` - Negative or oversized deposit
    /// * `TourneyError::InvalidId` - Id below 1
    pub async fn announce_tournament(
        &self,
        tournament_id: TournamentId,
        deposit: Decimal,
    ) -> TourneyResult<Tournament> {
        ensure_valid_id(Entity::Tournament(tournament_id))?;
        let deposit = to_minor(deposit)?;
        let tournament = self
            .retry
            .run("announce", move || async move {
                let mut tx = self.begin("announce").await?;
                let tournament = tournament::announce(tx.as_mut(), tournament_id, deposit).await?;
                self.commit(tx, "announce").await?;
                Ok(tournament)
            })
            .await?;

        log::info!(
            "Announced tournament {tournament_id} with deposit {}",
            to_major(deposit)
        );
        Ok(tournament)
    }

    /// Administrative override: the given player will be paid at finish
    /// regardless of enrollment
    pub async fn assign_winner(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TourneyResult<Tournament> {
        ensure_valid_id(Entity::Tournament(tournament_id))?;
        ensure_valid_id(Entity::Player(player_id))?;
        let tournament = self
            .retry
            .run("assign winner", move || async move {
                let mut tx = self.begin("assign winner").await?;
                let tournament =
                    tournament::assign_winner(tx.as_mut(), tournament_id, player_id).await?;
                self.commit(tx, "assign winner").await?;
                Ok(tournament)
            })
            .await?;

        log::info!("Assigned player {player_id} as winner of tournament {tournament_id}");
        Ok(tournament)
    }

    /// Enter a player into a tournament
    ///
    /// Debits the deposit, adds it to the pool and records the enrollment
    /// in one unit of work.
    ///
    /// # Errors
    ///
    /// * `TourneyError::NotFound` - Unknown player or tournament
    /// * `TourneyError::TournamentClosed` - Tournament finished
    /// * `TourneyError::AlreadyEnrolled` - Player already entered; nothing changes
    /// * `TourneyError::InsufficientFunds` - Balance below the deposit
    pub async fn join(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> TourneyResult<JoinReceipt> {
        ensure_valid_id(Entity::Tournament(tournament_id))?;
        ensure_valid_id(Entity::Player(player_id))?;
        let receipt = self
            .retry
            .run("join", move || self.join_once(player_id, tournament_id))
            .await?;

        log::info!(
            "Player {player_id} joined tournament {tournament_id}, pool now {}",
            receipt.prize_pool
        );
        Ok(receipt)
    }

    async fn join_once(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> TourneyResult<JoinReceipt> {
        let mut tx = self.begin("join").await?;

        // Tournament row first, then player row
        let tournament = tournament::get_for_update(tx.as_mut(), tournament_id).await?;
        if tournament.is_finished() {
            return Err(TourneyError::TournamentClosed(tournament_id));
        }

        let player = ledger::get_player(tx.as_mut(), player_id).await?;
        if enrollment::contains(tx.as_mut(), tournament_id, player_id).await? {
            return Err(TourneyError::AlreadyEnrolled {
                tournament_id,
                player_id,
            });
        }
        if player.balance < tournament.deposit {
            return Err(TourneyError::InsufficientFunds {
                player_id,
                available: player.balance,
                required: tournament.deposit,
            });
        }

        let balance = ledger::debit(tx.as_mut(), player_id, tournament.deposit).await?;
        let prize_pool = tournament
            .prize_pool
            .checked_add(tournament.deposit)
            .ok_or(TourneyError::Overflow(Entity::Tournament(tournament_id)))?;
        tournament::set_prize_pool(tx.as_mut(), tournament_id, prize_pool).await?;
        enrollment::add(tx.as_mut(), tournament_id, player_id).await?;

        self.commit(tx, "join").await?;

        Ok(JoinReceipt {
            player_id,
            tournament_id,
            balance: to_major(balance),
            prize_pool: to_major(prize_pool),
        })
    }

    /// Settle a tournament
    ///
    /// Pays the whole pool to the pre-assigned winner, or to a player drawn
    /// uniformly from the enrolled set. With nobody enrolled the tournament
    /// finishes without a winner and no balance changes.
    ///
    /// # Errors
    ///
    /// * `TourneyError::NotFound` - Unknown tournament or assigned winner
    /// * `TourneyError::AlreadyFinished` - Already settled; nothing is paid
    pub async fn finish(&self, tournament_id: TournamentId) -> TourneyResult<FinishOutcome> {
        ensure_valid_id(Entity::Tournament(tournament_id))?;
        let outcome = self
            .retry
            .run("finish", move || self.finish_once(tournament_id))
            .await?;

        match outcome.winner_id {
            Some(winner) => log::info!(
                "Tournament {tournament_id} finished: player {winner} won {}",
                outcome.prize_paid
            ),
            None => log::info!("Tournament {tournament_id} finished without entrants"),
        }
        Ok(outcome)
    }

    async fn finish_once(&self, tournament_id: TournamentId) -> TourneyResult<FinishOutcome> {
        let mut tx = self.begin("finish").await?;

        let tournament = tournament::get_for_update(tx.as_mut(), tournament_id).await?;
        if tournament.is_finished() {
            return Err(TourneyError::AlreadyFinished(tournament_id));
        }

        let winner = match tournament.winner_id {
            Some(assigned) => Some(assigned),
            None => {
                let players = enrollment::list_players(tx.as_mut(), tournament_id).await?;
                if players.is_empty() {
                    None
                } else {
                    let index = self.random.next_index(players.len()) % players.len();
                    Some(players[index])
                }
            }
        };

        let prize = tournament.prize_pool;
        tournament::finish(tx.as_mut(), tournament_id, winner, prize).await?;

        let winner_balance = match winner {
            Some(winner) => ledger::credit(tx.as_mut(), winner, prize).await?,
            None => 0,
        };

        self.commit(tx, "finish").await?;

        Ok(FinishOutcome {
            tournament_id,
            winner_id: winner,
            prize_paid: to_major(prize),
            winner_balance: to_major(winner_balance),
        })
    }
}
