//! In-process store.
//!
//! Each unit of work takes the store lock for its whole lifetime and works
//! on a private copy of the state; commit publishes the copy, rollback or
//! drop discards it. Units of work are therefore fully serialized.

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::ledger::{Player, PlayerId};
use crate::tournament::{Tournament, TournamentId, TournamentStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    players: BTreeMap<PlayerId, Player>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    enrollments: BTreeSet<(TournamentId, PlayerId)>,
    /// Settlement order of finished tournaments
    finished_order: Vec<TournamentId>,
}

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failing_commits: Arc<AtomicU32>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with [`StoreError::Conflict`],
    /// discarding their writes.
    pub fn fail_next_commits(&self, count: u32) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Sum of all balances and all prize pools, in minor units
    pub async fn total_value(&self) -> i128 {
        let state = self.state.lock().await;
        let balances: i128 = state.players.values().map(|p| i128::from(p.balance)).sum();
        let pools: i128 = state
            .tournaments
            .values()
            .map(|t| i128::from(t.prize_pool))
            .sum();
        balances + pools
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            failing_commits: Arc::clone(&self.failing_commits),
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    failing_commits: Arc<AtomicU32>,
}

impl MemoryUnitOfWork {
    fn open_tournament_mut(&mut self, id: TournamentId) -> Option<&mut Tournament> {
        self.working
            .tournaments
            .get_mut(&id)
            .filter(|t| t.status == TournamentStatus::Open)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn player(&mut self, id: PlayerId) -> StoreResult<Option<Player>> {
        Ok(self.working.players.get(&id).cloned())
    }

    async fn player_for_update(&mut self, id: PlayerId) -> StoreResult<Option<Player>> {
        self.player(id).await
    }

    async fn insert_player(&mut self, player: &Player) -> StoreResult<bool> {
        if self.working.players.contains_key(&player.id) {
            return Ok(false);
        }
        self.working.players.insert(player.id, player.clone());
        Ok(true)
    }

    async fn adjust_balance(&mut self, id: PlayerId, delta: i64) -> StoreResult<Option<i64>> {
        let Some(player) = self.working.players.get_mut(&id) else {
            return Ok(None);
        };
        match player.balance.checked_add(delta) {
            Some(new_balance) if new_balance >= 0 => {
                player.balance = new_balance;
                Ok(Some(new_balance))
            }
            _ => Ok(None),
        }
    }

    async fn tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.working.tournaments.get(&id).cloned())
    }

    async fn tournament_for_update(
        &mut self,
        id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        self.tournament(id).await
    }

    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<bool> {
        if self.working.tournaments.contains_key(&tournament.id) {
            return Ok(false);
        }
        self.working
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(true)
    }

    async fn set_prize_pool(&mut self, id: TournamentId, amount: i64) -> StoreResult<bool> {
        if amount < 0 {
            return Ok(false);
        }
        Ok(match self.open_tournament_mut(id) {
            Some(t) => {
                t.prize_pool = amount;
                true
            }
            None => false,
        })
    }

    async fn set_winner(&mut self, id: TournamentId, winner: PlayerId) -> StoreResult<bool> {
        Ok(match self.open_tournament_mut(id) {
            Some(t) => {
                t.winner_id = Some(winner);
                true
            }
            None => false,
        })
    }

    async fn mark_finished(
        &mut self,
        id: TournamentId,
        winner: Option<PlayerId>,
        prize_paid: i64,
    ) -> StoreResult<bool> {
        let finished = match self.open_tournament_mut(id) {
            Some(t) => {
                t.status = TournamentStatus::Finished;
                t.winner_id = winner;
                t.prize_paid = Some(prize_paid);
                t.prize_pool = 0;
                t.finished_at = Some(Utc::now());
                true
            }
            None => false,
        };
        if finished {
            self.working.finished_order.push(id);
        }
        Ok(finished)
    }

    async fn finished_tournaments(&mut self) -> StoreResult<Vec<Tournament>> {
        self.working
            .finished_order
            .iter()
            .map(|id| {
                self.working
                    .tournaments
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::Corrupt(format!("finished tournament {id} missing")))
            })
            .collect()
    }

    async fn insert_enrollment(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        Ok(self.working.enrollments.insert((tournament_id, player_id)))
    }

    async fn is_enrolled(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        Ok(self.working.enrollments.contains(&(tournament_id, player_id)))
    }

    async fn enrolled_players(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<PlayerId>> {
        Ok(self
            .working
            .enrollments
            .range((tournament_id, PlayerId::MIN)..=(tournament_id, PlayerId::MAX))
            .map(|&(_, player_id)| player_id)
            .collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let injected = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict("injected commit conflict".to_string()));
        }

        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
