//! PostgreSQL store.
//!
//! Units of work are sqlx transactions. `*_for_update` reads use
//! `SELECT ... FOR UPDATE`, so a locked tournament or player row stays
//! locked until commit or rollback. Locks are always taken tournament
//! first, then player.
#![allow(clippy::needless_raw_string_hashes)]

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::db::timeouts::{DEFAULT_QUERY_TIMEOUT, with_timeout};
use crate::ledger::{Player, PlayerId};
use crate::tournament::{Tournament, TournamentId, TournamentStatus};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::Duration;

const TOURNAMENT_COLUMNS: &str =
    "id, deposit, prize_pool, status, winner_id, prize_paid, created_at, finished_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
    query_timeout: Duration,
}

impl PgStore {
    /// Create a store over a connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-statement timeout
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let tx = with_timeout(self.query_timeout, self.pool.begin()).await?;
        Ok(Box::new(PgUnitOfWork {
            tx,
            query_timeout: self.query_timeout,
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("SELECT 1").execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    query_timeout: Duration,
}

fn decode_player(row: &PgRow) -> Player {
    Player {
        id: row.get("id"),
        display_name: row.get("display_name"),
        balance: row.get("balance"),
    }
}

fn decode_tournament(row: &PgRow) -> StoreResult<Tournament> {
    let status_str: String = row.get("status");
    let status = TournamentStatus::parse(&status_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown tournament status '{status_str}'")))?;

    Ok(Tournament {
        id: row.get("id"),
        deposit: row.get("deposit"),
        prize_pool: row.get("prize_pool"),
        status,
        winner_id: row.get("winner_id"),
        prize_paid: row.get("prize_paid"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        finished_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("finished_at")
            .map(|dt| dt.and_utc()),
    })
}

impl PgUnitOfWork {
    async fn fetch_player(&mut self, id: PlayerId, lock: bool) -> StoreResult<Option<Player>> {
        let sql = if lock {
            "SELECT id, display_name, balance FROM players WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, display_name, balance FROM players WHERE id = $1"
        };
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(sql).bind(id).fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.as_ref().map(decode_player))
    }

    async fn fetch_tournament(
        &mut self,
        id: TournamentId,
        lock: bool,
    ) -> StoreResult<Option<Tournament>> {
        let sql = if lock {
            format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE")
        } else {
            format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1")
        };
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(id).fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(decode_tournament).transpose()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn player(&mut self, id: PlayerId) -> StoreResult<Option<Player>> {
        self.fetch_player(id, false).await
    }

    async fn player_for_update(&mut self, id: PlayerId) -> StoreResult<Option<Player>> {
        self.fetch_player(id, true).await
    }

    async fn insert_player(&mut self, player: &Player) -> StoreResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO players (id, display_name, balance)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(player.id)
            .bind(&player.display_name)
            .bind(player.balance)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn adjust_balance(&mut self, id: PlayerId, delta: i64) -> StoreResult<Option<i64>> {
        // Single guarded read-modify-write; no row is returned when the
        // player is missing or the balance would drop below zero.
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "UPDATE players
                 SET balance = balance + $1
                 WHERE id = $2 AND balance + $1 >= 0
                 RETURNING balance",
            )
            .bind(delta)
            .bind(id)
            .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.map(|r| r.get("balance")))
    }

    async fn tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        self.fetch_tournament(id, false).await
    }

    async fn tournament_for_update(
        &mut self,
        id: TournamentId,
    ) -> StoreResult<Option<Tournament>> {
        self.fetch_tournament(id, true).await
    }

    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournaments (id, deposit, prize_pool, status, winner_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(tournament.id)
            .bind(tournament.deposit)
            .bind(tournament.prize_pool)
            .bind(tournament.status.as_str())
            .bind(tournament.winner_id)
            .bind(tournament.created_at.naive_utc())
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_prize_pool(&mut self, id: TournamentId, amount: i64) -> StoreResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                "UPDATE tournaments SET prize_pool = $1
                 WHERE id = $2 AND status = 'open' AND $1 >= 0",
            )
            .bind(amount)
            .bind(id)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_winner(&mut self, id: TournamentId, winner: PlayerId) -> StoreResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query("UPDATE tournaments SET winner_id = $1 WHERE id = $2 AND status = 'open'")
                .bind(winner)
                .bind(id)
                .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_finished(
        &mut self,
        id: TournamentId,
        winner: Option<PlayerId>,
        prize_paid: i64,
    ) -> StoreResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                UPDATE tournaments
                SET status = 'finished', winner_id = $1, prize_paid = $2,
                    prize_pool = 0, finished_at = NOW()
                WHERE id = $3 AND status = 'open'
                "#,
            )
            .bind(winner)
            .bind(prize_paid)
            .bind(id)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn finished_tournaments(&mut self) -> StoreResult<Vec<Tournament>> {
        let sql = format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE status = 'finished'
             ORDER BY finished_at, id"
        );
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&sql).fetch_all(&mut *self.tx),
        )
        .await?;

        rows.iter().map(decode_tournament).collect()
    }

    async fn insert_enrollment(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO enrollments (player_id, tournament_id)
                 VALUES ($1, $2)
                 ON CONFLICT (player_id, tournament_id) DO NOTHING",
            )
            .bind(player_id)
            .bind(tournament_id)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_enrolled(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT 1 FROM enrollments WHERE player_id = $1 AND tournament_id = $2",
            )
            .bind(player_id)
            .bind(tournament_id)
            .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.is_some())
    }

    async fn enrolled_players(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<PlayerId>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT player_id FROM enrollments WHERE tournament_id = $1 ORDER BY player_id",
            )
            .bind(tournament_id)
            .fetch_all(&mut *self.tx),
        )
        .await?;

        Ok(rows.iter().map(|r| r.get("player_id")).collect())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgUnitOfWork { tx, query_timeout } = *self;
        with_timeout(query_timeout, tx.commit()).await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let PgUnitOfWork { tx, query_timeout } = *self;
        with_timeout(query_timeout, tx.rollback()).await?;
        Ok(())
    }
}
