//! Database module providing PostgreSQL connection pooling and schema bootstrap.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod schema;
pub mod timeouts;

pub use config::DatabaseConfig;

use timeouts::{SCHEMA_TIMEOUT, TimeoutResult, with_timeout};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tourney::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables and, if `seed_demo_players` is set, insert the
    /// demo accounts.
    pub async fn bootstrap(&self, seed_demo_players: bool) -> TimeoutResult<()> {
        with_timeout(SCHEMA_TIMEOUT, sqlx::raw_sql(schema::SCHEMA).execute(&self.pool)).await?;

        if seed_demo_players {
            for (id, name) in schema::DEMO_PLAYERS {
                with_timeout(
                    SCHEMA_TIMEOUT,
                    sqlx::query(schema::SEED_PLAYER)
                        .bind(*id)
                        .bind(*name)
                        .execute(&self.pool),
                )
                .await?;
            }
            log::info!("Seeded {} demo player(s)", schema::DEMO_PLAYERS.len());
        }

        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
