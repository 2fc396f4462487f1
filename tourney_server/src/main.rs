//! Tournament settlement server.
//!
//! Serves the settlement API over HTTP, backed by PostgreSQL or by an
//! in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;
use tourney::{
    MemoryStore, PgStore, SettlementEngine, Store,
    db::{Database, schema},
};
use tourney_server::{
    api,
    config::{CliOverrides, ServerConfig, StorageBackend},
    logging, metrics,
};

const HELP: &str = "\
Run the tournament prize settlement server

USAGE:
  tourney_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --backend    NAME        Storage backend: postgres or memory  [default: env STORAGE_BACKEND or postgres]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  STORAGE_BACKEND          postgres | memory
  SEED_DEMO_PLAYERS        Insert demo players 1 and 2 at startup (true/false)
  SETTLEMENT_MAX_ATTEMPTS  Attempts per operation on transaction conflicts
  SETTLEMENT_BACKOFF_MS    Initial backoff between attempts
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  RUST_LOG                 Log filter
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        backend: pargs.opt_value_from_str::<_, StorageBackend>("--backend")?,
    };

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported on {addr}");
    }

    let (store, db): (Arc<dyn Store>, Option<Database>) = match config.backend {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;
            db.bootstrap(config.seed_demo_players)
                .await
                .context("Failed to bootstrap schema")?;
            info!("Database connected successfully");

            let store: Arc<dyn Store> = Arc::new(PgStore::new(Arc::new(db.pool().clone())));
            (store, Some(db))
        }
        StorageBackend::Memory => {
            let store = MemoryStore::new();
            if config.seed_demo_players {
                let engine = SettlementEngine::new(Arc::new(store.clone()));
                for (id, name) in schema::DEMO_PLAYERS {
                    engine.register_player(*id, name).await?;
                }
                info!("Seeded {} demo player(s)", schema::DEMO_PLAYERS.len());
            }
            log::warn!("Using in-memory storage; state is lost on shutdown");
            let store: Arc<dyn Store> = Arc::new(store);
            (store, None)
        }
    };

    let engine =
        SettlementEngine::new(store).with_retry_policy(config.settlement.retry_policy());
    let app = api::create_router(api::AppState::new(engine));

    info!("Starting {} settlement server on {}", config.backend, config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    if let Some(db) = db {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
