//! Tournament server for racquet-sports clubs.
//!
//! Serves the courtside tournament core over HTTP, backed by PostgreSQL (or
//! an in-memory store with `--memory`), and stamps recurring tournaments on
//! a timer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use courtside::{
    TournamentManager,
    auth::TokenVerifier,
    booking::ReservationBooking,
    db::{Database, MemoryStore, Store},
};
use cs_server::{api, config::ServerConfig, logging, metrics, recurring};
use pico_args::Arguments;

const HELP: &str = "\
Run the courtside tournament server

USAGE:
  cs_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/courtside]

FLAGS:
  --memory                 Keep all data in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required, 32+ characters)
  METRICS_BIND             Prometheus listener address (optional)
  RECURRENCE_INTERVAL_SECS Seconds between recurring-template runs, 0 disables [default: 3600]
  TOURNAMENT_K_FACTOR      Elo K-factor for tournament results [default: 40]
  DEFAULT_PLAYER_RATING    Rating for users with no stored rating [default: 1.0]
  DEFAULT_ADVANCE_DAYS     Generation window for templates [default: 14]
  SLOT_MINUTES             Length of a court slot [default: 60]
  DB_MAX_CONNECTIONS, DB_MIN_CONNECTIONS, DB_CONNECTION_TIMEOUT,
  DB_IDLE_TIMEOUT, DB_MAX_LIFETIME
                           Connection pool tuning
  A .env file in the working directory is loaded first.
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        memory: pargs.contains("--memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        tracing::info!("Prometheus metrics on http://{addr}/metrics");
    }

    let (store, database): (Arc<dyn Store>, Option<Database>) = if args.memory {
        tracing::warn!("Using the in-memory store; data is lost on shutdown");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        (store, None)
    } else {
        tracing::info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.migrate().await.context("Failed to apply migrations")?;
        tracing::info!("Database connected and migrated");
        let store: Arc<dyn Store> = Arc::new(db.store());
        (store, Some(db))
    };

    let booking = Arc::new(ReservationBooking::new(store.clone()));
    let manager = Arc::new(TournamentManager::new(store, booking, config.core.clone()));

    let recurrence_task = if config.recurrence_interval_secs > 0 {
        tracing::info!(
            "Recurring templates run every {}s",
            config.recurrence_interval_secs
        );
        Some(recurring::spawn(
            manager.clone(),
            Duration::from_secs(config.recurrence_interval_secs),
        ))
    } else {
        tracing::info!("Recurring template generation disabled");
        None
    };

    let state = api::AppState {
        manager,
        verifier: Arc::new(TokenVerifier::new(&config.security.jwt_secret)),
        database: database.clone(),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down server...");
    if let Some(task) = recurrence_task {
        task.abort();
    }
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
