use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use governor::{Quota, RateLimiter};
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{EventRepository, GuestRepository};
use crate::domain::services::{
    broadcaster::Broadcaster, checkin_service::CheckInService,
    import_service::SeatingImporter, seating_service::SeatingService,
};
use crate::infra::upload_store::LocalUploadStore;
use crate::infra::repositories::{
    postgres_event_repo::PostgresEventRepo, postgres_guest_repo::PostgresGuestRepo,
    sqlite_event_repo::SqliteEventRepo, sqlite_guest_repo::SqliteGuestRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        build_state(
            config,
            Arc::new(PostgresEventRepo::new(pool.clone())),
            Arc::new(PostgresGuestRepo::new(pool)),
        )
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        build_state(
            config,
            Arc::new(SqliteEventRepo::new(pool.clone())),
            Arc::new(SqliteGuestRepo::new(pool)),
        )
    }
}

/// Wires services around the chosen repositories. Shared by tests.
pub fn build_state(
    config: &Config,
    event_repo: Arc<dyn EventRepository>,
    guest_repo: Arc<dyn GuestRepository>,
) -> AppState {
    let broadcaster = Arc::new(Broadcaster::new());
    let per_minute = NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);

    AppState {
        config: config.clone(),
        upload_store: Arc::new(LocalUploadStore::new(&config.upload_dir)),
        importer: Arc::new(SeatingImporter::new(guest_repo.clone())),
        seating_service: Arc::new(SeatingService::new(event_repo.clone(), guest_repo.clone())),
        checkin_service: Arc::new(CheckInService::new(event_repo.clone(), guest_repo.clone(), broadcaster.clone())),
        rate_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
        broadcaster,
        event_repo,
        guest_repo,
    }
}

pub async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
