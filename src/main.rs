// src/main.rs

use dotenvy::dotenv;
use picquiz::{config::Config, routes, seed::seed_test_data, state::AppState};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CONNECT_RETRIES: u32 = 5;

/// Logs to stdout and to a daily file under `logs/`. Keep the guard alive
/// for as long as file logging is wanted.
fn init_tracing(config: &Config) -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily("logs", "quiz.log"));

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.rust_log))
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let pool = connect_with_retry(&config.database_url).await?;
    tracing::info!("Connected to {}", config.database_url);

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Schema is up to date");

    if config.seed_test_data {
        match seed_test_data(&pool).await {
            Ok(0) => {}
            Ok(n) => tracing::info!("Seeded {} test accounts", n),
            Err(e) => tracing::error!("Failed to seed test data: {:?}", e),
        }
    }

    if config.oauth.is_none() {
        tracing::info!("OAuth login disabled (provider not configured)");
    }

    let bind_addr = config.bind_addr.clone();
    let app = routes::create_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Quiz server listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Opens the SQLite pool, creating the database file on first start.
async fn connect_with_retry(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let mut attempt = 0;
    loop {
        let result = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < CONNECT_RETRIES => {
                attempt += 1;
                tracing::warn!("Database not ready ({}), retrying in 2s (attempt {})", e, attempt);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => {
                tracing::error!("Giving up on the database after {} retries: {}", CONNECT_RETRIES, e);
                return Err(e);
            }
        }
    }
}
