use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::config::Config;

/// Creates a lazily connecting PostgreSQL pool against `DATABASE_URL` / `DB_NAME`.
///
/// No connection is attempted here, so an unreachable database never blocks startup.
pub fn create_pool(config: &Config) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL is not a valid PostgreSQL connection string")?
        .database(&config.db_name);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy_with(options);

    info!(database = %config.db_name, "PostgreSQL pool configured");
    Ok(pool)
}

/// Pings the database and logs the result. Failure is not fatal.
pub async fn check_connection(pool: &PgPool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => {
            info!("Successfully connected to PostgreSQL");
            true
        }
        Err(e) => {
            error!(error = %e, "Could not connect to PostgreSQL");
            false
        }
    }
}

pub async fn run_migrations(pool: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(pool).await {
        warn!(error = %e, "migrations failed; continuing");
    }
}
