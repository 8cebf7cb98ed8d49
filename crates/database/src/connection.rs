use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Opens a connection pool on the journal database.
///
/// `DATABASE_URL`, when set (directly or through `.env`), takes precedence over
/// the configured url. The database file is created if it does not exist yet.
pub async fn connect(settings: &DatabaseSettings) -> Result<SqlitePool, DbError> {
    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| settings.url.clone());

    let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::info!(url = %database_url, "Connected to the trade journal database.");
    Ok(pool)
}

/// Opens a private in-memory database.
///
/// An in-memory SQLite database lives only as long as its connection, so the
/// pool is pinned to a single connection that is never recycled.
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
