//! Database initialization
//!
//! Creates the database file on first run and applies the schema idempotently
//! (`CREATE TABLE IF NOT EXISTS`), so startup against an existing database is safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open (or create) the database at `db_path` and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go through the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the schema applied
///
/// Limited to one connection that is never recycled: every SQLite `:memory:`
/// connection is a separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Apply the schema (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_accounts_table(pool).await?;
    create_geopoints_table(pool).await?;

    Ok(())
}

async fn create_accounts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            token_hash TEXT NOT NULL UNIQUE,
            admin INTEGER NOT NULL DEFAULT 0,
            created_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// AUTOINCREMENT keeps ids of deleted geopoints from being handed out again.
async fn create_geopoints_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS geopoints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            latitude REAL NOT NULL CHECK (latitude BETWEEN -90.0 AND 90.0),
            longitude REAL NOT NULL CHECK (longitude BETWEEN -180.0 AND 180.0),
            created_on TIMESTAMP NOT NULL,
            amplitudes TEXT NOT NULL,
            picture TEXT NOT NULL,
            sound TEXT NOT NULL UNIQUE,
            available INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_geopoints_available ON geopoints(available, id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_schema(&pool).await.expect("Second schema pass should succeed");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["accounts".to_string(), "geopoints".to_string()]);
    }

    #[tokio::test]
    async fn test_out_of_range_latitude_rejected_by_schema() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO accounts (name, token_hash) VALUES ('bob', 'h')")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query(
            r#"
            INSERT INTO geopoints (title, user_id, latitude, longitude, created_on, amplitudes, picture, sound)
            VALUES ('Forest', 1, 91.0, 0.0, CURRENT_TIMESTAMP, '[]', 'p', 's')
            "#,
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
