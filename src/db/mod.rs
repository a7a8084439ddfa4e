mod models;
mod repository;
mod sqlite;

pub use models::*;
pub use repository::*;
pub use sqlite::SqliteStore;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("inventory.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;

    prepare(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Single-connection in-memory database, used by tests.
pub async fn init_in_memory() -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    prepare(&pool).await?;
    Ok(pool)
}

async fn prepare(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    run_migrations(pool).await
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: users, tokens, sessions, inventory items
    let has_items_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='inventory_items'",
    )
    .fetch_optional(pool)
    .await?;
    if has_items_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();

        assert!(dir.path().join("inventory.db").exists());

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["auth_tokens", "inventory_items", "sessions", "users"]);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();
        pool.close().await;

        // Second start against the same file must not fail
        init(dir.path()).await.unwrap();
    }
}
