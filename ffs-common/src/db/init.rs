//! Database initialization
//!
//! Creates the database file on first run and brings the schema up to date.
//! Every table is created with `CREATE TABLE IF NOT EXISTS`, so calling
//! [`init_database`] against an existing database is safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// How long a connection waits on a locked database before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sentinel stored in `candidates.won_round` for items that never won a match
pub const NEVER_WON: i64 = -1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go through the connect options so every pooled connection gets
    // them, not just the one that happens to run a PRAGMA statement.
    // WAL lets pollers read while one decision is being written.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

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

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;
    create_playlists_table(pool).await?;
    create_playlist_items_table(pool).await?;
    create_playlist_item_links_table(pool).await?;
    create_tournaments_table(pool).await?;
    create_candidates_table(pool).await?;
    create_matches_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Users are created on first use; `current_tournament` is the active pointer.
async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            current_tournament INTEGER REFERENCES tournaments(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_playlists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY,
            name TEXT,
            url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_playlist_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist_items (
            id TEXT PRIMARY KEY,
            title TEXT,
            artists TEXT,
            image TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_playlist_item_links_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist_item_links (
            item_id TEXT NOT NULL REFERENCES playlist_items(id) ON DELETE CASCADE,
            playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
            PRIMARY KEY (item_id, playlist_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tournaments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tournaments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playlist_id TEXT NOT NULL REFERENCES playlists(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            current_round INTEGER NOT NULL DEFAULT 0 CHECK (current_round >= 0),
            winner TEXT REFERENCES playlist_items(id),
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_tournaments_user ON tournaments(user_id, playlist_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Eligibility store: one row per (tournament, item) while the bracket is live
async fn create_candidates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            item_id TEXT NOT NULL REFERENCES playlist_items(id),
            lost BOOLEAN NOT NULL DEFAULT FALSE,
            won_round INTEGER NOT NULL DEFAULT -1,
            PRIMARY KEY (tournament_id, item_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_matches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            round_number INTEGER NOT NULL,
            winner TEXT NOT NULL REFERENCES playlist_items(id),
            loser TEXT NOT NULL REFERENCES playlist_items(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_matches_round ON matches(tournament_id, round_number)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
