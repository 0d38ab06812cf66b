//! Tournament rows

use chrono::Utc;
use ffs_common::db::Tournament;
use sqlx::SqliteConnection;

use crate::error::Result;

const COLUMNS: &str = "id, playlist_id, user_id, current_round, winner, created_at";

pub async fn create_tournament(
    conn: &mut SqliteConnection,
    user_id: &str,
    playlist_id: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO tournaments (playlist_id, user_id, current_round, created_at) VALUES (?, ?, 0, ?)",
    )
    .bind(playlist_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_tournament(conn: &mut SqliteConnection, tournament_id: i64) -> Result<Option<Tournament>> {
    Ok(
        sqlx::query_as::<_, Tournament>(&format!("SELECT {COLUMNS} FROM tournaments WHERE id = ?"))
            .bind(tournament_id)
            .fetch_optional(&mut *conn)
            .await?,
    )
}

/// Take the database write lock and read the tournament in one statement.
///
/// SQLite has no `SELECT ... FOR UPDATE`. A no-op update as the first statement
/// of a transaction acquires the write lock (waiting out the busy timeout if
/// another decision holds it), so everything read afterwards is committed state
/// that nobody else can change until this transaction ends.
pub async fn lock_tournament(conn: &mut SqliteConnection, tournament_id: i64) -> Result<Option<Tournament>> {
    Ok(sqlx::query_as::<_, Tournament>(&format!(
        "UPDATE tournaments SET current_round = current_round WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(tournament_id)
    .fetch_optional(&mut *conn)
    .await?)
}

/// Move from `from_round` to `from_round + 1`. Returns false if the stored
/// round was not `from_round`.
pub async fn advance_round(conn: &mut SqliteConnection, tournament_id: i64, from_round: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE tournaments SET current_round = current_round + 1 WHERE id = ? AND current_round = ?",
    )
    .bind(tournament_id)
    .bind(from_round)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_winner(conn: &mut SqliteConnection, tournament_id: i64, item_id: &str) -> Result<()> {
    sqlx::query("UPDATE tournaments SET winner = ? WHERE id = ? AND winner IS NULL")
        .bind(item_id)
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete the tournament row; candidates and matches cascade
pub async fn delete_tournament(conn: &mut SqliteConnection, tournament_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tournaments WHERE id = ?")
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Unfinished tournaments of a user, oldest first, optionally skipping one
pub async fn unfinished_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    exclude: Option<i64>,
) -> Result<Vec<Tournament>> {
    Ok(sqlx::query_as::<_, Tournament>(&format!(
        r#"
        SELECT {COLUMNS} FROM tournaments
        WHERE user_id = ? AND winner IS NULL AND (? IS NULL OR id != ?)
        ORDER BY created_at ASC, id ASC
        "#
    ))
    .bind(user_id)
    .bind(exclude)
    .bind(exclude)
    .fetch_all(&mut *conn)
    .await?)
}
