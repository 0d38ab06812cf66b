//! User rows and the active-tournament pointer

use ffs_common::db::User;
use sqlx::SqliteConnection;

use crate::error::Result;

/// Create the user on first contact; no-op if it exists
pub async fn ensure_user(conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO users (id) VALUES (?)")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn get_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<User>> {
    Ok(
        sqlx::query_as::<_, User>("SELECT id, current_tournament FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?,
    )
}

pub async fn set_current_tournament(
    conn: &mut SqliteConnection,
    user_id: &str,
    tournament_id: Option<i64>,
) -> Result<()> {
    sqlx::query("UPDATE users SET current_tournament = ? WHERE id = ?")
        .bind(tournament_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Clear the pointer of whichever user has `tournament_id` active
pub async fn clear_pointer_to(conn: &mut SqliteConnection, tournament_id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE users SET current_tournament = NULL WHERE current_tournament = ?")
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
