//! Match rows (append-only)

use ffs_common::db::Match;
use sqlx::SqliteConnection;

use crate::error::Result;

pub async fn insert_match(
    conn: &mut SqliteConnection,
    tournament_id: i64,
    round: i64,
    winner: &str,
    loser: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO matches (tournament_id, round_number, winner, loser) VALUES (?, ?, ?, ?)",
    )
    .bind(tournament_id)
    .bind(round)
    .bind(winner)
    .bind(loser)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn count_for_round(conn: &mut SqliteConnection, tournament_id: i64, round: i64) -> Result<i64> {
    Ok(sqlx::query_scalar(
        "SELECT COUNT(*) FROM matches WHERE tournament_id = ? AND round_number = ?",
    )
    .bind(tournament_id)
    .bind(round)
    .fetch_one(&mut *conn)
    .await?)
}

pub async fn count_for_tournament(conn: &mut SqliteConnection, tournament_id: i64) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE tournament_id = ?")
        .bind(tournament_id)
        .fetch_one(&mut *conn)
        .await?)
}

pub async fn matches_for_tournament(conn: &mut SqliteConnection, tournament_id: i64) -> Result<Vec<Match>> {
    Ok(sqlx::query_as::<_, Match>(
        r#"
        SELECT id, tournament_id, round_number, winner, loser
        FROM matches WHERE tournament_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(tournament_id)
    .fetch_all(&mut *conn)
    .await?)
}

/// Teardown only; matches are never deleted one by one
pub async fn delete_for_tournament(conn: &mut SqliteConnection, tournament_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM matches WHERE tournament_id = ?")
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
