//! Eligibility store
//!
//! One `candidates` row per (tournament, item). `lost` only ever goes from false
//! to true; `won_round` records the round of the item's latest win so the item
//! sits out the rest of that round and becomes eligible again once the
//! tournament's round number moves past it.

use ffs_common::db::{Candidate, NEVER_WON};
use sqlx::SqliteConnection;

use crate::error::{Error, Result};

/// Create one live row per item.
///
/// Refuses to touch a tournament that already has rows; a live bracket is never
/// re-initialized.
pub async fn initialize(conn: &mut SqliteConnection, tournament_id: i64, item_ids: &[String]) -> Result<u64> {
    if item_ids.is_empty() {
        return Err(Error::InvalidInput(format!(
            "tournament {} needs at least one item",
            tournament_id
        )));
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE tournament_id = ?")
        .bind(tournament_id)
        .fetch_one(&mut *conn)
        .await?;
    if existing > 0 {
        return Err(Error::Conflict(format!(
            "tournament {} is already initialized ({} candidates)",
            tournament_id, existing
        )));
    }

    let mut inserted = 0;
    for item_id in item_ids {
        let result = sqlx::query(
            "INSERT INTO candidates (tournament_id, item_id, lost, won_round) VALUES (?, ?, FALSE, ?)",
        )
        .bind(tournament_id)
        .bind(item_id)
        .bind(NEVER_WON)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

pub async fn mark_lost(conn: &mut SqliteConnection, tournament_id: i64, item_id: &str) -> Result<()> {
    sqlx::query("UPDATE candidates SET lost = TRUE WHERE tournament_id = ? AND item_id = ?")
        .bind(tournament_id)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn mark_won(conn: &mut SqliteConnection, tournament_id: i64, item_id: &str, round: i64) -> Result<()> {
    sqlx::query("UPDATE candidates SET won_round = ? WHERE tournament_id = ? AND item_id = ?")
        .bind(round)
        .bind(tournament_id)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn get_candidate(
    conn: &mut SqliteConnection,
    tournament_id: i64,
    item_id: &str,
) -> Result<Option<Candidate>> {
    Ok(sqlx::query_as::<_, Candidate>(
        r#"
        SELECT tournament_id, item_id, lost, won_round
        FROM candidates WHERE tournament_id = ? AND item_id = ?
        "#,
    )
    .bind(tournament_id)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?)
}

pub async fn candidates(conn: &mut SqliteConnection, tournament_id: i64) -> Result<Vec<Candidate>> {
    Ok(sqlx::query_as::<_, Candidate>(
        r#"
        SELECT tournament_id, item_id, lost, won_round
        FROM candidates WHERE tournament_id = ?
        ORDER BY item_id
        "#,
    )
    .bind(tournament_id)
    .fetch_all(&mut *conn)
    .await?)
}

/// Drop every row of the tournament (completion or teardown)
pub async fn delete_all(conn: &mut SqliteConnection, tournament_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM candidates WHERE tournament_id = ?")
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
