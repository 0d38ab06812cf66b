//! Match recorder
//!
//! Applies one decision: re-check eligibility, append the match, eliminate the
//! loser, mark the winner for the round. Callers run this inside the
//! transaction that holds the tournament lock, so the four steps commit or roll
//! back together and the re-check sees every previously committed decision.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::bracket::store;
use crate::db::matches;
use crate::error::{Error, Result};

/// Record `winner_id` beating `loser_id` in `round`; returns the match id.
///
/// Ids that are not part of the tournament are invalid input. Ids that are part
/// of it but already eliminated, or already played this round, are a conflict:
/// that is what a replayed or concurrent duplicate decision looks like.
pub async fn record_match(
    conn: &mut SqliteConnection,
    tournament_id: i64,
    round: i64,
    winner_id: &str,
    loser_id: &str,
) -> Result<i64> {
    if winner_id == loser_id {
        return Err(Error::InvalidInput(format!(
            "winner and loser are the same item {} (tournament {}, round {})",
            winner_id, tournament_id, round
        )));
    }

    for item_id in [winner_id, loser_id] {
        let candidate = store::get_candidate(conn, tournament_id, item_id)
            .await?
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "item {} is not part of tournament {}",
                    item_id, tournament_id
                ))
            })?;

        if candidate.lost {
            return Err(Error::Conflict(format!(
                "item {} is already eliminated from tournament {} (round {})",
                item_id, tournament_id, round
            )));
        }
        if candidate.won_round == round {
            return Err(Error::Conflict(format!(
                "item {} already played in round {} of tournament {}",
                item_id, round, tournament_id
            )));
        }
    }

    let match_id = matches::insert_match(conn, tournament_id, round, winner_id, loser_id).await?;
    store::mark_lost(conn, tournament_id, loser_id).await?;
    store::mark_won(conn, tournament_id, winner_id, round).await?;

    debug!(tournament_id, round, winner_id, loser_id, match_id, "Recorded match");
    Ok(match_id)
}
