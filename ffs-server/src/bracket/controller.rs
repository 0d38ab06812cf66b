//! Round controller
//!
//! Decides what a tournament shows next, given only what is in the store:
//!
//! | draw at current round | draw at round + 1 | result                         |
//! |-----------------------|-------------------|--------------------------------|
//! | pair                  | -                 | present pair, no mutation      |
//! | single or empty       | pair              | persist round + 1, present     |
//! | single or empty       | single            | sole survivor wins             |
//! | single or empty       | empty             | invariant violation            |
//!
//! A single item at the current round is the bye: it sits unpaired in round N
//! and meets the round-N winners in round N+1. Nobody has won round N+1 yet
//! when it is first drawn, so a single item there is the last one alive.

use ffs_common::db::{PlaylistItem, Tournament};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, error, info};

use crate::bracket::selector::{next_pair, Draw};
use crate::bracket::store;
use crate::db::{matches, playlists, tournaments, users};
use crate::error::{Error, Result};

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    AwaitingPair,
    RoundExhausted,
    TournamentWon,
}

/// What the caller shows next
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Pair {
        round: i64,
        /// Matches already decided in `round`
        matches: i64,
        items: [PlaylistItem; 2],
    },
    Winner {
        winner: PlaylistItem,
    },
}

impl Outcome {
    pub fn state(&self) -> RoundState {
        match self {
            Outcome::Pair { .. } => RoundState::AwaitingPair,
            Outcome::Winner { .. } => RoundState::TournamentWon,
        }
    }
}

/// Resolve the next pair or the winner for a locked tournament.
///
/// `tournament` must have been read under the tournament lock of the current
/// transaction.
pub async fn resolve(conn: &mut SqliteConnection, tournament: &Tournament) -> Result<Outcome> {
    if let Some(winner_id) = &tournament.winner {
        return Ok(Outcome::Winner {
            winner: load_item(conn, winner_id).await?,
        });
    }

    let round = tournament.current_round;
    match next_pair(conn, tournament.id, round).await? {
        Draw::Pair(first, second) => present(conn, tournament.id, round, first, second).await,
        draw => {
            debug!(
                tournament_id = tournament.id,
                round,
                remaining = draw.len(),
                state = ?RoundState::RoundExhausted,
                "Round exhausted"
            );
            advance(conn, tournament).await
        }
    }
}

/// Re-draw one round further and act on it. Never loops: a second empty draw
/// means the store is broken.
async fn advance(conn: &mut SqliteConnection, tournament: &Tournament) -> Result<Outcome> {
    let next_round = tournament.current_round + 1;

    match next_pair(conn, tournament.id, next_round).await? {
        Draw::Pair(first, second) => {
            if !tournaments::advance_round(conn, tournament.id, tournament.current_round).await? {
                return Err(Error::Conflict(format!(
                    "round of tournament {} moved past {} concurrently",
                    tournament.id, tournament.current_round
                )));
            }
            info!(tournament_id = tournament.id, round = next_round, "Advanced to next round");
            present(conn, tournament.id, next_round, first, second).await
        }
        Draw::Single(winner) => finish(conn, tournament, winner).await,
        Draw::Empty => {
            let err = Error::InvariantViolation {
                tournament_id: tournament.id,
                round: tournament.current_round,
                detail: format!(
                    "no eligible candidates at round {} or {}",
                    tournament.current_round, next_round
                ),
            };
            error!("{}", err);
            Err(err)
        }
    }
}

async fn present(
    conn: &mut SqliteConnection,
    tournament_id: i64,
    round: i64,
    first: PlaylistItem,
    second: PlaylistItem,
) -> Result<Outcome> {
    let matches = matches::count_for_round(conn, tournament_id, round).await?;
    debug!(
        tournament_id,
        round,
        first = %first.id,
        second = %second.id,
        state = ?RoundState::AwaitingPair,
        "Presenting pair"
    );
    Ok(Outcome::Pair {
        round,
        matches,
        items: [first, second],
    })
}

/// Persist the winner, release the user's active pointer and drop the
/// eligibility rows. The round number is left where the last match was played.
async fn finish(conn: &mut SqliteConnection, tournament: &Tournament, winner: PlaylistItem) -> Result<Outcome> {
    tournaments::set_winner(conn, tournament.id, &winner.id).await?;
    users::clear_pointer_to(conn, tournament.id).await?;
    store::delete_all(conn, tournament.id).await?;

    info!(
        tournament_id = tournament.id,
        round = tournament.current_round,
        winner = %winner.id,
        state = ?RoundState::TournamentWon,
        "Tournament won"
    );
    Ok(Outcome::Winner { winner })
}

async fn load_item(conn: &mut SqliteConnection, item_id: &str) -> Result<PlaylistItem> {
    playlists::get_item(conn, item_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("playlist item {}", item_id)))
}
