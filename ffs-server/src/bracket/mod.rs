//! Single-elimination bracket engine
//!
//! No tournament object lives in memory between requests. Every operation opens
//! a transaction, takes the tournament's write lock, reads what it needs from
//! the store, and commits or rolls back as a whole.
//!
//! - [`store`]: eligibility rows (`lost`, `won_round`)
//! - [`selector`]: random draw of up to two eligible items
//! - [`controller`]: pair / advance / winner decision
//! - [`recorder`]: applies one decision

pub mod controller;
pub mod recorder;
pub mod selector;
pub mod store;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ffs_common::db::{Playlist, PlaylistItem, Tournament};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::db::{matches, playlists, statistics, tournaments, users};
use crate::error::{Error, Result};

pub use controller::{Outcome, RoundState};

/// Unfinished tournament other than the active one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteTournament {
    pub id: i64,
    pub playlist_id: String,
    pub playlist_name: Option<String>,
    pub started: DateTime<Utc>,
    pub current_round: i64,
    pub matches_completed: i64,
}

/// Bracket operations over a connection pool
#[derive(Clone)]
pub struct Bracket {
    pool: SqlitePool,
}

impl Bracket {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Start a tournament for `user_id` over `playlist` and make it active.
    ///
    /// The playlist and its items are stored first; duplicate item ids keep
    /// their first occurrence.
    pub async fn start_tournament(
        &self,
        user_id: &str,
        playlist: Playlist,
        items: Vec<PlaylistItem>,
    ) -> Result<i64> {
        let items = dedupe_items(items);
        if items.is_empty() {
            return Err(Error::InvalidInput(format!(
                "playlist {} has no items",
                playlist.id
            )));
        }

        let mut tx = self.pool.begin().await?;

        // First statement writes, so the transaction holds the write lock
        // before the pointer is checked
        users::ensure_user(&mut tx, user_id).await?;
        let user = users::get_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;
        if let Some(active) = user.current_tournament {
            return Err(Error::Conflict(format!(
                "user {} already has active tournament {}",
                user_id, active
            )));
        }

        playlists::upsert_playlist(&mut tx, &playlist).await?;
        playlists::replace_playlist_items(&mut tx, &playlist.id, &items).await?;

        let tournament_id = tournaments::create_tournament(&mut tx, user_id, &playlist.id).await?;
        let item_ids: Vec<String> = items.into_iter().map(|item| item.id).collect();
        store::initialize(&mut tx, tournament_id, &item_ids).await?;
        users::set_current_tournament(&mut tx, user_id, Some(tournament_id)).await?;

        tx.commit().await?;

        info!(
            tournament_id,
            user_id,
            playlist_id = %playlist.id,
            items = item_ids.len(),
            "Started tournament"
        );
        Ok(tournament_id)
    }

    /// Next pair to decide, or the winner.
    ///
    /// May persist a round advance or the winner, so it runs under the lock
    /// like any decision.
    pub async fn poll_next_pair(&self, tournament_id: i64) -> Result<Outcome> {
        let mut tx = self.pool.begin().await?;
        let tournament = lock_existing(&mut tx, tournament_id).await?;

        let outcome = controller::resolve(&mut tx, &tournament).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Record `winner_id` beating `loser_id` and return what comes next.
    ///
    /// `round`, when given, must be the tournament's current round. An earlier
    /// round is a conflict, a negative or future one is invalid input.
    pub async fn submit_decision(
        &self,
        tournament_id: i64,
        winner_id: &str,
        loser_id: &str,
        round: Option<i64>,
    ) -> Result<Outcome> {
        let mut tx = self.pool.begin().await?;
        let tournament = lock_existing(&mut tx, tournament_id).await?;

        if tournament.is_finished() {
            return Err(Error::Conflict(format!(
                "tournament {} is already finished",
                tournament_id
            )));
        }
        match round {
            Some(round) if round < 0 || round > tournament.current_round => {
                return Err(Error::InvalidInput(format!(
                    "round {} is not a round of tournament {} (current {})",
                    round, tournament_id, tournament.current_round
                )));
            }
            // A decision for a pair of an earlier round: replayed or raced
            Some(round) if round < tournament.current_round => {
                return Err(Error::Conflict(format!(
                    "round {} of tournament {} is over (current {})",
                    round, tournament_id, tournament.current_round
                )));
            }
            _ => {}
        }

        recorder::record_match(
            &mut tx,
            tournament_id,
            tournament.current_round,
            winner_id,
            loser_id,
        )
        .await?;
        let outcome = controller::resolve(&mut tx, &tournament).await?;

        tx.commit().await?;
        Ok(outcome)
    }

    /// Delete an unfinished tournament with its candidates and matches
    pub async fn abandon_tournament(&self, tournament_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let tournament = lock_existing(&mut tx, tournament_id).await?;

        if tournament.is_finished() {
            return Err(Error::Conflict(format!(
                "tournament {} is finished and kept for statistics",
                tournament_id
            )));
        }

        users::clear_pointer_to(&mut tx, tournament_id).await?;
        let candidates = store::delete_all(&mut tx, tournament_id).await?;
        let played = matches::delete_for_tournament(&mut tx, tournament_id).await?;
        tournaments::delete_tournament(&mut tx, tournament_id).await?;

        tx.commit().await?;

        info!(
            tournament_id,
            user_id = %tournament.user_id,
            round = tournament.current_round,
            candidates,
            matches = played,
            "Abandoned tournament"
        );
        Ok(())
    }

    pub async fn matches_completed_in_round(&self, tournament_id: i64, round: i64) -> Result<i64> {
        if round < 0 {
            return Err(Error::InvalidInput(format!("negative round {}", round)));
        }

        let mut conn = self.pool.acquire().await?;
        get_existing(&mut conn, tournament_id).await?;
        matches::count_for_round(&mut conn, tournament_id, round).await
    }

    /// The tournament the user's pointer refers to
    pub async fn active_tournament(&self, user_id: &str) -> Result<Tournament> {
        let mut conn = self.pool.acquire().await?;

        let tournament_id = users::get_user(&mut conn, user_id)
            .await?
            .and_then(|user| user.current_tournament)
            .ok_or_else(|| Error::NotFound(format!("no active tournament for user {}", user_id)))?;

        get_existing(&mut conn, tournament_id).await
    }

    /// Make an unfinished tournament of the user active again
    pub async fn resume_tournament(&self, user_id: &str, tournament_id: i64) -> Result<Tournament> {
        let mut tx = self.pool.begin().await?;
        let tournament = lock_existing(&mut tx, tournament_id).await?;

        if tournament.user_id != user_id {
            return Err(Error::NotFound(format!(
                "tournament {} for user {}",
                tournament_id, user_id
            )));
        }
        if tournament.is_finished() {
            return Err(Error::Conflict(format!(
                "tournament {} is already finished",
                tournament_id
            )));
        }

        users::ensure_user(&mut tx, user_id).await?;
        let active = users::get_user(&mut tx, user_id)
            .await?
            .and_then(|user| user.current_tournament);
        match active {
            Some(active) if active == tournament_id => {
                debug!(tournament_id, user_id, "Tournament already active");
            }
            Some(active) => {
                return Err(Error::Conflict(format!(
                    "user {} already has active tournament {}",
                    user_id, active
                )));
            }
            None => {
                users::set_current_tournament(&mut tx, user_id, Some(tournament_id)).await?;
                info!(tournament_id, user_id, round = tournament.current_round, "Resumed tournament");
            }
        }

        tx.commit().await?;
        Ok(tournament)
    }

    /// Unfinished tournaments of the user, excluding the active one
    pub async fn incomplete_tournaments(&self, user_id: &str) -> Result<Vec<IncompleteTournament>> {
        let mut conn = self.pool.acquire().await?;

        let active = users::get_user(&mut conn, user_id)
            .await?
            .and_then(|user| user.current_tournament);

        let mut listing = Vec::new();
        for tournament in tournaments::unfinished_for_user(&mut conn, user_id, active).await? {
            let playlist_name = playlists::get_playlist(&mut conn, &tournament.playlist_id)
                .await?
                .and_then(|playlist| playlist.name);
            let matches_completed = matches::count_for_tournament(&mut conn, tournament.id).await?;

            listing.push(IncompleteTournament {
                id: tournament.id,
                playlist_id: tournament.playlist_id,
                playlist_name,
                started: tournament.created_at,
                current_round: tournament.current_round,
                matches_completed,
            });
        }

        Ok(listing)
    }

    pub async fn winner_counts(&self, user_id: &str) -> Result<Vec<statistics::WinnerCount>> {
        let mut conn = self.pool.acquire().await?;
        statistics::winner_counts(&mut conn, user_id).await
    }

    pub async fn playlist_statistics(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<Vec<statistics::ItemPoints>> {
        let mut conn = self.pool.acquire().await?;
        if playlists::get_playlist(&mut conn, playlist_id).await?.is_none() {
            return Err(Error::NotFound(format!("playlist {}", playlist_id)));
        }
        statistics::playlist_points(&mut conn, user_id, playlist_id).await
    }
}

async fn lock_existing(conn: &mut SqliteConnection, tournament_id: i64) -> Result<Tournament> {
    tournaments::lock_tournament(conn, tournament_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("tournament {}", tournament_id)))
}

async fn get_existing(conn: &mut SqliteConnection, tournament_id: i64) -> Result<Tournament> {
    tournaments::get_tournament(conn, tournament_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("tournament {}", tournament_id)))
}

fn dedupe_items(items: Vec<PlaylistItem>) -> Vec<PlaylistItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
