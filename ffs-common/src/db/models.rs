//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub current_tournament: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
}

/// A track as displayed to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlaylistItem {
    pub id: String,
    pub title: Option<String>,
    pub artists: Option<String>,
    pub image: Option<String>,
}

/// One bracket run over a playlist for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Tournament {
    pub id: i64,
    pub playlist_id: String,
    pub user_id: String,
    pub current_round: i64,
    pub winner: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }
}

/// Eligibility row for one item in one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Candidate {
    pub tournament_id: i64,
    pub item_id: String,
    pub lost: bool,
    /// Round of the most recent win, or `NEVER_WON`
    pub won_round: i64,
}

impl Candidate {
    /// Whether the item may be paired in `round`
    pub fn is_eligible(&self, round: i64) -> bool {
        !self.lost && self.won_round != round
    }
}

/// A completed pairing; never updated once written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Match {
    pub id: i64,
    pub tournament_id: i64,
    pub round_number: i64,
    pub winner: String,
    pub loser: String,
}
