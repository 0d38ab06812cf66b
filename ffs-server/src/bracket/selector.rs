//! Pairing selector
//!
//! Draws up to two eligible candidates for a round. The order is random on every
//! call, there is no stored shuffle: polling twice without deciding may show a
//! different pair.

use ffs_common::db::PlaylistItem;
use sqlx::SqliteConnection;

use crate::error::Result;

/// Result of one draw from the eligible pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draw {
    Empty,
    Single(PlaylistItem),
    Pair(PlaylistItem, PlaylistItem),
}

impl Draw {
    fn from_rows(mut rows: Vec<PlaylistItem>) -> Self {
        match (rows.pop(), rows.pop()) {
            (Some(second), Some(first)) => Draw::Pair(first, second),
            (Some(only), None) => Draw::Single(only),
            _ => Draw::Empty,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Draw::Empty => 0,
            Draw::Single(_) => 1,
            Draw::Pair(..) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Draw::Empty)
    }
}

/// Pick at most two items with `lost = false AND won_round != round`
pub async fn next_pair(conn: &mut SqliteConnection, tournament_id: i64, round: i64) -> Result<Draw> {
    let rows = sqlx::query_as::<_, PlaylistItem>(
        r#"
        SELECT item.id, item.title, item.artists, item.image
        FROM candidates c
        INNER JOIN playlist_items item ON c.item_id = item.id
        WHERE c.tournament_id = ? AND c.lost = FALSE AND c.won_round != ?
        ORDER BY RANDOM()
        LIMIT 2
        "#,
    )
    .bind(tournament_id)
    .bind(round)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Draw::from_rows(rows))
}
