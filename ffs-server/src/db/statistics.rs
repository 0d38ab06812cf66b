//! Read-only statistics over finished tournaments

use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use crate::error::Result;

/// An item that won at least one finished tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct WinnerCount {
    pub id: String,
    pub title: Option<String>,
    pub artists: Option<String>,
    pub image: Option<String>,
    pub wins: i64,
}

/// A playlist item with the number of matches it won
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ItemPoints {
    pub id: String,
    pub title: Option<String>,
    pub artists: Option<String>,
    pub image: Option<String>,
    pub points: i64,
}

/// How often each item ended up as a user's favourite
pub async fn winner_counts(conn: &mut SqliteConnection, user_id: &str) -> Result<Vec<WinnerCount>> {
    Ok(sqlx::query_as::<_, WinnerCount>(
        r#"
        SELECT pi.id, pi.title, pi.artists, pi.image, COUNT(*) AS wins
        FROM tournaments t
        INNER JOIN playlist_items pi ON pi.id = t.winner
        WHERE t.user_id = ? AND t.winner IS NOT NULL
        GROUP BY pi.id
        ORDER BY wins DESC, pi.id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?)
}

/// Every item of the playlist with the matches it won in the user's finished
/// tournaments over that playlist, least points first
pub async fn playlist_points(
    conn: &mut SqliteConnection,
    user_id: &str,
    playlist_id: &str,
) -> Result<Vec<ItemPoints>> {
    Ok(sqlx::query_as::<_, ItemPoints>(
        r#"
        WITH wins AS (
            SELECT m.winner AS item_id, COUNT(*) AS ct
            FROM tournaments t
            INNER JOIN matches m ON m.tournament_id = t.id
            WHERE t.user_id = ?1 AND t.playlist_id = ?2 AND t.winner IS NOT NULL
            GROUP BY m.winner
        )
        SELECT pi.id, pi.title, pi.artists, pi.image, CAST(IFNULL(wins.ct, 0) AS INTEGER) AS points
        FROM playlist_item_links l
        INNER JOIN playlist_items pi ON pi.id = l.item_id
        LEFT JOIN wins ON wins.item_id = l.item_id
        WHERE l.playlist_id = ?2
        ORDER BY points ASC, pi.id ASC
        "#,
    )
    .bind(user_id)
    .bind(playlist_id)
    .fetch_all(&mut *conn)
    .await?)
}
