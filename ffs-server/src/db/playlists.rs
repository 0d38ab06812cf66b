//! Playlist catalog: playlists, items and their membership links
//!
//! The catalog is filled from whatever the caller fetched from the music service;
//! this module only persists it.

use ffs_common::db::{Playlist, PlaylistItem};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::Result;

pub async fn upsert_playlist(conn: &mut SqliteConnection, playlist: &Playlist) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playlists (id, name, url) VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = COALESCE(excluded.name, playlists.name),
            url = COALESCE(excluded.url, playlists.url)
        "#,
    )
    .bind(&playlist.id)
    .bind(&playlist.name)
    .bind(&playlist.url)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_playlist(conn: &mut SqliteConnection, playlist_id: &str) -> Result<Option<Playlist>> {
    Ok(
        sqlx::query_as::<_, Playlist>("SELECT id, name, url FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .fetch_optional(&mut *conn)
            .await?,
    )
}

pub async fn upsert_item(conn: &mut SqliteConnection, item: &PlaylistItem) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playlist_items (id, title, artists, image) VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            artists = excluded.artists,
            image = excluded.image
        "#,
    )
    .bind(&item.id)
    .bind(&item.title)
    .bind(&item.artists)
    .bind(&item.image)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_item(conn: &mut SqliteConnection, item_id: &str) -> Result<Option<PlaylistItem>> {
    Ok(sqlx::query_as::<_, PlaylistItem>(
        "SELECT id, title, artists, image FROM playlist_items WHERE id = ?",
    )
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?)
}

pub async fn item_ids_for_playlist(conn: &mut SqliteConnection, playlist_id: &str) -> Result<Vec<String>> {
    Ok(sqlx::query_scalar(
        "SELECT item_id FROM playlist_item_links WHERE playlist_id = ? ORDER BY item_id",
    )
    .bind(playlist_id)
    .fetch_all(&mut *conn)
    .await?)
}

/// Make `items` the exact content of the playlist.
///
/// Items are upserted and linked; links to items no longer in the playlist are
/// removed. The item rows themselves stay, other playlists or finished
/// tournaments may still reference them.
pub async fn replace_playlist_items(
    conn: &mut SqliteConnection,
    playlist_id: &str,
    items: &[PlaylistItem],
) -> Result<()> {
    let existing = item_ids_for_playlist(conn, playlist_id).await?;

    for stale in existing
        .iter()
        .filter(|id| !items.iter().any(|item| &item.id == *id))
    {
        debug!(playlist_id, item_id = %stale, "Unlinking item no longer in playlist");
        sqlx::query("DELETE FROM playlist_item_links WHERE item_id = ? AND playlist_id = ?")
            .bind(stale)
            .bind(playlist_id)
            .execute(&mut *conn)
            .await?;
    }

    for item in items {
        upsert_item(conn, item).await?;
        sqlx::query("INSERT OR IGNORE INTO playlist_item_links (item_id, playlist_id) VALUES (?, ?)")
            .bind(&item.id)
            .bind(playlist_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
