//! Read-only statistics over a user's finished tournaments

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::db::statistics::{ItemPoints, WinnerCount};
use crate::error::Error;
use crate::AppState;

/// GET /api/users/:user/winners
pub async fn get_winners(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<WinnerCount>>, Error> {
    Ok(Json(state.bracket.winner_counts(&user_id).await?))
}

/// GET /api/users/:user/playlists/:playlist/statistics
///
/// Every item of the playlist with the matches it won, least points first.
pub async fn get_playlist_statistics(
    State(state): State<AppState>,
    Path((user_id, playlist_id)): Path<(String, String)>,
) -> Result<Json<Vec<ItemPoints>>, Error> {
    Ok(Json(
        state
            .bracket
            .playlist_statistics(&user_id, &playlist_id)
            .await?,
    ))
}

pub fn statistics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/:user/winners", get(get_winners))
        .route(
            "/api/users/:user/playlists/:playlist/statistics",
            get(get_playlist_statistics),
        )
}
