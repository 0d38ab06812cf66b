//! Tournament endpoints
//!
//! Thin wrappers over [`crate::bracket::Bracket`]; every handler is one
//! bracket operation and maps its error through `IntoResponse`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use ffs_common::db::{Playlist, PlaylistItem, Tournament};
use serde::{Deserialize, Serialize};

use crate::bracket::{IncompleteTournament, Outcome};
use crate::error::Error;
use crate::AppState;

/// POST /api/users/:user/tournaments body
#[derive(Debug, Deserialize)]
pub struct StartTournamentRequest {
    pub playlist: Playlist,
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Serialize)]
pub struct StartTournamentResponse {
    pub tournament_id: i64,
}

/// POST /api/tournaments/:id/decisions body
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub winner: String,
    pub loser: String,
    /// Round the pair was shown in; omitted means the current round
    #[serde(default)]
    pub round: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MatchCountResponse {
    pub tournament_id: i64,
    pub round: i64,
    pub matches_completed: i64,
}

/// POST /api/users/:user/tournaments
pub async fn start_tournament(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<StartTournamentRequest>,
) -> Result<(StatusCode, Json<StartTournamentResponse>), Error> {
    let tournament_id = state
        .bracket
        .start_tournament(&user_id, request.playlist, request.items)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartTournamentResponse { tournament_id }),
    ))
}

/// GET /api/users/:user/tournaments/active
pub async fn get_active_tournament(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Tournament>, Error> {
    Ok(Json(state.bracket.active_tournament(&user_id).await?))
}

/// GET /api/users/:user/tournaments/incomplete
pub async fn list_incomplete_tournaments(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<IncompleteTournament>>, Error> {
    Ok(Json(state.bracket.incomplete_tournaments(&user_id).await?))
}

/// POST /api/users/:user/tournaments/:id/resume
pub async fn resume_tournament(
    State(state): State<AppState>,
    Path((user_id, tournament_id)): Path<(String, i64)>,
) -> Result<Json<Tournament>, Error> {
    Ok(Json(
        state
            .bracket
            .resume_tournament(&user_id, tournament_id)
            .await?,
    ))
}

/// GET /api/tournaments/:id/next
pub async fn get_next_pair(
    State(state): State<AppState>,
    Path(tournament_id): Path<i64>,
) -> Result<Json<Outcome>, Error> {
    Ok(Json(state.bracket.poll_next_pair(tournament_id).await?))
}

/// POST /api/tournaments/:id/decisions
///
/// Records the decision and answers with the next pair or the winner.
pub async fn submit_decision(
    State(state): State<AppState>,
    Path(tournament_id): Path<i64>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<Outcome>, Error> {
    let outcome = state
        .bracket
        .submit_decision(tournament_id, &request.winner, &request.loser, request.round)
        .await?;
    Ok(Json(outcome))
}

/// DELETE /api/tournaments/:id
pub async fn abandon_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<i64>,
) -> Result<StatusCode, Error> {
    state.bracket.abandon_tournament(tournament_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/tournaments/:id/rounds/:round/matches
pub async fn get_matches_in_round(
    State(state): State<AppState>,
    Path((tournament_id, round)): Path<(i64, i64)>,
) -> Result<Json<MatchCountResponse>, Error> {
    let matches_completed = state
        .bracket
        .matches_completed_in_round(tournament_id, round)
        .await?;

    Ok(Json(MatchCountResponse {
        tournament_id,
        round,
        matches_completed,
    }))
}

pub fn tournament_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/:user/tournaments", post(start_tournament))
        .route("/api/users/:user/tournaments/active", get(get_active_tournament))
        .route(
            "/api/users/:user/tournaments/incomplete",
            get(list_incomplete_tournaments),
        )
        .route(
            "/api/users/:user/tournaments/:id/resume",
            post(resume_tournament),
        )
        .route("/api/tournaments/:id", delete(abandon_tournament))
        .route("/api/tournaments/:id/next", get(get_next_pair))
        .route("/api/tournaments/:id/decisions", post(submit_decision))
        .route(
            "/api/tournaments/:id/rounds/:round/matches",
            get(get_matches_in_round),
        )
}
