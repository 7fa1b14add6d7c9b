use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use loremaster_runtime::DmTurn;

use crate::{response::AppError, GlobalState};

pub fn respond_routes() -> Router<GlobalState> {
    Router::new()
        .route("/respond", post(respond))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RespondRequest {
    pub input: String,
    #[serde(default)]
    pub history: String,
}

/// Raw prompt passthrough. The transcript stays caller-held; nothing is
/// persisted and no retrieval happens.
async fn respond(
    State(state): State<GlobalState>,
    Json(payload): Json<RespondRequest>,
) -> Result<Json<DmTurn>, AppError> {
    let turn = state.engine
        .respond(&payload.input, &payload.history)
        .await
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(turn))
}
