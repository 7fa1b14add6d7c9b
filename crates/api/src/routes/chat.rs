use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use loremaster_runtime::{CampaignContext, CharacterSheet, ChatTurn, DmTurn};

use crate::{response::AppError, GlobalState};

pub fn chat_routes() -> Router<GlobalState> {
    Router::new()
        .route("/chat/init", post(init_session))
        .route("/chat", post(chat))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitRequest {
    pub campaign_id: String,
    pub player_name: String,
    pub character: Option<CharacterSheet>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitResponse {
    pub success: bool,
    pub context: CampaignContext,
    pub history: Vec<ChatTurn>,
}

/// Creates or replaces the campaign context. Fail-fast: a store fault here is
/// surfaced, since every later turn builds on this row.
async fn init_session(
    State(state): State<GlobalState>,
    Json(payload): Json<InitRequest>,
) -> Result<Json<InitResponse>, AppError> {
    let (context, messages) = state.engine
        .init_session(&payload.campaign_id, &payload.player_name, payload.character)
        .await
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let history = messages.into_iter()
        .map(|message| ChatTurn { role: message.role, content: message.content })
        .collect();

    Ok(Json(InitResponse { success: true, context, history }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub campaign_id: String,
    pub player_name: String,
}

/// A context-augmented turn. Only a completion failure surfaces; context and
/// rule retrieval degrade inside the engine.
async fn chat(
    State(state): State<GlobalState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<DmTurn>, AppError> {
    let turn = state.engine
        .chat(
            &payload.message,
            &payload.history,
            &payload.campaign_id,
            &payload.player_name,
        )
        .await
        .map_err(|e| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(turn))
}
