use axum::{Json, extract::State, extract::rejection::JsonRejection};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{GatewayError, Result};
use crate::models::{ChatRequest, ChatResponse};
use crate::state::AppState;

// post handler
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected chat body");
        GatewayError::BadRequest("invalid chat request".to_string())
    })?;

    if payload.message.trim().is_empty() {
        return Err(GatewayError::BadRequest("message must not be empty".to_string()));
    }

    info!(
        chat_type = ?payload.chat_type,
        has_file = payload.file_url.is_some(),
        "Chat request"
    );

    let message = state.llm.complete(&payload).await?;
    Ok(Json(ChatResponse { message }))
}
