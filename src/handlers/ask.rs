//! Question-answering endpoint.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::chain::ChatTurn;
use crate::errors::{AppError, Result};
use crate::AppState;

/// Request body for `POST /ask`.
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    /// The question to answer. The length bound renders as 422; emptiness
    /// is checked separately so it renders as 400.
    #[validate(length(max = 5000, message = "question must be at most 5000 characters"))]
    pub question: String,

    /// Prior conversation turns, oldest first.
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    let start = Instant::now();

    if request.question.trim().is_empty() {
        return Err(AppError::Validation {
            message: "Question cannot be empty".to_string(),
        });
    }
    request.validate().map_err(|e| AppError::Unprocessable {
        message: e.to_string(),
    })?;

    let result = state
        .chain
        .ask(&request.question, &request.chat_history)
        .await?;

    info!(
        question_len = request.question.chars().count(),
        history_turns = request.chat_history.len(),
        sources = result.sources.len(),
        answer_len = result.answer.chars().count(),
        latency_ms = start.elapsed().as_millis() as u64,
        "question answered"
    );

    Ok(Json(AskResponse {
        answer: result.answer,
    }))
}
