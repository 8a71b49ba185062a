use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::dialogue::{Action, Reply};
use crate::domain::UserId;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// Callback data of the pressed button.
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

pub async fn start(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Reply>, AppError> {
    let reply = state.controller.start(UserId::new(user_id)).await?;
    Ok(Json(reply))
}

pub async fn action(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<Reply>, AppError> {
    let action: Action = body
        .data
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{}", e)))?;
    let reply = state.controller.press(UserId::new(user_id), action).await?;
    Ok(Json(reply))
}

pub async fn message(
    Path(user_id): Path<i64>,
    State(state): State<AppState>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<Reply>, AppError> {
    let reply = state
        .controller
        .message(UserId::new(user_id), &body.text)
        .await?;
    Ok(Json(reply))
}
