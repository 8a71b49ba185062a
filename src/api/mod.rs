pub mod chat;
pub mod health;

use crate::dialogue::ChatController;
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct AppState {
    pub controller: Arc<ChatController>,
    pub bot_token: Arc<str>,
}

impl AppState {
    pub fn new(controller: Arc<ChatController>, bot_token: impl Into<Arc<str>>) -> Self {
        Self {
            controller,
            bot_token: bot_token.into(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let chat = Router::new()
        .route("/v1/chat/:user_id/start", post(chat::start))
        .route("/v1/chat/:user_id/action", post(chat::action))
        .route("/v1/chat/:user_id/message", post(chat::message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bot_token,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .merge(chat)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Rejects requests without `Authorization: Bearer <BOT_TOKEN>`.
async fn require_bot_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if tokens_match(token, &state.bot_token) => Ok(next.run(request).await),
        _ => Err(AppError::Unauthorized),
    }
}

/// Byte comparison whose running time depends only on the lengths.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
