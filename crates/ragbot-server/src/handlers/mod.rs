pub mod callback;
pub mod commands;
pub mod health;
pub mod messages;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::models::DEFAULT_ID;
use crate::state::AppState;
use crate::utils::error::ApiError;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let api_routes = Router::new()
        .route("/api/commands/{command}", post(commands::command_handler))
        .route("/api/messages", post(messages::message_handler))
        .route("/api/callbacks", post(callback::callback_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

/// `DEFAULT` names the seed transcript and can never be a chat.
pub(crate) fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if user_id == DEFAULT_ID {
        return Err(ApiError::BadRequest(format!("user_id '{}' is reserved", DEFAULT_ID)));
    }
    Ok(())
}
