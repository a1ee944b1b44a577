use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::validate_user_id;
use crate::models::{MessageRequest, OutboundReply};
use crate::services::{MessageRouter, RouterOutcome};
use crate::utils::error::ApiError;

pub async fn message_handler(
    State(router): State<Arc<MessageRouter>>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<OutboundReply>, ApiError> {
    let start_time = Instant::now();
    validate_user_id(&request.user_id)?;

    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Message text is empty".to_string()));
    }

    info!("Message: user={}, len={}", request.user_id, request.text.len());

    let outcome = router.handle_message(&request.user_id, &request.text).await?;

    let kind = match &outcome {
        RouterOutcome::Action { .. } => "action",
        RouterOutcome::Reply { .. } => "reply",
    };
    info!(
        "Message handled: user={}, outcome={}, took={:?}",
        request.user_id,
        kind,
        start_time.elapsed()
    );

    Ok(Json(outcome.into_reply()))
}
