use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::validate_user_id;
use crate::models::{CommandRequest, OutboundReply};
use crate::services::MessageRouter;
use crate::utils::error::ApiError;

/// `POST /api/commands/{command}`
pub async fn command_handler(
    State(router): State<Arc<MessageRouter>>,
    Path(command): Path<String>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<OutboundReply>, ApiError> {
    validate_user_id(&request.user_id)?;
    info!("Command: /{} from {}", command, request.user_id);

    let reply = match command.as_str() {
        "start" => router.start(&request.user_id).await,
        "restart" => router.restart(&request.user_id).await?,
        "config" => router.show_config(),
        "history" => router.show_history(&request.user_id).await?,
        other => return Err(ApiError::NotFound(format!("Unknown command '{}'", other))),
    };

    Ok(Json(reply))
}
