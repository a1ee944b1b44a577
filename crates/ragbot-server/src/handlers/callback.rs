use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{info, warn};

use super::validate_user_id;
use crate::models::{AdjustmentPayload, CallbackRequest, OutboundReply};
use crate::services::{AdjustmentError, AdjustmentService};
use crate::utils::error::ApiError;

/// A button press on an adjustment control.
pub async fn callback_handler(
    State(adjustments): State<Arc<AdjustmentService>>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<OutboundReply>, ApiError> {
    validate_user_id(&request.user_id)?;

    let payload = AdjustmentPayload::parse(&request.data).map_err(|e| {
        warn!("Rejected callback payload from {}: {}", request.user_id, e);
        ApiError::BadRequest(format!("Invalid callback payload: {}", e))
    })?;

    let outcome = adjustments.apply(&payload).map_err(|e| match e {
        AdjustmentError::UnknownAction(_) => ApiError::NotFound(e.to_string()),
        AdjustmentError::NotAdjustable(_) => ApiError::BadRequest(e.to_string()),
    })?;

    info!(
        "Callback from {}: {} now {} (v{})",
        request.user_id,
        outcome.field.name(),
        outcome.new,
        outcome.version
    );

    Ok(Json(OutboundReply::text(vec![outcome.acknowledgement])))
}
