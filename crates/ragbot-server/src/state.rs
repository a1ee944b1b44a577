use axum::extract::FromRef;
use std::sync::Arc;

use crate::database::DbPool;
use crate::services::{AdjustmentService, MessageRouter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub router: Arc<MessageRouter>,
    pub adjustments: Arc<AdjustmentService>,
}

impl FromRef<AppState> for Arc<MessageRouter> {
    fn from_ref(state: &AppState) -> Self {
        state.router.clone()
    }
}

impl FromRef<AppState> for Arc<AdjustmentService> {
    fn from_ref(state: &AppState) -> Self {
        state.adjustments.clone()
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.db_pool.clone()
    }
}
