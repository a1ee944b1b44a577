use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::SessionTracker;
use crate::utils::error::StoreError;

/// Push channel to chat users, outside of a request/response exchange.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait OutboundTransport: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BroadcastReport {
    pub delivered: Vec<String>,
    /// Recipient id and the reason the send failed
    pub failed: Vec<(String, String)>,
}

/// Sends a fixed notice to every known user, one at a time.
pub struct BroadcastNotifier {
    sessions: Arc<SessionTracker>,
    transport: Arc<dyn OutboundTransport>,
    recent_only: bool,
}

impl BroadcastNotifier {
    pub fn new(
        sessions: Arc<SessionTracker>,
        transport: Arc<dyn OutboundTransport>,
        recent_only: bool,
    ) -> Self {
        Self { sessions, transport, recent_only }
    }

    /// Notify every (recent) session. Only the recipient lookup can fail the
    /// whole call; individual send failures end up in the report.
    pub async fn broadcast(&self, text: &str) -> Result<BroadcastReport, StoreError> {
        info!("broadcasting message...");
        let ids = self.sessions.list_ids(self.recent_only).await?;

        if ids.is_empty() {
            info!("no chats found");
            return Ok(BroadcastReport::default());
        }

        Ok(fan_out(self.transport.as_ref(), &ids, text).await)
    }
}

/// Send `text` to each of `ids` in order. A failed recipient is recorded and
/// skipped, never retried.
pub async fn fan_out(transport: &dyn OutboundTransport, ids: &[String], text: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for id in ids {
        match transport.send_message(id, text).await {
            Ok(()) => report.delivered.push(id.clone()),
            Err(e) => {
                warn!("Broadcast to {} failed: {}", id, e);
                report.failed.push((id.clone(), e.to_string()));
            }
        }
    }

    info!(
        "Broadcast finished: {} delivered, {} failed",
        report.delivered.len(),
        report.failed.len()
    );
    report
}
