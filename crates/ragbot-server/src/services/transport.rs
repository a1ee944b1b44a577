use crate::config::TransportConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::broadcast::OutboundTransport;

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Pushes messages to the chat platform bridge over HTTP.
#[derive(Clone)]
pub struct WebhookTransport {
    client: Client,
    outbound_url: String,
}

impl WebhookTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create transport HTTP client")?;

        Ok(Self {
            client,
            outbound_url: config.outbound_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl OutboundTransport for WebhookTransport {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        debug!("Pushing {} chars to chat {}", text.len(), chat_id);

        let response = self
            .client
            .post(&self.outbound_url)
            .json(&OutboundMessage { chat_id, text })
            .send()
            .await
            .context("Failed to connect to outbound transport")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Outbound transport error ({}): {}", status, body);
        }

        Ok(())
    }
}
