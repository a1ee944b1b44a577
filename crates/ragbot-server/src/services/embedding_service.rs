use crate::config::EmbeddingConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::providers::EmbeddingProvider;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    content: &'a str,
    input: &'a str, // Send both for llama.cpp and OpenAI compatibility
}

/// Client for a llama-server style `/embedding` endpoint.
#[derive(Clone)]
pub struct EmbeddingService {
    client: Client,
    base_url: String,
    dimension: usize,
}

impl EmbeddingService {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create embedding HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dimension: config.dimension,
        })
    }

    async fn embed_internal(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for {} chars", text.len());

        let url = format!("{}/embedding", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest { content: text, input: text })
            .send()
            .await
            .context("Failed to connect to embedding server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        let json_value: Value = response
            .json()
            .await
            .context("Failed to parse embedding response as JSON")?;

        let embedding = extract_embedding(&json_value)
            .ok_or_else(|| anyhow::anyhow!("Unrecognized embedding response format: {}", json_value))?;

        if embedding.is_empty() {
            anyhow::bail!("Generated embedding is empty");
        }

        if embedding.iter().any(|v| !v.is_finite()) {
            anyhow::bail!("Generated embedding contains non-finite values");
        }

        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            );
        }

        Ok(embedding)
    }
}

/// Accepts the shapes llama.cpp and OpenAI-compatible servers return:
/// `{"embedding": [..]}`, `[{"embedding": [..]}]`, `[..]`,
/// `{"data": [{"embedding": [..]}]}`, and llama.cpp's nested `[[..]]` pooling output.
fn extract_embedding(value: &Value) -> Option<Vec<f32>> {
    fn floats(values: &[Value]) -> Option<Vec<f32>> {
        match values.first() {
            // Token-level output: first row
            Some(Value::Array(inner)) => floats(inner),
            _ => Some(values.iter().filter_map(|v| v.as_f64().map(|f| f as f32)).collect()),
        }
    }

    match value {
        Value::Array(items) => match items.first()? {
            Value::Object(_) => extract_embedding(items.first()?),
            _ => floats(items),
        },
        Value::Object(map) => {
            if let Some(Value::Array(embedding)) = map.get("embedding") {
                floats(embedding)
            } else if let Some(Value::Array(data)) = map.get("data") {
                extract_embedding(data.first()?)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for EmbeddingService {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_internal(text).await
    }
}
