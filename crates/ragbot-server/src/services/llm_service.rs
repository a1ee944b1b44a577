use crate::config::LlmConfig;
use crate::models::{GenerationConfig, Transcript, Turn};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::providers::{ComputeCapability, Generation, GenerationProvider, ScoreKind, TokenScores};

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub messages: &'a [Turn],
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub logprobs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
    #[serde(default)]
    logprobs: Option<ChoiceLogprobs>,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChoiceLogprobs {
    #[serde(default)]
    content: Vec<TokenLogprob>,
}

#[derive(Debug, Deserialize)]
struct TokenLogprob {
    token: String,
    logprob: f32,
    #[serde(default)]
    top_logprobs: Vec<TopLogprob>,
}

#[derive(Debug, Deserialize)]
struct TopLogprob {
    token: String,
    logprob: f32,
}

impl From<TokenLogprob> for TokenScores {
    fn from(step: TokenLogprob) -> Self {
        let mut candidates: Vec<f32> = step.top_logprobs.iter().map(|c| c.logprob).collect();
        // The emitted token is always a candidate of its own step
        if !step.top_logprobs.iter().any(|c| c.token == step.token) {
            candidates.push(step.logprob);
        }
        TokenScores { chosen: step.logprob, candidates }
    }
}

/// OpenAI-compatible chat completion client (llama-server `/v1/chat/completions`).
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    base_url: String,
    device: String,
    top_logprobs: u32,
}

impl LlmService {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create LLM HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            device: config.device.clone(),
            top_logprobs: config.top_logprobs,
        })
    }

    fn build_request<'a>(
        &self,
        messages: &'a [Turn],
        config: &GenerationConfig,
        with_scores: bool,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            messages,
            max_tokens: config.max_new_tokens,
            // Greedy decoding when sampling is off
            temperature: if config.do_sample { config.temperature } else { 0.0 },
            top_p: config.top_p,
            top_k: config.top_k,
            repeat_penalty: config.repetition_penalty,
            stream: false,
            logprobs: with_scores,
            top_logprobs: with_scores.then_some(self.top_logprobs),
        }
    }
}

#[async_trait::async_trait]
impl GenerationProvider for LlmService {
    async fn generate(
        &self,
        transcript: &Transcript,
        config: &GenerationConfig,
        with_scores: bool,
    ) -> Result<Generation> {
        debug!("Starting chat generation with {} messages", transcript.len());

        let request = self.build_request(transcript.turns(), config, with_scores);
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Failed to call LLM API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error: {} - {}", status, body);
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No choices returned from LLM"))?;

        let scores = if with_scores {
            let steps = choice
                .logprobs
                .ok_or_else(|| anyhow::anyhow!("LLM returned no token scores"))?
                .content;
            Some(steps.into_iter().map(TokenScores::from).collect())
        } else {
            None
        };

        Ok(Generation {
            text: choice.message.content,
            scores,
            // OpenAI-style logprobs are log-softmax over the full vocabulary
            score_kind: ScoreKind::LogProbs,
        })
    }

    async fn probe(&self) -> Result<ComputeCapability> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("LLM server is not reachable")?;

        if !response.status().is_success() {
            anyhow::bail!("LLM server is not healthy: {}", response.status());
        }

        let capability = match self.fetch_props().await {
            Some(props) => match reported_acceleration(&props) {
                Some(true) => ComputeCapability { device: self.device.clone(), accelerated: true },
                Some(false) => ComputeCapability { device: "cpu".to_string(), accelerated: false },
                None => {
                    warn!("LLM server props do not report GPU offload, trusting llm.device");
                    self.configured_capability()
                }
            },
            None => self.configured_capability(),
        };

        info!(
            "LLM server healthy, device={}, accelerated={}",
            capability.device, capability.accelerated
        );
        Ok(capability)
    }
}

impl LlmService {
    async fn fetch_props(&self) -> Option<Value> {
        let response = match self.client.get(format!("{}/props", self.base_url)).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("LLM server /props returned {}", response.status());
                return None;
            }
            Err(e) => {
                warn!("LLM server /props unavailable: {}", e);
                return None;
            }
        };

        response.json().await.ok()
    }

    fn configured_capability(&self) -> ComputeCapability {
        ComputeCapability {
            device: self.device.clone(),
            accelerated: !is_cpu(&self.device),
        }
    }
}

fn is_cpu(device: &str) -> bool {
    device.trim().to_ascii_lowercase().starts_with("cpu")
}

/// Whether llama-server `/props` says layers are offloaded to a GPU.
/// `None` when the payload carries no such information.
fn reported_acceleration(props: &Value) -> Option<bool> {
    let gpu_layers = props
        .get("n_gpu_layers")
        .or_else(|| props.get("default_generation_settings")?.get("n_gpu_layers"))
        .and_then(Value::as_i64);
    if let Some(layers) = gpu_layers {
        return Some(layers > 0);
    }

    let devices = props.get("devices")?.as_array()?;
    let names: Vec<&str> = devices
        .iter()
        .filter_map(|d| d.as_str().or_else(|| d.get("name")?.as_str()))
        .collect();
    if names.is_empty() {
        return None;
    }
    Some(names.iter().any(|name| !is_cpu(name)))
}
