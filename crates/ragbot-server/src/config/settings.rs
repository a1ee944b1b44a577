use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::GenerationConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub transport: TransportConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
    pub pool_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    /// Read-only sqlite database holding `actions` and `embeddings`
    pub url: String,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub dimension: usize, // 384 for paraphrase-MiniLM-L6-v2
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Accelerator the generation backend runs on. Required; "cpu" refuses to
    /// start. Used only when the backend does not report its own offload.
    pub device: String,
    /// 0 disables the confidence gate
    #[serde(default)]
    pub min_confidence: f32,
    #[serde(default = "default_top_logprobs")]
    pub top_logprobs: u32,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransportConfig {
    pub outbound_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_config_tag")]
    pub config_tag: String,
    #[serde(default = "default_recency_days")]
    pub recency_days: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            config_tag: default_config_tag(),
            recency_days: default_recency_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BroadcastConfig {
    #[serde(default = "default_true")]
    pub recent_only: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { recent_only: true }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MessagesConfig {
    pub welcome: String,
    pub restart: String,
    pub on_start: String,
    pub on_stop: String,
    pub low_confidence: String,
    pub signoffs: Vec<String>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: "Nice to meet you! I am RagBot, meow! How can I assist you today?".to_string(),
            restart: "Memory wiped out! Meow! How can I assist you today?".to_string(),
            on_start: "Back online! Let meow know if you need assistance 🐱".to_string(),
            on_stop: "Meowtenance time! Need to recharge and get my fur fluffed. Sweet dreams, humans! \
                      I'll be back online soon. Meanwhile, I will just ignore you 🐱"
                .to_string(),
            low_confidence: "Purry, I don't understand.".to_string(),
            signoffs: ["Meow!", "Purr!", "Mew!", "Chirrup!", "Chirp!"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn default_threshold() -> f32 {
    0.6
}

fn default_timeout() -> u64 {
    60
}

fn default_top_logprobs() -> u32 {
    20
}

fn default_queue_capacity() -> usize {
    64
}

fn default_config_tag() -> String {
    "TEST001".to_string()
}

fn default_recency_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            // Example: APP__DATABASE__URL=sqlite://data/chats.db
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.catalog.threshold) {
            anyhow::bail!(
                "catalog.threshold must be a cosine similarity in [-1, 1], got {}",
                self.catalog.threshold
            );
        }

        if !(0.0..=1.0).contains(&self.llm.min_confidence) {
            anyhow::bail!(
                "llm.min_confidence must be in [0, 1], got {}",
                self.llm.min_confidence
            );
        }

        if self.llm.device.trim().is_empty() {
            anyhow::bail!("llm.device must name the accelerator, e.g. \"cuda:0\"");
        }

        if self.database.pool_max_size == 0 {
            anyhow::bail!("database.pool_max_size must be at least 1");
        }

        if self.embedding.dimension == 0 {
            anyhow::bail!("embedding.dimension must be at least 1");
        }

        Ok(())
    }
}
