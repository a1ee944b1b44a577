use serde::{Deserialize, Serialize};
use std::fmt;

use super::callback::AdjustmentControl;

/// Sentinel id under which the seed transcript is stored.
pub const DEFAULT_ID: &str = "DEFAULT";

// ===== TRANSCRIPT MODELS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

/// Ordered conversation memory of a single user.
///
/// Stored as a JSON array of `{role, content}` records. Decoding is strict:
/// unknown roles or extra fields are rejected instead of guessed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// The seed every new conversation starts from.
    pub fn seed() -> Self {
        Self::new(vec![
            Turn::user(
                "Your name is RagBot. You are a friendly chatbot that answers questions. \
                 Keep the answer short and concise. Don't be verbose.",
            ),
            Turn::assistant("Got it! How can I assist you today?"),
        ])
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, turn) in self.turns.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{}] {}", turn.role.as_str(), turn.content)?;
        }
        Ok(())
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub user_id: String,
    /// Raw button payload, decoded with a strict schema by the handler.
    pub data: String,
}

// ===== RESPONSE MODELS =====

/// What goes back to the chat transport for one inbound update.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundReply {
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<AdjustmentControl>,
}

impl OutboundReply {
    pub fn text(messages: Vec<String>) -> Self {
        Self { messages, control: None }
    }

    pub fn with_control(message: String, control: AdjustmentControl) -> Self {
        Self { messages: vec![message], control: Some(control) }
    }
}
