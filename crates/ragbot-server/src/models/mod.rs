pub mod callback;
pub mod chat;
pub mod generation;

pub use callback::{AdjustmentControl, AdjustmentPayload, ControlButton, Direction};
pub use chat::{
    CallbackRequest, CommandRequest, MessageRequest, OutboundReply, Role, Transcript, Turn, DEFAULT_ID,
};
pub use generation::{ConfigField, ConfigValue, GenerationConfig};
