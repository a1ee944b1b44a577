pub mod adjustment;
pub mod broadcast;
pub mod catalog;
pub mod confidence;
pub mod embedding_service;
pub mod generation_queue;
pub mod generation_settings;
pub mod llm_service;
pub mod providers;
pub mod responder;
pub mod router;
pub mod transport;

pub use adjustment::{AdjustmentError, AdjustmentOutcome, AdjustmentService};
pub use broadcast::{BroadcastNotifier, BroadcastReport, OutboundTransport};
pub use catalog::{Action, ActionCatalog};
pub use embedding_service::EmbeddingService;
pub use generation_queue::GenerationQueue;
pub use generation_settings::{GenerationSettings, Versioned};
pub use llm_service::LlmService;
pub use providers::{EmbeddingProvider, GenerationProvider};
pub use responder::{GenerationResult, Responder};
pub use router::{MessageRouter, RouterOptions, RouterOutcome};
pub use transport::WebhookTransport;
