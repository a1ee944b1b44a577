use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::MessagesConfig;
use crate::database::{HistoryStore, SessionTracker};
use crate::models::{AdjustmentControl, OutboundReply};
use crate::utils::error::RouterError;
use crate::utils::text::outbound_messages;

use super::catalog::ActionCatalog;
use super::generation_settings::GenerationSettings;
use super::providers::EmbeddingProvider;
use super::responder::Responder;

/// Result of routing one free-text message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterOutcome {
    /// The message matched a catalog action; nothing was generated.
    Action { action_id: i64, name: String, score: f32 },
    /// Generated (or fallback) text, already signed off for display.
    Reply { text: String, confidence: Option<f32> },
}

impl RouterOutcome {
    pub fn into_reply(self) -> OutboundReply {
        match self {
            RouterOutcome::Action { action_id, name, .. } => {
                OutboundReply::with_control(name, AdjustmentControl::for_action(action_id))
            }
            RouterOutcome::Reply { text, .. } => OutboundReply::text(outbound_messages(text)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub threshold: f32,
    pub min_confidence: f32,
    pub config_tag: String,
    pub messages: MessagesConfig,
}

/// Per-message composition of stores, catalog and generation.
pub struct MessageRouter {
    history: Arc<HistoryStore>,
    sessions: Arc<SessionTracker>,
    catalog: Arc<ActionCatalog>,
    embedder: Arc<dyn EmbeddingProvider>,
    responder: Responder,
    settings: Arc<GenerationSettings>,
    options: RouterOptions,
}

impl MessageRouter {
    pub fn new(
        history: Arc<HistoryStore>,
        sessions: Arc<SessionTracker>,
        catalog: Arc<ActionCatalog>,
        embedder: Arc<dyn EmbeddingProvider>,
        responder: Responder,
        settings: Arc<GenerationSettings>,
        options: RouterOptions,
    ) -> Self {
        Self {
            history,
            sessions,
            catalog,
            embedder,
            responder,
            settings,
            options,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionTracker> {
        &self.sessions
    }

    pub fn messages(&self) -> &MessagesConfig {
        &self.options.messages
    }

    async fn touch(&self, user_id: &str) {
        // Bookkeeping only; the user still gets an answer.
        if let Err(e) = self.sessions.touch(user_id, &self.options.config_tag).await {
            warn!("Could not record access for {}: {}", user_id, e);
        }
    }

    /// Route one free-text message: a catalog action when the message is
    /// close enough to one, a generated reply otherwise.
    pub async fn handle_message(&self, user_id: &str, text: &str) -> Result<RouterOutcome, RouterError> {
        self.touch(user_id).await;

        match self.embedder.encode(text).await {
            Ok(query) => {
                if let Some((action, score)) = self.catalog.classify(&query, self.options.threshold) {
                    info!("Message from {} triggered action {} ({:.3})", user_id, action.name, score);
                    return Ok(RouterOutcome::Action {
                        action_id: action.id,
                        name: action.name.clone(),
                        score,
                    });
                }
            }
            Err(e) => warn!("Embedding failed for {}, skipping action lookup: {}", user_id, e),
        }

        let transcript = self.history.get(user_id).await?;
        let result = self
            .responder
            .reply(&transcript, text, self.options.min_confidence)
            .await
            .map_err(RouterError::Generation)?;

        self.history.put(user_id, &result.updated_transcript).await?;
        debug!("Stored reply for {}", user_id);

        Ok(RouterOutcome::Reply {
            text: self.sign_off(result.text),
            confidence: result.confidence,
        })
    }

    fn sign_off(&self, text: String) -> String {
        match self.options.messages.signoffs.choose(&mut rand::rng()) {
            Some(signoff) => format!("{}\n{}", text, signoff),
            None => text,
        }
    }

    pub async fn start(&self, user_id: &str) -> OutboundReply {
        self.touch(user_id).await;
        OutboundReply::text(vec![self.options.messages.welcome.clone()])
    }

    pub async fn restart(&self, user_id: &str) -> Result<OutboundReply, RouterError> {
        self.history.reset(user_id).await?;
        info!("Conversation of {} reset", user_id);
        Ok(OutboundReply::text(vec![self.options.messages.restart.clone()]))
    }

    pub fn show_config(&self) -> OutboundReply {
        let snapshot = self.settings.snapshot();
        let text = format!(
            "Bot Configuration\n\n{}\nversion: {}",
            snapshot.value, snapshot.version
        );
        OutboundReply::text(outbound_messages(text))
    }

    pub async fn show_history(&self, user_id: &str) -> Result<OutboundReply, RouterError> {
        let transcript = self.history.get(user_id).await?;
        let text = format!("Conversation History\n\n{}", transcript);
        Ok(OutboundReply::text(outbound_messages(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationConfig, Transcript, Turn};
    use crate::services::catalog::Action;
    use crate::services::generation_queue::GenerationQueue;
    use crate::services::providers::MockEmbeddingProvider;
    use crate::database::DbPool;
    use crate::services::providers::GenerationProvider;
    use crate::test_support::{memory_stores, DbClosingGenerator, ScriptedGenerator};
    use crate::utils::error::StoreError;

    const FALLBACK: &str = "Purry, I don't understand.";

    struct Fixture {
        router: MessageRouter,
        history: Arc<HistoryStore>,
        pool: DbPool,
        generator: Arc<ScriptedGenerator>,
    }

    fn embedder_returning(vector: Vec<f32>) -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_encode().returning(move |_| Ok(vector.clone()));
        embedder
    }

    fn router_over(
        history: Arc<HistoryStore>,
        sessions: Arc<SessionTracker>,
        provider: Arc<dyn GenerationProvider>,
        embedder: MockEmbeddingProvider,
        min_confidence: f32,
        signoffs: Vec<String>,
    ) -> MessageRouter {
        let settings = Arc::new(GenerationSettings::new(GenerationConfig::default()));
        let responder = Responder::new(
            GenerationQueue::spawn(provider, 4),
            settings.clone(),
            FALLBACK.to_string(),
        );
        let catalog = Arc::new(ActionCatalog::new(vec![Action {
            id: 4,
            name: "temperature".into(),
            reference_vector: vec![1.0, 0.0],
        }]));

        MessageRouter::new(
            history,
            sessions,
            catalog,
            Arc::new(embedder),
            responder,
            settings,
            RouterOptions {
                threshold: 0.6,
                min_confidence,
                config_tag: "TEST001".into(),
                messages: MessagesConfig { signoffs, ..MessagesConfig::default() },
            },
        )
    }

    async fn fixture_with(
        embedder: MockEmbeddingProvider,
        generator: ScriptedGenerator,
        min_confidence: f32,
        signoffs: Vec<String>,
    ) -> Fixture {
        let (pool, history, sessions) = memory_stores().await;
        let history = Arc::new(history);
        let generator = Arc::new(generator);
        let router = router_over(
            history.clone(),
            Arc::new(sessions),
            generator.clone(),
            embedder,
            min_confidence,
            signoffs,
        );

        Fixture { router, history, pool, generator }
    }

    async fn fixture(embedder: MockEmbeddingProvider, signoffs: Vec<String>) -> Fixture {
        fixture_with(embedder, ScriptedGenerator::new("Paris.", None), 0.0, signoffs).await
    }

    #[tokio::test]
    async fn test_below_threshold_generates_once() {
        let f = fixture(embedder_returning(vec![0.0, 1.0]), vec![]).await;

        let outcome = f.router.handle_message("alice", "capital of France?").await.unwrap();

        assert_eq!(outcome, RouterOutcome::Reply { text: "Paris.".into(), confidence: None });
        assert_eq!(f.generator.calls(), 1);
        let stored = f.history.get("alice").await.unwrap();
        assert_eq!(stored.len(), Transcript::seed().len() + 2);
        assert_eq!(stored.turns()[stored.len() - 2], Turn::user("capital of France?"));
        assert_eq!(stored.last().unwrap(), &Turn::assistant("Paris."));
    }

    #[tokio::test]
    async fn test_action_match_skips_generation() {
        let f = fixture(embedder_returning(vec![0.9, 0.1]), vec![]).await;

        let outcome = f.router.handle_message("alice", "make it hotter").await.unwrap();

        match &outcome {
            RouterOutcome::Action { action_id, name, score } => {
                assert_eq!(*action_id, 4);
                assert_eq!(name, "temperature");
                assert!(*score >= 0.6);
            }
            other => panic!("expected an action, got {other:?}"),
        }
        assert_eq!(f.generator.calls(), 0);
        // First contact through `get` only now: nothing was appended.
        assert_eq!(f.history.get("alice").await.unwrap(), Transcript::seed());

        let reply = outcome.into_reply();
        assert_eq!(reply.messages, vec!["temperature"]);
        assert_eq!(reply.control.unwrap().action_id, 4);
    }

    #[tokio::test]
    async fn test_embedding_failure_falls_through_to_generation() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_encode()
            .returning(|_| Err(anyhow::anyhow!("embedding server down")));
        let f = fixture(embedder, vec![]).await;

        let outcome = f.router.handle_message("bob", "hello").await.unwrap();
        assert!(matches!(outcome, RouterOutcome::Reply { .. }));
        assert_eq!(f.generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_signoff_is_displayed_but_not_stored() {
        let f = fixture(embedder_returning(vec![0.0, 1.0]), vec!["Meow!".into()]).await;

        let outcome = f.router.handle_message("carol", "hi").await.unwrap();
        assert_eq!(outcome, RouterOutcome::Reply { text: "Paris.\nMeow!".into(), confidence: None });

        let stored = f.history.get("carol").await.unwrap();
        assert_eq!(stored.last().unwrap().content, "Paris.");
    }

    #[tokio::test]
    async fn test_commands() {
        let f = fixture(embedder_returning(vec![0.0, 1.0]), vec![]).await;

        let welcome = f.router.start("dave").await;
        assert_eq!(welcome.messages, vec![MessagesConfig::default().welcome]);
        assert!(f.router.sessions().get("dave").await.unwrap().is_some());

        f.router.handle_message("dave", "hi").await.unwrap();
        let history = f.router.show_history("dave").await.unwrap();
        assert!(history.messages[0].starts_with("Conversation History\n\n"));
        assert!(history.messages[0].contains("[user] hi"));

        let restart = f.router.restart("dave").await.unwrap();
        assert_eq!(restart.messages, vec![MessagesConfig::default().restart]);
        assert_eq!(f.history.get("dave").await.unwrap(), Transcript::seed());

        let config = f.router.show_config();
        assert!(config.messages[0].starts_with("Bot Configuration\n\n"));
        assert!(config.messages[0].contains("top_k: 50"));
        assert!(config.messages[0].ends_with("version: 0"));
    }

    #[test]
    fn test_long_reply_is_split() {
        let outcome = RouterOutcome::Reply { text: "a".repeat(5000), confidence: None };
        let reply = outcome.into_reply();
        assert_eq!(reply.messages.len(), 2);
        assert!(reply.messages[0].ends_with(" [1/2]"));
        assert!(reply.control.is_none());
    }

    #[tokio::test]
    async fn test_low_confidence_reply_shows_fallback() {
        let f = fixture_with(
            embedder_returning(vec![0.0, 1.0]),
            ScriptedGenerator::with_confidence("I think it's blue", 0.42),
            0.5,
            vec!["Meow!".into()],
        )
        .await;

        let outcome = f.router.handle_message("erin", "sky color?").await.unwrap();

        match outcome {
            RouterOutcome::Reply { text, confidence } => {
                assert!(text.starts_with(FALLBACK));
                assert!((confidence.unwrap() - 0.42).abs() < 1e-5);
            }
            other => panic!("expected a reply, got {other:?}"),
        }
        assert!(f.generator.last_with_scores());
        let stored = f.history.get("erin").await.unwrap();
        assert_eq!(stored.last().unwrap(), &Turn::assistant("I think it's blue"));
    }

    #[tokio::test]
    async fn test_unreadable_history_is_unavailable() {
        let f = fixture(embedder_returning(vec![0.0, 1.0]), vec![]).await;
        f.pool.close().await;

        let err = f.router.handle_message("frank", "hi").await.unwrap_err();

        assert!(matches!(err, RouterError::HistoryUnavailable(StoreError::Unavailable(_))));
        assert_eq!(f.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_after_generation_gives_no_reply() {
        let (pool, history, sessions) = memory_stores().await;
        let router = router_over(
            Arc::new(history),
            Arc::new(sessions),
            Arc::new(DbClosingGenerator { pool: pool.clone() }),
            embedder_returning(vec![0.0, 1.0]),
            0.0,
            vec![],
        );

        let err = router.handle_message("grace", "hi").await.unwrap_err();
        assert!(matches!(err, RouterError::HistoryUnavailable(StoreError::Unavailable(_))));
    }
}
