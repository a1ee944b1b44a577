use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use ragbot_server::config::Settings;
use ragbot_server::database::{DbPool, HistoryStore, SessionTracker};
use ragbot_server::handlers::build_router;
use ragbot_server::logging::init_logger;
use ragbot_server::models::Transcript;
use ragbot_server::services::{
    ActionCatalog, AdjustmentService, BroadcastNotifier, EmbeddingService, GenerationProvider,
    GenerationQueue, GenerationSettings, LlmService, MessageRouter, Responder, RouterOptions,
    WebhookTransport,
};
use ragbot_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    info!("🚀 Starting RagBot server...");

    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Chat database
    let db_pool = DbPool::new(&settings.database).await?;
    let history = Arc::new(HistoryStore::init(db_pool.clone(), &Transcript::seed()).await?);
    let sessions = Arc::new(SessionTracker::init(db_pool.clone(), settings.session.recency_days).await?);
    info!("✅ Database connection established");

    // Action catalog, read-only
    let catalog_pool = DbPool::open_read_only(&settings.catalog.url)
        .await
        .with_context(|| format!("Failed to open action catalog at {}", settings.catalog.url))?;
    let catalog = Arc::new(ActionCatalog::load(&catalog_pool).await?);
    catalog_pool.close().await;

    // Model backends
    let embedder = Arc::new(EmbeddingService::new(&settings.embedding)?);
    let llm = Arc::new(LlmService::new(&settings.llm)?);

    let capability = llm.probe().await.context("Generation backend is not reachable")?;
    if !capability.accelerated {
        anyhow::bail!(
            "Generation backend runs on '{}', an accelerator is required",
            capability.device
        );
    }
    info!("✅ Generation backend ready on {}", capability.device);

    let generation_settings = Arc::new(GenerationSettings::new(settings.llm.generation.clone()));
    let queue = GenerationQueue::spawn(llm, settings.llm.queue_capacity);
    let responder = Responder::new(
        queue,
        generation_settings.clone(),
        settings.messages.low_confidence.clone(),
    );

    let router = Arc::new(MessageRouter::new(
        history,
        sessions.clone(),
        catalog.clone(),
        embedder,
        responder,
        generation_settings.clone(),
        RouterOptions {
            threshold: settings.catalog.threshold,
            min_confidence: settings.llm.min_confidence,
            config_tag: settings.session.config_tag.clone(),
            messages: settings.messages.clone(),
        },
    ));
    let adjustments = Arc::new(AdjustmentService::new(catalog, generation_settings));

    let transport = Arc::new(WebhookTransport::new(&settings.transport)?);
    let notifier = Arc::new(BroadcastNotifier::new(
        sessions,
        transport,
        settings.broadcast.recent_only,
    ));

    let app = build_router(AppState {
        db_pool: db_pool.clone(),
        router,
        adjustments,
    });

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🎯 Server listening on {}", addr);

    {
        let notifier = notifier.clone();
        let text = settings.messages.on_start.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.broadcast(&text).await {
                error!("Start-up broadcast failed: {}", e);
            }
        });
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, notifying users...");
    match notifier.broadcast(&settings.messages.on_stop).await {
        Ok(report) if !report.failed.is_empty() => {
            warn!("{} users did not get the shutdown notice", report.failed.len())
        }
        Ok(_) => {}
        Err(e) => error!("Shutdown broadcast failed: {}", e),
    }

    db_pool.close().await;
    info!("👋 Bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("🛑 Shutdown signal received");
}
