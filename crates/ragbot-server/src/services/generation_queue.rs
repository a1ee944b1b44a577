use anyhow::{anyhow, Result};
use flume::{bounded, Receiver, Sender};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::models::{GenerationConfig, Transcript};

use super::providers::{Generation, GenerationProvider};

struct GenerationJob {
    transcript: Transcript,
    config: GenerationConfig,
    with_scores: bool,
    reply: oneshot::Sender<Result<Generation>>,
}

/// Single-consumer front for the generation backend.
///
/// Every request is funneled through one worker task, so calls to the
/// provider never overlap no matter how many handlers are waiting.
#[derive(Clone)]
pub struct GenerationQueue {
    sender: Sender<GenerationJob>,
}

impl GenerationQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(provider: Arc<dyn GenerationProvider>, capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));

        info!("Initializing generation queue: capacity={}", capacity.max(1));
        tokio::spawn(Self::worker_loop(provider, receiver));

        Self { sender }
    }

    async fn worker_loop(provider: Arc<dyn GenerationProvider>, receiver: Receiver<GenerationJob>) {
        info!("Generation worker started");

        while let Ok(job) = receiver.recv_async().await {
            debug!(
                "Generating for transcript of {} turns (scores={})",
                job.transcript.len(),
                job.with_scores
            );
            let result = provider
                .generate(&job.transcript, &job.config, job.with_scores)
                .await;

            if job.reply.send(result).is_err() {
                warn!("Generation requester went away before the result was ready");
            }
        }

        info!("Generation worker shutting down (channel closed)");
    }

    /// Queue one generation and wait for its result.
    pub async fn generate(
        &self,
        transcript: Transcript,
        config: GenerationConfig,
        with_scores: bool,
    ) -> Result<Generation> {
        let (reply, result) = oneshot::channel();

        self.sender
            .send_async(GenerationJob {
                transcript,
                config,
                with_scores,
                reply,
            })
            .await
            .map_err(|_| anyhow!("Generation worker is not running"))?;

        result
            .await
            .map_err(|_| anyhow!("Generation worker dropped the request"))?
    }
}
