//! Scoring pool - scores many inputs concurrently
//!
//! Each input is an independent task. A semaphore bounds how many are in
//! flight; each task hands back its own verdict.

use common::{SentimentVerdict, TextInput, TimedVerdict};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::engine::SentimentEngine;

pub struct ScoringPool {
    engine: Arc<SentimentEngine>,
    semaphore: Arc<Semaphore>,
}

impl ScoringPool {
    pub fn new(engine: Arc<SentimentEngine>) -> Self {
        let permits = engine.config().max_concurrent_scoring;
        Self {
            engine,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Score every input, one verdict per input in input order.
    ///
    /// A task that panics yields a neutral zero-confidence verdict for its input.
    pub async fn score_all(&self, inputs: Vec<TextInput>) -> Vec<TimedVerdict> {
        if inputs.is_empty() {
            return Vec::new();
        }

        debug!("Scoring {} inputs with {} permits", inputs.len(), self.semaphore.available_permits());

        let tasks: Vec<_> = inputs
            .iter()
            .cloned()
            .map(|input| {
                let engine = self.engine.clone();
                let semaphore = self.semaphore.clone();
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    engine.score_timed(&input).await
                })
            })
            .collect();

        let mut verdicts = Vec::with_capacity(inputs.len());
        for (task, input) in tasks.into_iter().zip(&inputs) {
            let timed = match task.await {
                Ok(timed) => timed,
                Err(e) => {
                    error!("Scoring task for {} failed: {}", input.id, e);
                    TimedVerdict::for_input(input, SentimentVerdict::degraded(format!("scoring task failed: {}", e)))
                }
            };
            verdicts.push(timed);
        }
        verdicts
    }

    /// Score inputs from a channel until it closes, forwarding verdicts as they complete.
    ///
    /// Intake waits for a free permit, so a slow consumer holds back the producer.
    pub async fn run_stream(&self, mut rx: mpsc::Receiver<TextInput>, tx: mpsc::Sender<TimedVerdict>) {
        info!("Scoring stream started");
        let mut tasks = JoinSet::new();

        while let Some(input) = rx.recv().await {
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                error!("Scoring semaphore closed, stopping stream");
                break;
            };
            let engine = self.engine.clone();
            let tx = tx.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let timed = engine.score_timed(&input).await;
                if tx.send(timed).await.is_err() {
                    debug!("Verdict receiver dropped, discarding {}", input.id);
                }
            });

            while let Some(result) = tasks.try_join_next() {
                log_failure(result);
            }
        }

        while let Some(result) = tasks.join_next().await {
            log_failure(result);
        }
        info!("Scoring stream finished");
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

fn log_failure(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Streaming scoring task failed: {}", e);
    }
}
