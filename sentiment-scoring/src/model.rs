//! Base SentimentModel trait
//!
//! Every model family implements SentimentModel so the router and the
//! ensemble can treat them interchangeably.

use async_trait::async_trait;
use common::{ModelFamily, ModelOpinion};

/// Base trait that all sentiment models must implement
///
/// Scoring is infallible: a model that cannot score returns a degraded
/// opinion (neutral, zero confidence, `error` set) instead of an error.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Stable model identifier, used in `model_used` and diagnostics
    fn name(&self) -> &str;

    fn family(&self) -> ModelFamily;

    /// Score one raw text
    async fn score(&self, text: &str) -> ModelOpinion;

    /// Score multiple texts (optional optimization)
    ///
    /// Default implementation calls score for each text.
    /// Implementations can override this for batch inference, but must
    /// return exactly what individual calls would.
    async fn score_batch(&self, texts: &[String]) -> Vec<ModelOpinion> {
        let mut outputs = Vec::with_capacity(texts.len());
        for text in texts {
            outputs.push(self.score(text).await);
        }
        outputs
    }
}
