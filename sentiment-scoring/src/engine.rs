//! Sentiment engine entry point

use common::{EngineConfig, Result, SentimentVerdict, SourceKind, TextInput, TimedVerdict, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::ensemble::EnsembleCombiner;
use crate::registry::ModelRegistry;

/// Scores text items into verdicts.
///
/// Cheap to share: wrap in an `Arc` and call `score` from any number of tasks.
pub struct SentimentEngine {
    config: Arc<EngineConfig>,
    combiner: EnsembleCombiner,
}

impl SentimentEngine {
    /// Validate configuration and build the default models
    pub fn new(config: EngineConfig) -> Result<Self> {
        let registry = ModelRegistry::from_config(&config)?;
        Self::with_registry(config, registry)
    }

    /// Use a custom model set
    pub fn with_registry(config: EngineConfig, registry: ModelRegistry) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        info!(
            threshold = config.confidence_threshold,
            secondary = registry.has_secondary(),
            "Sentiment engine initialized"
        );

        Ok(Self {
            combiner: EnsembleCombiner::new(config.clone(), Arc::new(registry)),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score one input. Never fails; degraded models only lower confidence.
    pub async fn score(&self, input: &TextInput) -> SentimentVerdict {
        let verdict = self.combiner.combine(input).await;
        debug!(
            id = %input.id,
            label = %verdict.label,
            score = verdict.score,
            confidence = verdict.confidence,
            model = %verdict.model_used,
            "Scored input"
        );
        verdict
    }

    /// Score raw text from a source, stamped with the current time
    pub async fn score_text(&self, text: &str, source: SourceKind) -> SentimentVerdict {
        self.score(&TextInput::new(text, source, Utc::now())).await
    }

    /// Score and attach the input's id, symbol and timestamp
    pub async fn score_timed(&self, input: &TextInput) -> TimedVerdict {
        TimedVerdict::for_input(input, self.score(input).await)
    }
}
