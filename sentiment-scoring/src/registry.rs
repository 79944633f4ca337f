//! Model registry
//!
//! Models are built once at startup and shared read-only by every worker.

use common::{EngineConfig, ModelFamily, Result};
use std::sync::Arc;
use tracing::info;

use crate::contextual::ContextualModel;
use crate::lexical::LexicalSentimentModel;
use crate::lexicon::Lexicon;
use crate::model::SentimentModel;

pub struct ModelRegistry {
    lexical: Arc<dyn SentimentModel>,
    transformer: Arc<dyn SentimentModel>,
    secondary: Option<Arc<dyn SentimentModel>>,
}

impl ModelRegistry {
    /// Build the default model set from validated configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let lexicon = Arc::new(Lexicon::new());

        let registry = Self {
            lexical: Arc::new(LexicalSentimentModel::new(config, lexicon.clone())),
            transformer: Arc::new(ContextualModel::transformer(config, lexicon.clone())),
            secondary: config
                .enable_secondary_voter
                .then(|| Arc::new(ContextualModel::secondary_voter(config, lexicon)) as Arc<dyn SentimentModel>),
        };

        info!("Model registry ready: {}", registry.model_names().join(", "));
        Ok(registry)
    }

    /// Assemble a registry from custom models (e.g. a real inference backend)
    pub fn new(
        lexical: Arc<dyn SentimentModel>,
        transformer: Arc<dyn SentimentModel>,
        secondary: Option<Arc<dyn SentimentModel>>,
    ) -> Self {
        Self {
            lexical,
            transformer,
            secondary,
        }
    }

    pub fn get(&self, family: ModelFamily) -> Option<Arc<dyn SentimentModel>> {
        match family {
            ModelFamily::Lexical => Some(self.lexical.clone()),
            ModelFamily::Transformer => Some(self.transformer.clone()),
            ModelFamily::SecondaryVoter => self.secondary.clone(),
        }
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn model_names(&self) -> Vec<String> {
        ModelFamily::ALL
            .iter()
            .filter_map(|f| self.get(*f))
            .map(|m| m.name().to_string())
            .collect()
    }
}
