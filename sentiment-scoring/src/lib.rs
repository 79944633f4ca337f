//! Sentiment Scoring - multi-model ensemble
//!
//! This crate turns raw collector text into sentiment verdicts:
//! - Text normalization and tokenization
//! - Lexical (VADER family) and contextual (transformer family) models
//! - Negation and sarcasm adjustment stages
//! - Source-based routing, confidence escalation and ensemble voting
//! - A bounded worker pool for scoring many inputs concurrently

pub mod adjustments;
pub mod backend;
pub mod contextual;
pub mod engine;
pub mod ensemble;
pub mod lexical;
pub mod lexicon;
pub mod model;
pub mod normalizer;
pub mod pool;
pub mod registry;
pub mod router;

// Re-export commonly used types
pub use adjustments::{strip_marker, NegationScan, NegationStage, SarcasmStage};
pub use backend::{ClassProbabilities, ClassifierBackend, KeywordClassifier};
pub use contextual::ContextualModel;
pub use engine::SentimentEngine;
pub use ensemble::EnsembleCombiner;
pub use lexical::LexicalSentimentModel;
pub use lexicon::Lexicon;
pub use model::SentimentModel;
pub use normalizer::{normalize, tokenize, Token};
pub use pool::ScoringPool;
pub use registry::ModelRegistry;
pub use router::{ModelRouter, Route};

// Re-export common types for convenience
pub use common::{
    EngineConfig, ModelFamily, ModelOpinion, SentimentLabel, SentimentVerdict, SourceKind, TextInput,
    TimedVerdict,
};
