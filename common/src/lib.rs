//! Shared types for the sentiment engine
//!
//! Everything that crosses a crate boundary lives here:
//! - Text inputs, per-model opinions and ensemble verdicts
//! - Aggregate and correlation result shapes
//! - Engine configuration and the error taxonomy

pub mod config;
pub mod error;
pub mod sentiment;
pub mod series;

pub use config::{create_config_template, load_config, save_config, EngineConfig};
pub use error::{Result, SentimentError};
pub use sentiment::{
    Adjustment, EnsembleState, ModelFamily, ModelOpinion, OpinionRecord, SarcasmTrigger,
    SentimentLabel, SentimentVerdict, SourceKind, TextInput, TimedVerdict, VerdictDiagnostics,
    NEUTRAL_BAND,
};
pub use series::{AggregatePoint, CorrelationResult, SeriesPoint, TimeWindow};

// Re-export common external types for convenience
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
