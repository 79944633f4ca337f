//! Error taxonomy shared by the scoring and analytics crates

use thiserror::Error;

/// Errors surfaced by the sentiment engine.
///
/// `ScoringDegraded` never reaches callers of the scoring entrypoint: models
/// absorb it into a neutral, zero-confidence opinion. The other variants are
/// caller-visible.
#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("insufficient data for {symbol}: {reason}")]
    InsufficientData { symbol: String, reason: String },

    #[error("insufficient sample: {actual} aligned points, at least {required} required")]
    InsufficientSample { required: usize, actual: usize },

    #[error("{series} series has zero variance over {points} aligned points")]
    ZeroVariance { series: &'static str, points: usize },

    #[error("model {model} degraded: {reason}")]
    ScoringDegraded { model: String, reason: String },

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl SentimentError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        SentimentError::Configuration(msg.into())
    }

    pub fn degraded(model: impl Into<String>, reason: impl Into<String>) -> Self {
        SentimentError::ScoringDegraded {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// True for the "not enough data" family that callers report upstream
    pub fn is_insufficient(&self) -> bool {
        matches!(
            self,
            SentimentError::InsufficientData { .. }
                | SentimentError::InsufficientSample { .. }
                | SentimentError::ZeroVariance { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SentimentError>;
