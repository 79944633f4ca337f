//! Sentiment Analytics - temporal aggregation and correlation
//!
//! This crate turns stored verdicts into analytics:
//! - Recency-weighted aggregates and bucketed sentiment series
//! - Pearson correlation of sentiment against price movement
//!
//! Everything here is a pure computation over caller-provided snapshots.

mod aggregator;
mod correlation;

pub use aggregator::TemporalAggregator;
pub use correlation::{bucket_prices, pct_changes, CorrelationEngine, MIN_SAMPLE};

use chrono::{DateTime, Utc};
use common::{
    AggregatePoint, CorrelationResult, EngineConfig, Result, SentimentError, SeriesPoint, TimeWindow, TimedVerdict,
};
use tracing::{debug, info};

/// Main entry point for sentiment analytics
#[derive(Debug, Clone)]
pub struct SentimentAnalytics {
    aggregator: TemporalAggregator,
    correlation: CorrelationEngine,
}

impl SentimentAnalytics {
    /// Create analytics with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(&EngineConfig::default())
    }

    /// Create analytics with custom configuration
    pub fn with_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            half_life_hours = config.decay_half_life_hours,
            min_weight = config.min_weight,
            "Sentiment analytics initialized"
        );
        Ok(Self {
            aggregator: TemporalAggregator::from_config(config),
            correlation: CorrelationEngine::new(),
        })
    }

    pub fn aggregator(&self) -> &TemporalAggregator {
        &self.aggregator
    }

    /// Decayed aggregate for one symbol
    pub fn aggregate(&self, symbol: &str, verdicts: &[TimedVerdict], window_end: DateTime<Utc>) -> Result<AggregatePoint> {
        let verdicts = for_symbol(symbol, verdicts);
        self.aggregator.aggregate(symbol, &verdicts, window_end)
    }

    /// Correlate a symbol's sentiment series with its price movement.
    ///
    /// The window ends at the latest verdict or price timestamp supplied.
    pub fn aggregate_and_correlate(
        &self,
        symbol: &str,
        time_window: TimeWindow,
        verdicts: &[TimedVerdict],
        prices: &[SeriesPoint],
    ) -> Result<CorrelationResult> {
        let window_end = verdicts
            .iter()
            .map(|v| v.timestamp)
            .chain(prices.iter().map(|p| p.at))
            .max()
            .ok_or_else(|| SentimentError::InsufficientData {
                symbol: symbol.to_string(),
                reason: "no verdicts or prices supplied".to_string(),
            })?;

        self.aggregate_and_correlate_at(symbol, time_window, verdicts, prices, window_end)
    }

    /// Same as `aggregate_and_correlate` with an explicit window end
    pub fn aggregate_and_correlate_at(
        &self,
        symbol: &str,
        time_window: TimeWindow,
        verdicts: &[TimedVerdict],
        prices: &[SeriesPoint],
        window_end: DateTime<Utc>,
    ) -> Result<CorrelationResult> {
        let verdicts = for_symbol(symbol, verdicts);
        let series = self
            .aggregator
            .series(symbol, &verdicts, time_window, window_end)?;
        let sentiment: Vec<SeriesPoint> = series.iter().map(AggregatePoint::as_series_point).collect();

        // One extra bucket before the window so its first bucket has a price change
        let price_start = window_end - time_window.duration() - time_window.bucket();
        let in_window: Vec<SeriesPoint> = prices
            .iter()
            .filter(|p| p.at > price_start && p.at <= window_end)
            .copied()
            .collect();
        let bucketed = bucket_prices(&in_window, time_window);

        debug!(
            symbol,
            window = %time_window,
            sentiment_points = sentiment.len(),
            price_points = bucketed.len(),
            "Correlating sentiment with price"
        );

        self.correlation
            .correlate(symbol, time_window, &sentiment, &bucketed)
    }
}

impl Default for SentimentAnalytics {
    fn default() -> Self {
        Self {
            aggregator: TemporalAggregator::default(),
            correlation: CorrelationEngine::new(),
        }
    }
}

/// Verdicts tagged with this symbol, or untagged
fn for_symbol(symbol: &str, verdicts: &[TimedVerdict]) -> Vec<TimedVerdict> {
    verdicts
        .iter()
        .filter(|v| {
            v.symbol
                .as_deref()
                .map_or(true, |s| s.eq_ignore_ascii_case(symbol))
        })
        .cloned()
        .collect()
}
