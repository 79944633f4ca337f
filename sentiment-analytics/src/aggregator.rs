//! Temporal aggregation of verdicts with exponential recency weighting

use chrono::{DateTime, Duration, Utc};
use common::{AggregatePoint, EngineConfig, Result, SentimentError, TimeWindow, TimedVerdict};
use std::collections::BTreeMap;
use tracing::debug;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Decayed average sentiment and volatility over a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalAggregator {
    half_life_hours: f64,
    min_weight: f64,
}

impl TemporalAggregator {
    pub fn new(half_life_hours: f64, min_weight: f64) -> Self {
        Self {
            half_life_hours,
            min_weight,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.decay_half_life_hours, config.min_weight)
    }

    /// weight = max(0.5^(age_hours / half_life), min_weight)
    pub fn weight(&self, age: Duration) -> f64 {
        let age_hours = age.num_milliseconds() as f64 / MILLIS_PER_HOUR;
        0.5_f64
            .powf(age_hours / self.half_life_hours)
            .max(self.min_weight)
    }

    /// Aggregate every verdict at or before `window_end`
    pub fn aggregate(&self, symbol: &str, verdicts: &[TimedVerdict], window_end: DateTime<Utc>) -> Result<AggregatePoint> {
        let start = verdicts
            .iter()
            .map(|v| v.timestamp)
            .filter(|t| *t <= window_end)
            .min()
            .ok_or_else(|| insufficient(symbol, "no verdicts at or before window end"))?;

        self.aggregate_window(symbol, verdicts, start, window_end)
    }

    /// Aggregate verdicts with `window_start <= timestamp <= window_end`
    pub fn aggregate_window(
        &self,
        symbol: &str,
        verdicts: &[TimedVerdict],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<AggregatePoint> {
        let weighted: Vec<(f64, f64)> = verdicts
            .iter()
            .filter(|v| v.timestamp >= window_start && v.timestamp <= window_end)
            .map(|v| (v.score(), self.weight(window_end - v.timestamp)))
            .collect();

        if weighted.is_empty() {
            return Err(insufficient(symbol, "no verdicts in window"));
        }

        let total: f64 = weighted.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(insufficient(symbol, "verdict weights sum to zero"));
        }

        let mean = weighted.iter().map(|(s, w)| s * w).sum::<f64>() / total;
        let variance = weighted
            .iter()
            .map(|(s, w)| w * (s - mean).powi(2))
            .sum::<f64>()
            / total;

        Ok(AggregatePoint {
            symbol: symbol.to_string(),
            window_start,
            window_end,
            weighted_mean_sentiment: mean,
            sample_count: weighted.len(),
            volatility: variance.sqrt(),
        })
    }

    /// One aggregate per non-empty bucket of the window ending at `window_end`.
    ///
    /// Each bucket decays toward its own end, so points are comparable with
    /// the bucketed price series.
    pub fn series(
        &self,
        symbol: &str,
        verdicts: &[TimedVerdict],
        window: TimeWindow,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<AggregatePoint>> {
        let window_start = window_end - window.duration();

        let mut buckets: BTreeMap<DateTime<Utc>, Vec<TimedVerdict>> = BTreeMap::new();
        for verdict in verdicts {
            if verdict.timestamp > window_start && verdict.timestamp <= window_end {
                buckets
                    .entry(window.bucket_start(verdict.timestamp))
                    .or_default()
                    .push(verdict.clone());
            }
        }

        if buckets.is_empty() {
            return Err(insufficient(symbol, &format!("no verdicts in the last {}", window)));
        }

        let points = buckets
            .into_iter()
            .map(|(start, members)| {
                let end = (start + window.bucket()).min(window_end);
                self.aggregate_window(symbol, &members, start, end)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(symbol, window = %window, points = points.len(), "Built sentiment series");
        Ok(points)
    }
}

impl Default for TemporalAggregator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn insufficient(symbol: &str, reason: &str) -> SentimentError {
    SentimentError::InsufficientData {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    }
}
