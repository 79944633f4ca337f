//! Time-series shapes produced by aggregation and correlation

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SentimentError;

/// Lookback windows offered to the analytics layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "14d")]
    FourteenDays,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::OneDay => "1d",
            TimeWindow::SevenDays => "7d",
            TimeWindow::FourteenDays => "14d",
        }
    }

    /// Total span covered by the window
    pub fn duration(&self) -> Duration {
        match self {
            TimeWindow::OneDay => Duration::days(1),
            TimeWindow::SevenDays => Duration::days(7),
            TimeWindow::FourteenDays => Duration::days(14),
        }
    }

    /// Width of one series bucket: hourly for a single day, daily otherwise
    pub fn bucket(&self) -> Duration {
        match self {
            TimeWindow::OneDay => Duration::hours(1),
            TimeWindow::SevenDays | TimeWindow::FourteenDays => Duration::days(1),
        }
    }

    /// Start of the bucket containing `at`
    pub fn bucket_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let width = self.bucket().num_seconds();
        let secs = at.timestamp();
        let start = secs - secs.rem_euclid(width);
        DateTime::from_timestamp(start, 0).unwrap_or(at)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = SentimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(TimeWindow::OneDay),
            "7d" => Ok(TimeWindow::SevenDays),
            "14d" => Ok(TimeWindow::FourteenDays),
            other => Err(SentimentError::configuration(format!(
                "invalid time window '{}', expected one of 1d, 7d, 14d",
                other
            ))),
        }
    }
}

/// One observation of a dated series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(at: DateTime<Utc>, value: f64) -> Self {
        Self { at, value }
    }
}

impl From<(DateTime<Utc>, f64)> for SeriesPoint {
    fn from((at, value): (DateTime<Utc>, f64)) -> Self {
        Self { at, value }
    }
}

/// Recency-weighted sentiment for one symbol over one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub symbol: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub weighted_mean_sentiment: f64,
    pub sample_count: usize,
    pub volatility: f64,
}

impl AggregatePoint {
    pub fn as_series_point(&self) -> SeriesPoint {
        SeriesPoint::new(self.window_start, self.weighted_mean_sentiment)
    }
}

/// Pearson correlation between aggregated sentiment and price movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub symbol: String,
    pub time_window: TimeWindow,
    pub pearson_r: f64,
    pub p_value: f64,
    pub sample_size: usize,
}

impl CorrelationResult {
    /// Two-sided significance at the given alpha
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}
