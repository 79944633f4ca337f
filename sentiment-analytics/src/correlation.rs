//! Correlation between aggregated sentiment and price movement

use chrono::{DateTime, Utc};
use common::{CorrelationResult, Result, SentimentError, SeriesPoint, TimeWindow};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;
use tracing::debug;

/// Fewest aligned points a correlation is computed from
pub const MIN_SAMPLE: usize = 3;

/// Spread below this fraction of a series' magnitude is rounding noise
const FLATNESS_TOLERANCE: f64 = 1e-10;

/// Pearson correlation of sentiment against price percentage change
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationEngine;

impl CorrelationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Correlate a sentiment series with the movement of a price series.
    ///
    /// Prices are converted to period-over-period percentage change first,
    /// then both series are inner-joined on timestamp.
    pub fn correlate(
        &self,
        symbol: &str,
        time_window: TimeWindow,
        sentiment: &[SeriesPoint],
        prices: &[SeriesPoint],
    ) -> Result<CorrelationResult> {
        let changes = pct_changes(prices);
        let (xs, ys) = align(sentiment, &changes);

        if xs.len() < MIN_SAMPLE {
            return Err(SentimentError::InsufficientSample {
                required: MIN_SAMPLE,
                actual: xs.len(),
            });
        }

        let pearson_r = pearson(&xs, &ys)?;
        let p_value = p_value(pearson_r, xs.len());

        debug!(symbol, window = %time_window, r = pearson_r, p = p_value, n = xs.len(), "Correlation computed");

        Ok(CorrelationResult {
            symbol: symbol.to_string(),
            time_window,
            pearson_r,
            p_value,
            sample_size: xs.len(),
        })
    }
}

/// Percentage change from each point to the next; changes off a zero price are skipped
pub fn pct_changes(prices: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let mut sorted = prices.to_vec();
    sorted.sort_by_key(|p| p.at);

    sorted
        .windows(2)
        .filter(|w| w[0].value != 0.0)
        .map(|w| SeriesPoint::new(w[1].at, (w[1].value - w[0].value) / w[0].value))
        .collect()
}

/// Last price in each bucket of the window, keyed by bucket start
pub fn bucket_prices(prices: &[SeriesPoint], window: TimeWindow) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, SeriesPoint> = BTreeMap::new();
    for point in prices {
        let start = window.bucket_start(point.at);
        match buckets.get(&start) {
            Some(existing) if existing.at > point.at => {}
            _ => {
                buckets.insert(start, *point);
            }
        }
    }

    buckets
        .into_iter()
        .map(|(start, point)| SeriesPoint::new(start, point.value))
        .collect()
}

/// Inner join on timestamp
fn align(left: &[SeriesPoint], right: &[SeriesPoint]) -> (Vec<f64>, Vec<f64>) {
    let right: BTreeMap<DateTime<Utc>, f64> = right.iter().map(|p| (p.at, p.value)).collect();
    let mut left: Vec<&SeriesPoint> = left.iter().collect();
    left.sort_by_key(|p| p.at);

    left.into_iter()
        .filter_map(|p| right.get(&p.at).map(|r| (p.value, *r)))
        .unzip()
}

/// Pearson's r; a constant series has no defined correlation
fn pearson(xs: &[f64], ys: &[f64]) -> Result<f64> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    if is_flat(xs, variance_x) {
        return Err(SentimentError::ZeroVariance {
            series: "sentiment",
            points: xs.len(),
        });
    }
    if is_flat(ys, variance_y) {
        return Err(SentimentError::ZeroVariance {
            series: "price change",
            points: ys.len(),
        });
    }

    Ok((covariance / (variance_x * variance_y).sqrt()).clamp(-1.0, 1.0))
}

/// True when the series is constant up to rounding, judged against its own scale
fn is_flat(values: &[f64], sum_sq_dev: f64) -> bool {
    let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let spread = (sum_sq_dev / values.len() as f64).sqrt();
    spread <= FLATNESS_TOLERANCE * scale
}

/// Two-sided p-value from Student's t with n - 2 degrees of freedom
fn p_value(r: f64, n: usize) -> f64 {
    let denominator = 1.0 - r * r;
    if denominator <= f64::EPSILON {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = r * (df / denominator).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(d)
    }

    fn series(values: &[(i64, f64)]) -> Vec<SeriesPoint> {
        values.iter().map(|(d, v)| SeriesPoint::new(day(*d), *v)).collect()
    }

    #[test]
    fn test_two_points_is_insufficient() {
        let engine = CorrelationEngine::new();
        let sentiment = series(&[(1, 0.1), (2, 0.2)]);
        let prices = series(&[(0, 100.0), (1, 101.0), (2, 103.0)]);

        let err = engine
            .correlate("AAPL", TimeWindow::SevenDays, &sentiment, &prices)
            .unwrap_err();
        assert!(matches!(
            err,
            SentimentError::InsufficientSample { required: 3, actual: 2 }
        ));
    }

    #[test]
    fn test_three_points_linear_comovement() {
        let engine = CorrelationEngine::new();
        // price changes: +1%, +2%, +3%
        let prices = series(&[(0, 100.0), (1, 101.0), (2, 103.02), (3, 106.1106)]);
        let sentiment = series(&[(1, 0.1), (2, 0.2), (3, 0.3)]);

        let result = engine
            .correlate("AAPL", TimeWindow::SevenDays, &sentiment, &prices)
            .unwrap();
        assert_eq!(result.sample_size, 3);
        assert!((result.pearson_r - 1.0).abs() < 0.01);

        let inverse = series(&[(1, 0.3), (2, 0.2), (3, 0.1)]);
        let result = engine
            .correlate("AAPL", TimeWindow::SevenDays, &inverse, &prices)
            .unwrap();
        assert!((result.pearson_r + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_unmatched_dates_are_dropped() {
        let engine = CorrelationEngine::new();
        let prices = series(&[(0, 100.0), (1, 102.0), (2, 101.0), (3, 104.0), (5, 103.0)]);
        let sentiment = series(&[(1, 0.5), (2, -0.2), (3, 0.6), (4, 0.9)]);

        let result = engine
            .correlate("AAPL", TimeWindow::FourteenDays, &sentiment, &prices)
            .unwrap();
        assert_eq!(result.sample_size, 3);
        assert!(result.pearson_r > 0.9);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn test_constant_sentiment_is_zero_variance() {
        let engine = CorrelationEngine::new();
        let prices = series(&[(0, 100.0), (1, 101.0), (2, 99.0), (3, 104.0)]);
        let sentiment = series(&[(1, 0.2), (2, 0.2), (3, 0.2)]);

        let err = engine
            .correlate("AAPL", TimeWindow::SevenDays, &sentiment, &prices)
            .unwrap_err();
        assert!(matches!(err, SentimentError::ZeroVariance { series: "sentiment", .. }));
    }

    #[test]
    fn test_tiny_changes_still_correlate() {
        let r = pearson(&[0.1, 0.2, 0.3], &[1e-9, 2e-9, 3e-9]).unwrap();
        assert!((r - 1.0).abs() < 1e-9);

        let prices = series(&[(0, 100.0), (1, 100.000001), (2, 100.000003), (3, 100.000006)]);
        let sentiment = series(&[(1, 0.1), (2, 0.2), (3, 0.3)]);
        let result = CorrelationEngine::new()
            .correlate("AAPL", TimeWindow::SevenDays, &sentiment, &prices)
            .unwrap();
        assert!(result.pearson_r > 0.99);
    }

    #[test]
    fn test_steady_price_drift_is_zero_variance() {
        // identical +1% moves differ only by rounding
        let prices = series(&[(0, 100.0), (1, 101.0), (2, 102.01), (3, 103.0301)]);
        let sentiment = series(&[(1, 0.1), (2, 0.5), (3, 0.2)]);
        let err = CorrelationEngine::new()
            .correlate("AAPL", TimeWindow::SevenDays, &sentiment, &prices)
            .unwrap_err();
        assert!(matches!(err, SentimentError::ZeroVariance { series: "price change", .. }));
    }

    #[test]
    fn test_p_value_shrinks_with_sample_size() {
        assert!(p_value(0.6, 30) < p_value(0.6, 5));
        assert_eq!(p_value(1.0, 3), 0.0);
        assert!((p_value(0.0, 10) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pct_changes_skip_zero_base() {
        let changes = pct_changes(&series(&[(0, 0.0), (1, 10.0), (2, 11.0)]));
        assert_eq!(changes.len(), 1);
        assert!((changes[0].value - 0.1).abs() < 1e-12);
        assert_eq!(changes[0].at, day(2));
    }

    #[test]
    fn test_bucket_prices_keep_last_close() {
        let prices = vec![
            SeriesPoint::new(day(1) + Duration::hours(15), 101.0),
            SeriesPoint::new(day(1) + Duration::hours(9), 100.0),
            SeriesPoint::new(day(2) + Duration::hours(10), 99.0),
        ];
        let buckets = bucket_prices(&prices, TimeWindow::SevenDays);

        assert_eq!(buckets, vec![SeriesPoint::new(day(1), 101.0), SeriesPoint::new(day(2), 99.0)]);
    }
}
