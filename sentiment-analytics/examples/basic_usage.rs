//! Example usage of the sentiment analytics layer

use chrono::{Duration, TimeZone, Utc};
use common::{SeriesPoint, SourceKind, TextInput, TimeWindow};
use sentiment_analytics::{SentimentAnalytics, TemporalAggregator};
use sentiment_scoring::{EngineConfig, ScoringPool, SentimentEngine};
use std::sync::Arc;
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    println!("=== Sentiment Analytics Example ===\n");

    // Example 1: Score a week of collected texts
    println!("Example 1: Scoring Collected Texts");
    let engine = Arc::new(SentimentEngine::new(EngineConfig::default())?);
    let pool = ScoringPool::new(engine);

    let end = Utc
        .with_ymd_and_hms(2024, 3, 15, 18, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid example date"))?;
    let texts = [
        (6, "Shares plunge after the company missed estimates", SourceKind::FormalNews),
        (5, "not great, guidance cut again", SourceKind::Forum),
        (4, "solid quarter, nothing special", SourceKind::Comment),
        (3, "Record profit and strong growth", SourceKind::FormalNews),
        (2, "🚀🚀 to the moon!!", SourceKind::Social),
        (1, "Company beat expectations and raised guidance", SourceKind::FormalNews),
        (0, "diamond hands 💎🙌 this rally is real", SourceKind::Social),
    ];
    let inputs: Vec<TextInput> = texts
        .iter()
        .map(|(days_ago, text, source)| {
            TextInput::new(*text, *source, end - Duration::days(*days_ago)).with_symbol("ACME")
        })
        .collect();

    let verdicts = pool.score_all(inputs).await;
    for timed in &verdicts {
        println!(
            "  {}  {:>8}  {:+.3}",
            timed.timestamp.format("%Y-%m-%d"),
            timed.verdict.label,
            timed.verdict.score
        );
    }
    println!();

    // Example 2: Recency weights
    println!("Example 2: Recency Weights (24h half-life)");
    let aggregator = TemporalAggregator::default();
    for hours in [0, 24, 48, 96, 240] {
        println!("  {:>3}h old -> weight {:.3}", hours, aggregator.weight(Duration::hours(hours)));
    }
    println!();

    // Example 3: Decayed aggregate
    println!("Example 3: Decayed Aggregate");
    let analytics = SentimentAnalytics::new()?;
    let point = analytics.aggregate("ACME", &verdicts, end)?;
    println!("  Weighted mean: {:+.3}", point.weighted_mean_sentiment);
    println!("  Volatility: {:.3}", point.volatility);
    println!("  Samples: {}\n", point.sample_count);

    // Example 4: Correlation against daily closes
    println!("Example 4: Sentiment vs Price Correlation");
    let closes = [100.0, 97.5, 96.0, 96.5, 99.0, 102.0, 104.5, 107.0];
    let prices: Vec<SeriesPoint> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| SeriesPoint::new(end - Duration::days(7 - i as i64), *close))
        .collect();

    match analytics.aggregate_and_correlate("ACME", TimeWindow::SevenDays, &verdicts, &prices) {
        Ok(result) => {
            println!("  Pearson r: {:.3}", result.pearson_r);
            println!("  p-value: {:.4}", result.p_value);
            println!("  Sample size: {}", result.sample_size);
            println!("  Significant at 5%: {}", result.is_significant(0.05));
            println!("\n{}", serde_json::to_string_pretty(&result)?);
        }
        Err(e) if e.is_insufficient() => println!("  Not enough data: {}", e),
        Err(e) => return Err(e.into()),
    }
    println!();

    // Example 5: Too little data is reported, not fabricated
    println!("Example 5: Insufficient Sample");
    let short = &prices[prices.len() - 2..];
    match analytics.aggregate_and_correlate("ACME", TimeWindow::SevenDays, &verdicts, short) {
        Ok(result) => println!("  Unexpected result: {:?}", result),
        Err(e) => println!("  ✗ Expected error: {}", e),
    }
    println!();

    println!("=== Example Complete ===");
    Ok(())
}
