//! Example usage of the sentiment scoring engine
//!
//! This example demonstrates:
//! 1. Building the engine from the default configuration
//! 2. Scoring single texts from different sources
//! 3. Scoring a batch through the worker pool
//! 4. Example verdict format

use anyhow::Result;
use chrono::{Duration, Utc};
use sentiment_scoring::{EngineConfig, ScoringPool, SentimentEngine, SentimentVerdict, SourceKind, TextInput};
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("📊 Sentiment Scoring Engine - Example");
    info!("=====================================");

    // Step 1: Build the engine
    let engine = Arc::new(SentimentEngine::new(EngineConfig::default())?);
    info!("✅ Engine created");

    // Step 2: Score a few single texts
    info!("\n=== SINGLE TEXTS ===\n");
    let samples = [
        ("🚀🚀 to the moon!!", SourceKind::Social),
        ("Great earnings report /s", SourceKind::Forum),
        ("The stock isn't terrible, solid quarter", SourceKind::FormalNews),
        ("not bad", SourceKind::Comment),
    ];

    for (text, source) in samples {
        let verdict = engine.score_text(text, source).await;
        print_verdict(text, &verdict);
    }

    // Step 3: Score a batch through the pool
    info!("\n=== BATCH SCORING ===\n");
    let pool = ScoringPool::new(Arc::clone(&engine));
    let now = Utc::now();
    let inputs = create_example_inputs(now);
    let count = inputs.len();

    let verdicts = pool.score_all(inputs).await;
    info!("Scored {} inputs", count);
    for timed in &verdicts {
        info!(
            "  {} {:?} {} ({:+.2}, conf {:.2})",
            timed.timestamp.format("%H:%M"),
            timed.symbol,
            timed.verdict.label,
            timed.verdict.score,
            timed.verdict.confidence
        );
    }

    // Step 4: Show the full verdict format
    info!("\n=== EXAMPLE VERDICT FORMAT ===\n");
    if let Some(timed) = verdicts.first() {
        let json = serde_json::to_string_pretty(timed)?;
        info!("\n{}\n", json);
    }

    Ok(())
}

fn create_example_inputs(now: chrono::DateTime<Utc>) -> Vec<TextInput> {
    vec![
        TextInput::new(
            "Apple beat expectations and raised guidance",
            SourceKind::FormalNews,
            now - Duration::hours(3),
        )
        .with_symbol("AAPL"),
        TextInput::new("AAPL diamond hands 💎🙌 all day", SourceKind::Social, now - Duration::hours(2))
            .with_symbol("AAPL"),
        TextInput::new(
            "Oh great, another guidance cut and I'm bagholding",
            SourceKind::Forum,
            now - Duration::hours(1),
        )
        .with_symbol("TSLA"),
        TextInput::new("Shares plunge after the company missed estimates", SourceKind::FormalNews, now)
            .with_symbol("TSLA"),
    ]
}

fn print_verdict(text: &str, verdict: &SentimentVerdict) {
    info!("📝 \"{}\"", text);
    info!("  Label: {}", verdict.label);
    info!("  Score: {:.3} (range: -1.0 to 1.0)", verdict.score);
    info!("  Confidence: {:.2}%", verdict.confidence * 100.0);
    info!("  Model: {}", verdict.model_used);
    info!("  Escalated: {}", verdict.diagnostics.escalated);
    if !verdict.diagnostics.errors.is_empty() {
        info!("  Errors: {:?}", verdict.diagnostics.errors);
    }
}
