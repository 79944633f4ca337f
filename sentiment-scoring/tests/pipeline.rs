use chrono::Utc;
use sentiment_scoring::{
    EngineConfig, ModelFamily, ScoringPool, SentimentEngine, SentimentLabel, SourceKind, TextInput,
};
use std::sync::Arc;

fn engine() -> SentimentEngine {
    SentimentEngine::new(EngineConfig::default()).unwrap()
}

fn input(text: &str, source: SourceKind) -> TextInput {
    TextInput::new(text, source, Utc::now())
}

const CORPUS: &[&str] = &[
    "",
    "   ",
    "🚀🚀 to the moon!!",
    "Great earnings report /s",
    "not bad",
    "not a bad outcome",
    "The stock isn't terrible, solid quarter",
    "Shares plunge after the company missed estimates and cut guidance",
    "<p>Check https://example.com</p> @someone #hashtag",
    "ALL CAPS AND NOTHING ELSE",
    "oh great, another red day and I'm bagholding",
    "💩📉🤡",
    "!!!!???....",
];

#[tokio::test]
async fn test_verdicts_are_always_well_formed() {
    let engine = engine();
    let long = "strong growth ".repeat(2_000);

    for source in SourceKind::ALL {
        for text in CORPUS.iter().copied().chain(std::iter::once(long.as_str())) {
            let verdict = engine.score(&input(text, source)).await;
            assert!(
                verdict.is_well_formed(),
                "malformed verdict for {:?} from {}: {:?}",
                text,
                source,
                verdict
            );
            assert!(verdict.diagnostics.states.len() >= 4);
        }
    }
}

#[tokio::test]
async fn test_agreeing_models_decide_the_label() {
    let engine = engine();

    for source in SourceKind::ALL {
        for text in CORPUS {
            let verdict = engine.score(&input(text, source)).await;
            let opinions = &verdict.diagnostics.opinions;
            let first = opinions[0].label;
            if opinions.iter().all(|o| o.label == first && o.error.is_none()) {
                assert_eq!(verdict.label, first, "text {:?} from {}", text, source);
            }
        }
    }
}

#[tokio::test]
async fn test_scoring_is_idempotent() {
    let engine = engine();

    for source in SourceKind::ALL {
        for text in CORPUS {
            let input = input(text, source);
            let first = engine.score(&input).await;
            let second = engine.score(&input).await;
            assert_eq!(first, second);
        }
    }
}

#[tokio::test]
async fn test_negated_negative_is_never_negative() {
    let engine = engine();

    for source in SourceKind::ALL {
        for text in ["not bad", "not a bad outcome"] {
            let verdict = engine.score(&input(text, source)).await;
            assert_ne!(verdict.label, SentimentLabel::Negative, "{:?} from {}", text, source);
        }
    }
}

#[tokio::test]
async fn test_sarcasm_marker_inverts() {
    let engine = engine();

    for source in SourceKind::ALL {
        let verdict = engine.score(&input("Great earnings report /s", source)).await;
        assert_eq!(verdict.label, SentimentLabel::Negative, "source {}", source);
        assert!(verdict.score < 0.0);
    }
}

#[tokio::test]
async fn test_enthusiasm_with_mild_risk_words_stays_positive() {
    let engine = engine();

    for source in SourceKind::ALL {
        let verdict = engine
            .score(&input("So glad the risk paid off, great gains", source))
            .await;
        assert_eq!(verdict.label, SentimentLabel::Positive, "source {}", source);
        assert!(verdict.score > 0.0);
    }
}

#[tokio::test]
async fn test_social_slang_is_accepted_by_lexical_model() {
    let engine = engine();
    let verdict = engine.score(&input("🚀🚀 to the moon!!", SourceKind::Social)).await;

    assert_eq!(verdict.label, SentimentLabel::Positive);
    assert!(verdict.score > 0.3);
    assert!(!verdict.diagnostics.escalated);
    assert_eq!(verdict.diagnostics.primary, Some(ModelFamily::Lexical));
}

#[tokio::test]
async fn test_formal_news_negation_end_to_end() {
    let engine = engine();
    let verdict = engine
        .score(&input("The stock isn't terrible, solid quarter", SourceKind::FormalNews))
        .await;

    assert_eq!(verdict.diagnostics.primary, Some(ModelFamily::Transformer));
    assert!(matches!(
        verdict.label,
        SentimentLabel::Positive | SentimentLabel::Neutral
    ));
    assert!(verdict.confidence > 0.0);
}

#[tokio::test]
async fn test_low_confidence_escalates() {
    let engine = engine();
    let verdict = engine
        .score(&input("The stock isn't terrible, solid quarter", SourceKind::FormalNews))
        .await;

    assert!(verdict.diagnostics.escalated);
    assert_eq!(verdict.diagnostics.opinions.len(), 3);
    assert!(verdict.model_used.starts_with("ensemble:"));
}

#[tokio::test]
async fn test_secondary_voter_can_be_disabled() {
    let config = EngineConfig {
        enable_secondary_voter: false,
        ..Default::default()
    };
    let engine = SentimentEngine::new(config).unwrap();
    let verdict = engine
        .score(&input("The stock isn't terrible, solid quarter", SourceKind::FormalNews))
        .await;

    assert_eq!(verdict.diagnostics.opinions.len(), 2);
    assert!(verdict
        .diagnostics
        .opinions
        .iter()
        .all(|o| o.family != ModelFamily::SecondaryVoter));
}

#[tokio::test]
async fn test_pool_matches_individual_scoring() {
    let engine = Arc::new(engine());
    let pool = ScoringPool::new(Arc::clone(&engine));

    let inputs: Vec<TextInput> = CORPUS
        .iter()
        .zip(SourceKind::ALL.iter().cycle())
        .map(|(text, source)| input(text, *source).with_symbol("spy"))
        .collect();

    let pooled = pool.score_all(inputs.clone()).await;
    assert_eq!(pooled.len(), inputs.len());

    for (input, timed) in inputs.iter().zip(&pooled) {
        assert_eq!(timed.id, input.id);
        assert_eq!(timed.symbol.as_deref(), Some("SPY"));
        assert_eq!(timed.verdict, engine.score(input).await);
    }
}
