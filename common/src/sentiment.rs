//! Sentiment domain types: inputs, per-model opinions and final verdicts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SentimentError;

/// Half-width of the neutral band around zero used by every label decision
pub const NEUTRAL_BAND: f64 = 0.05;

/// Where a piece of text was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Social,
    Forum,
    FormalNews,
    Comment,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Social,
        SourceKind::Forum,
        SourceKind::FormalNews,
        SourceKind::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Social => "social",
            SourceKind::Forum => "forum",
            SourceKind::FormalNews => "formal_news",
            SourceKind::Comment => "comment",
        }
    }

    /// Informal user-generated text (short, slang-heavy)
    pub fn is_informal(&self) -> bool {
        !matches!(self, SourceKind::FormalNews)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = SentimentError;

    /// Accepts the canonical names plus the collector names used upstream
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "social" | "twitter" | "x" | "stocktwits" => Ok(SourceKind::Social),
            "forum" | "reddit" => Ok(SourceKind::Forum),
            "formal_news" | "news" | "newsapi" | "finnhub" => Ok(SourceKind::FormalNews),
            "comment" | "hackernews" | "hn" => Ok(SourceKind::Comment),
            other => Err(SentimentError::configuration(format!(
                "unknown source '{}', expected one of social, forum, formal_news, comment",
                other
            ))),
        }
    }
}

/// Three-way sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Label a directional score using the shared ±0.05 neutral band
    pub fn from_score(score: f64) -> Self {
        if score >= NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if score <= -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Positive <-> negative; neutral is its own inverse
    pub fn inverted(&self) -> Self {
        match self {
            SentimentLabel::Positive => SentimentLabel::Negative,
            SentimentLabel::Negative => SentimentLabel::Positive,
            SentimentLabel::Neutral => SentimentLabel::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    /// Whether a score's sign is compatible with this label
    pub fn admits(&self, score: f64) -> bool {
        match self {
            SentimentLabel::Positive => score >= 0.0,
            SentimentLabel::Negative => score <= 0.0,
            SentimentLabel::Neutral => true,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model families the ensemble knows how to weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Rule + lexicon scorer (VADER family)
    Lexical,
    /// Contextual financial classifier (FinBERT family)
    Transformer,
    /// Lighter contextual classifier used only on escalation (DistilBERT family)
    SecondaryVoter,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Lexical,
        ModelFamily::Transformer,
        ModelFamily::SecondaryVoter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Lexical => "lexical",
            ModelFamily::Transformer => "transformer",
            ModelFamily::SecondaryVoter => "secondary_voter",
        }
    }

    pub fn is_transformer_family(&self) -> bool {
        matches!(self, ModelFamily::Transformer | ModelFamily::SecondaryVoter)
    }

    /// Preference order used when equal-confidence opinions disagree (lower wins)
    pub fn tie_break_rank(&self) -> u8 {
        match self {
            ModelFamily::Transformer => 0,
            ModelFamily::SecondaryVoter => 1,
            ModelFamily::Lexical => 2,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collected piece of text, handed to the engine by value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub id: Uuid,
    pub text: String,
    pub source: SourceKind,
    pub symbol: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TextInput {
    pub fn new(text: impl Into<String>, source: SourceKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            source,
            symbol: None,
            timestamp,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into().to_uppercase());
        self
    }
}

/// Why a trigger fired in the sarcasm stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SarcasmTrigger {
    /// Explicit trailing "/s" marker
    Marker,
    /// Enthusiastic phrasing paired with negative context
    Mismatch,
}

/// Post-hoc adjustment applied to a model's raw output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Adjustment {
    Truncated { from_tokens: usize, to_tokens: usize },
    Negation { cues: usize, moved_mass: f64 },
    Sarcasm { trigger: SarcasmTrigger, penalty: f64 },
}

/// One model's pre-ensemble output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOpinion {
    pub label: SentimentLabel,
    pub score: f64,      // -1.0 to 1.0
    pub confidence: f64, // 0.0 to 1.0
    pub raw_scores: BTreeMap<String, f64>,
    pub model_name: String,
    pub family: ModelFamily,
    pub processing_time_ms: f64,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    /// Set when the model failed internally and this opinion is a stand-in
    #[serde(default)]
    pub error: Option<String>,
}

impl ModelOpinion {
    /// Neutral, zero-confidence opinion recorded when a model cannot score
    pub fn degraded(family: ModelFamily, model_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            confidence: 0.0,
            raw_scores: BTreeMap::new(),
            model_name: model_name.into(),
            family,
            processing_time_ms: 0.0,
            adjustments: Vec::new(),
            error: Some(reason.into()),
        }
    }

    /// Neutral, zero-confidence opinion for text with nothing to score
    pub fn abstain(family: ModelFamily, model_name: impl Into<String>) -> Self {
        Self {
            error: None,
            ..Self::degraded(family, model_name, "")
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    pub fn record(&self) -> OpinionRecord {
        OpinionRecord {
            model_name: self.model_name.clone(),
            family: self.family,
            label: self.label,
            score: self.score,
            confidence: self.confidence,
            raw_scores: self.raw_scores.clone(),
            adjustments: self.adjustments.clone(),
            error: self.error.clone(),
        }
    }
}

/// Opinion as recorded in verdict diagnostics (timing excluded so verdicts stay reproducible)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionRecord {
    pub model_name: String,
    pub family: ModelFamily,
    pub label: SentimentLabel,
    pub score: f64,
    pub confidence: f64,
    pub raw_scores: BTreeMap<String, f64>,
    pub adjustments: Vec<Adjustment>,
    pub error: Option<String>,
}

/// States of the ensemble state machine, in the order a call can visit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleState {
    Route,
    PrimaryScore,
    Accept,
    Escalate,
    SecondaryScore,
    Vote,
    Final,
}

/// Audit trail attached to every verdict
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VerdictDiagnostics {
    pub source: Option<SourceKind>,
    pub primary: Option<ModelFamily>,
    pub states: Vec<EnsembleState>,
    pub escalated: bool,
    /// Escalation produced nothing usable and the primary opinion was kept
    pub fallback: bool,
    pub disagreement: bool,
    pub tie_break: bool,
    pub opinions: Vec<OpinionRecord>,
    /// Effective vote weight per model name
    pub weights: BTreeMap<String, f64>,
    pub errors: Vec<String>,
}

/// The single final judgment for one text item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentVerdict {
    pub label: SentimentLabel,
    pub score: f64,
    pub confidence: f64,
    pub model_used: String,
    pub diagnostics: VerdictDiagnostics,
}

impl SentimentVerdict {
    /// Neutral verdict used when scoring could not run at all
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            confidence: 0.0,
            model_used: "none".to_string(),
            diagnostics: VerdictDiagnostics {
                errors: vec![reason.into()],
                ..Default::default()
            },
        }
    }

    /// Checks the verdict invariants: bounded score and confidence, label consistent with sign
    pub fn is_well_formed(&self) -> bool {
        (-1.0..=1.0).contains(&self.score)
            && (0.0..=1.0).contains(&self.confidence)
            && self.label.admits(self.score)
    }
}

/// A verdict together with the metadata of the text it was produced for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedVerdict {
    pub id: Uuid,
    pub symbol: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub verdict: SentimentVerdict,
}

impl TimedVerdict {
    pub fn new(verdict: SentimentVerdict, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: None,
            timestamp,
            verdict,
        }
    }

    pub fn for_input(input: &TextInput, verdict: SentimentVerdict) -> Self {
        Self {
            id: input.id,
            symbol: input.symbol.clone(),
            timestamp: input.timestamp,
            verdict,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into().to_uppercase());
        self
    }

    pub fn score(&self) -> f64 {
        self.verdict.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_score_band() {
        assert_eq!(SentimentLabel::from_score(0.05), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.049), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.05), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
    }

    #[test]
    fn test_source_from_collector_names() {
        assert_eq!("reddit".parse::<SourceKind>().unwrap(), SourceKind::Forum);
        assert_eq!("Finnhub".parse::<SourceKind>().unwrap(), SourceKind::FormalNews);
        assert_eq!("hn".parse::<SourceKind>().unwrap(), SourceKind::Comment);
        assert!("fax".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_degraded_opinion() {
        let opinion = ModelOpinion::degraded(ModelFamily::Transformer, "finbert", "timeout");
        assert!(opinion.is_degraded());
        assert_eq!(opinion.confidence, 0.0);
        assert_eq!(opinion.label, SentimentLabel::Neutral);

        let abstained = ModelOpinion::abstain(ModelFamily::Lexical, "vader");
        assert!(!abstained.is_degraded());
    }

    #[test]
    fn test_verdict_well_formed() {
        let mut verdict = SentimentVerdict::degraded("boom");
        assert!(verdict.is_well_formed());

        verdict.label = SentimentLabel::Negative;
        verdict.score = 0.4;
        assert!(!verdict.is_well_formed());
    }

    #[test]
    fn test_symbol_uppercased() {
        let input = TextInput::new("hi", SourceKind::Social, Utc::now()).with_symbol("aapl");
        assert_eq!(input.symbol.as_deref(), Some("AAPL"));
    }
}
