//! Classifier backends for the contextual models
//!
//! A backend turns (already truncated) text into three class probabilities.
//! It is deliberately literal: negation and sarcasm are handled by the
//! adjustment stages around it, so any inference runtime can be swapped in
//! behind `ClassifierBackend` without losing those corrections.

use async_trait::async_trait;
use common::{Result, SentimentError, SentimentLabel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::lexicon::contains_phrase;
use crate::normalizer::tokenize;

/// Class probabilities emitted by a three-way classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl ClassProbabilities {
    /// Numerically stable softmax over (positive, negative, neutral) logits
    pub fn from_logits(positive: f64, negative: f64, neutral: f64) -> Self {
        let max = positive.max(negative).max(neutral);
        let (p, n, u) = (
            (positive - max).exp(),
            (negative - max).exp(),
            (neutral - max).exp(),
        );
        let sum = p + n + u;
        Self {
            positive: p / sum,
            negative: n / sum,
            neutral: u / sum,
        }
    }

    /// Rescale to a proper distribution; None when the output is unusable
    pub fn normalized(self) -> Option<Self> {
        let parts = [self.positive, self.negative, self.neutral];
        if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return None;
        }
        let sum: f64 = parts.iter().sum();
        if sum <= 0.0 {
            return None;
        }
        Some(Self {
            positive: self.positive / sum,
            negative: self.negative / sum,
            neutral: self.neutral / sum,
        })
    }

    /// Strict argmax; any tie resolves to neutral
    pub fn argmax(&self) -> SentimentLabel {
        if self.positive > self.negative && self.positive > self.neutral {
            SentimentLabel::Positive
        } else if self.negative > self.positive && self.negative > self.neutral {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Directional signal bounded by probability mass
    pub fn score(&self) -> f64 {
        (self.positive - self.negative).clamp(-1.0, 1.0)
    }

    pub fn confidence(&self) -> f64 {
        self.positive.max(self.negative).max(self.neutral)
    }

    /// Exchange positive and negative mass
    pub fn swapped(self) -> Self {
        Self {
            positive: self.negative,
            negative: self.positive,
            neutral: self.neutral,
        }
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("positive".to_string(), self.positive);
        map.insert("negative".to_string(), self.negative);
        map.insert("neutral".to_string(), self.neutral);
        map
    }
}

/// Inference seam for contextual models
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Classify one text. Errors are absorbed by the calling model.
    async fn classify(&self, text: &str) -> Result<ClassProbabilities>;

    /// Whether the text carries anything this backend can read. Models
    /// abstain instead of classifying text without evidence.
    fn has_evidence(&self, _text: &str) -> bool {
        true
    }

    /// Classify several texts in one call (optional optimization)
    ///
    /// Default implementation calls classify for each text. Overrides must
    /// return exactly what individual calls would.
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<ClassProbabilities>> {
        let mut outputs = Vec::with_capacity(texts.len());
        for text in texts {
            outputs.push(self.classify(text).await?);
        }
        Ok(outputs)
    }
}

/// Deterministic keyword-evidence classifier.
///
/// Sums positive and negative evidence from a weighted vocabulary and
/// phrase list, then maps (evidence, neutral prior) logits through a softmax.
pub struct KeywordClassifier {
    name: String,
    positive: HashMap<String, f64>,
    negative: HashMap<String, f64>,
    phrases: Vec<(String, f64)>,
    evidence_scale: f64,
    neutral_prior: f64,
}

impl KeywordClassifier {
    pub fn new(
        name: impl Into<String>,
        vocabulary: &[(&str, f64)],
        phrases: &[(&str, f64)],
        evidence_scale: f64,
        neutral_prior: f64,
    ) -> Self {
        let mut positive = HashMap::new();
        let mut negative = HashMap::new();
        for (word, weight) in vocabulary {
            if *weight >= 0.0 {
                positive.insert(word.to_string(), *weight);
            } else {
                negative.insert(word.to_string(), -*weight);
            }
        }

        Self {
            name: name.into(),
            positive,
            negative,
            phrases: phrases.iter().map(|(p, w)| (p.to_string(), *w)).collect(),
            evidence_scale,
            neutral_prior,
        }
    }

    /// Full financial-news vocabulary (transformer family)
    pub fn financial() -> Self {
        Self::new(
            "financial-phrase-classifier",
            FINANCIAL_VOCABULARY,
            FINANCIAL_PHRASES,
            2.0,
            1.0,
        )
    }

    /// Smaller general vocabulary (secondary voter)
    pub fn compact() -> Self {
        Self::new("compact-phrase-classifier", COMPACT_VOCABULARY, &[], 1.6, 0.8)
    }

    /// Positive and negative evidence found in the text
    fn evidence(&self, text: &str) -> (f64, f64) {
        let mut positive = 0.0;
        let mut negative = 0.0;

        for token in tokenize(text) {
            if let Some(w) = self.positive.get(&token.word) {
                positive += w;
            } else if let Some(w) = self.negative.get(&token.word) {
                negative += w;
            }
        }

        let lowered = text.to_lowercase();
        for (phrase, weight) in &self.phrases {
            if contains_phrase(&lowered, phrase) {
                if *weight >= 0.0 {
                    positive += weight;
                } else {
                    negative -= weight;
                }
            }
        }

        (positive, negative)
    }
}

#[async_trait]
impl ClassifierBackend for KeywordClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_evidence(&self, text: &str) -> bool {
        let (positive, negative) = self.evidence(text);
        positive > 0.0 || negative > 0.0
    }

    async fn classify(&self, text: &str) -> Result<ClassProbabilities> {
        let (positive, negative) = self.evidence(text);
        let probs = ClassProbabilities::from_logits(
            self.evidence_scale * positive,
            self.evidence_scale * negative,
            self.neutral_prior,
        );
        probs
            .normalized()
            .ok_or_else(|| SentimentError::degraded(&self.name, "non-finite class probabilities"))
    }
}

const FINANCIAL_VOCABULARY: &[(&str, f64)] = &[
    ("beat", 1.0), ("beats", 1.0), ("surge", 1.0), ("surges", 1.0), ("surged", 1.0),
    ("soar", 1.0), ("soars", 1.0), ("rally", 0.9), ("rallies", 0.9), ("growth", 0.8),
    ("profit", 0.8), ("profits", 0.8), ("record", 0.6), ("strong", 0.7), ("solid", 0.6),
    ("great", 1.0), ("good", 0.7), ("bullish", 1.0), ("upgrade", 0.9), ("upgraded", 0.9),
    ("outperform", 0.9), ("gain", 0.7), ("gains", 0.7), ("rise", 0.5), ("rises", 0.5),
    ("exceed", 0.9), ("exceeds", 0.9), ("exceeded", 0.9), ("impressive", 0.8), ("optimistic", 0.7),
    ("robust", 0.7), ("boost", 0.6), ("improved", 0.6), ("improve", 0.6), ("recovery", 0.6),
    ("rebound", 0.6), ("success", 0.8), ("positive", 0.6), ("excellent", 1.0), ("moon", 0.8),
    ("higher", 0.4), ("dividend", 0.3), ("expansion", 0.5), ("deliver", 0.4), ("delivered", 0.5),
    ("miss", -1.0), ("misses", -1.0), ("missed", -1.0), ("plunge", -1.0), ("plunges", -1.0),
    ("crash", -1.2), ("decline", -0.8), ("declines", -0.8), ("loss", -0.9), ("losses", -0.9),
    ("bad", -0.9), ("terrible", -1.0), ("awful", -1.0), ("weak", -0.8), ("bearish", -1.0),
    ("downgrade", -0.9), ("downgraded", -0.9), ("fail", -0.9), ("fails", -0.9), ("failed", -0.9),
    ("lawsuit", -0.8), ("fraud", -1.2), ("bankruptcy", -1.2), ("layoffs", -0.8), ("drop", -0.7),
    ("drops", -0.7), ("fall", -0.6), ("falls", -0.6), ("lower", -0.4), ("risk", -0.4),
    ("concern", -0.5), ("concerns", -0.5), ("warning", -0.6), ("disappointing", -0.9), ("underperform", -0.9),
    ("selloff", -0.9), ("recession", -0.9), ("debt", -0.4), ("worst", -1.0), ("tanking", -1.0),
    ("down", -0.5), ("dump", -0.9),
];

const FINANCIAL_PHRASES: &[(&str, f64)] = &[
    ("beat expectations", 1.2),
    ("raised guidance", 1.2),
    ("all-time high", 1.0),
    ("record high", 1.0),
    ("short squeeze", 0.6),
    ("missed expectations", -1.2),
    ("guidance cut", -1.2),
    ("cut guidance", -1.2),
    ("rug pull", -1.2),
];

const COMPACT_VOCABULARY: &[(&str, f64)] = &[
    ("good", 0.8), ("great", 1.0), ("excellent", 1.0), ("strong", 0.7), ("solid", 0.6),
    ("gain", 0.7), ("profit", 0.8), ("growth", 0.7), ("beat", 0.9), ("bullish", 1.0),
    ("up", 0.4), ("love", 0.9), ("best", 1.0), ("positive", 0.6), ("win", 0.7),
    ("bad", -1.0), ("terrible", -1.0), ("awful", -1.0), ("weak", -0.7), ("loss", -0.8),
    ("miss", -0.9), ("drop", -0.7), ("bearish", -1.0), ("worst", -1.0), ("down", -0.4),
    ("hate", -0.9), ("negative", -0.6), ("fail", -0.9), ("crash", -1.1),
];
