//! Negation and sarcasm adjustment stages
//!
//! Both stages run outside the model call on the model's raw output, and
//! each one records what it changed as an `Adjustment` on the opinion.

use common::{Adjustment, EngineConfig, SarcasmTrigger, NEUTRAL_BAND};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::backend::ClassProbabilities;
use crate::lexicon::Lexicon;
use crate::normalizer::Token;

lazy_static! {
    static ref SARCASM_MARKER_REGEX: Regex = Regex::new(r"(?i)(?:^|\s)/s\s*$").unwrap();
}

/// Remove a trailing "/s" marker, reporting whether one was present
pub fn strip_marker(text: &str) -> (String, bool) {
    match SARCASM_MARKER_REGEX.find(text) {
        Some(m) => (text[..m.start()].trim_end().to_string(), true),
        None => (text.to_string(), false),
    }
}

/// Negation cues found in a token stream and the polarity mass they cover
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NegationScan {
    pub cues: Vec<String>,
    /// Token positions inside some cue's scope
    pub negated: Vec<bool>,
    pub negated_positive: f64,
    pub negated_negative: f64,
    pub total_positive: f64,
    pub total_negative: f64,
}

impl NegationScan {
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Share of negative polarity mass that sits under a negation
    pub fn negative_fraction(&self) -> f64 {
        if self.total_negative > 0.0 {
            self.negated_negative / self.total_negative
        } else {
            0.0
        }
    }

    /// Share of positive polarity mass that sits under a negation
    pub fn positive_fraction(&self) -> f64 {
        if self.total_positive > 0.0 {
            self.negated_positive / self.total_positive
        } else {
            0.0
        }
    }
}

/// Clause-scoped negation detection and probability correction
#[derive(Debug, Clone)]
pub struct NegationStage {
    window: usize,
    damping: f64,
    lexicon: Arc<Lexicon>,
}

impl NegationStage {
    pub fn new(window: usize, damping: f64, lexicon: Arc<Lexicon>) -> Self {
        Self {
            window,
            damping,
            lexicon,
        }
    }

    pub fn from_config(config: &EngineConfig, lexicon: Arc<Lexicon>) -> Self {
        Self::new(config.negation_window, config.negation_damping, lexicon)
    }

    /// Find negation cues and mark the tokens each one governs.
    ///
    /// A cue covers up to `window` following tokens and never crosses a
    /// clause boundary (closing punctuation or "but").
    pub fn scan(&self, tokens: &[Token]) -> NegationScan {
        let mut scan = NegationScan {
            negated: vec![false; tokens.len()],
            ..Default::default()
        };

        for (i, token) in tokens.iter().enumerate() {
            if !self.lexicon.is_negation(&token.word) {
                continue;
            }
            scan.cues.push(token.word.clone());
            if token.ends_clause {
                continue;
            }

            for k in (i + 1)..tokens.len().min(i + 1 + self.window) {
                if tokens[k].word == "but" {
                    break;
                }
                scan.negated[k] = true;
                if tokens[k].ends_clause {
                    break;
                }
            }
        }

        for (token, negated) in tokens.iter().zip(&scan.negated) {
            let Some(valence) = self.lexicon.valence(&token.word) else {
                continue;
            };
            if valence > 0.0 {
                scan.total_positive += valence;
                if *negated {
                    scan.negated_positive += valence;
                }
            } else if valence < 0.0 {
                scan.total_negative += -valence;
                if *negated {
                    scan.negated_negative += -valence;
                }
            }
        }

        scan
    }

    /// Move negated mass to the opposite pole, sending the damped share to neutral
    pub fn apply(
        &self,
        probs: ClassProbabilities,
        tokens: &[Token],
    ) -> (ClassProbabilities, Option<Adjustment>) {
        let scan = self.scan(tokens);
        if scan.is_empty() {
            return (probs, None);
        }

        let from_negative = probs.negative * scan.negative_fraction();
        let from_positive = probs.positive * scan.positive_fraction();
        let moved = from_negative + from_positive;
        if moved <= 0.0 {
            return (probs, None);
        }

        let flipped = 1.0 - self.damping;
        let adjusted = ClassProbabilities {
            positive: probs.positive - from_positive + from_negative * flipped,
            negative: probs.negative - from_negative + from_positive * flipped,
            neutral: probs.neutral + moved * self.damping,
        };

        let adjustment = Adjustment::Negation {
            cues: scan.cues.len(),
            moved_mass: moved,
        };
        (adjusted, Some(adjustment))
    }
}

/// Heuristic sarcasm detection and label inversion
#[derive(Debug, Clone)]
pub struct SarcasmStage {
    penalty: f64,
    lexicon: Arc<Lexicon>,
}

impl SarcasmStage {
    pub fn new(penalty: f64, lexicon: Arc<Lexicon>) -> Self {
        Self { penalty, lexicon }
    }

    pub fn from_config(config: &EngineConfig, lexicon: Arc<Lexicon>) -> Self {
        Self::new(config.sarcasm_penalty, lexicon)
    }

    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    /// Trigger for text whose marker (if any) was already stripped
    pub fn detect(&self, text: &str, tokens: &[Token], had_marker: bool) -> Option<SarcasmTrigger> {
        if had_marker {
            return Some(SarcasmTrigger::Marker);
        }

        let lowered = text.to_lowercase();
        self.lexicon.enthusiastic_opener(&lowered)?;
        tokens
            .iter()
            .any(|t| self.lexicon.is_negative_context(&t.word))
            .then_some(SarcasmTrigger::Mismatch)
    }

    /// Invert class probabilities. Mismatch only overturns a positive reading.
    pub fn apply_probabilities(
        &self,
        probs: ClassProbabilities,
        trigger: Option<SarcasmTrigger>,
    ) -> (ClassProbabilities, Option<Adjustment>) {
        match trigger {
            Some(SarcasmTrigger::Marker) => (probs.swapped(), Some(self.adjustment(SarcasmTrigger::Marker))),
            Some(SarcasmTrigger::Mismatch) if probs.argmax() == common::SentimentLabel::Positive => {
                (probs.swapped(), Some(self.adjustment(SarcasmTrigger::Mismatch)))
            }
            _ => (probs, None),
        }
    }

    /// Invert a lexical compound score under the same rules
    pub fn apply_compound(&self, compound: f64, trigger: Option<SarcasmTrigger>) -> (f64, Option<Adjustment>) {
        match trigger {
            Some(SarcasmTrigger::Marker) => (-compound, Some(self.adjustment(SarcasmTrigger::Marker))),
            Some(SarcasmTrigger::Mismatch) if compound >= NEUTRAL_BAND => {
                (-compound, Some(self.adjustment(SarcasmTrigger::Mismatch)))
            }
            _ => (compound, None),
        }
    }

    fn adjustment(&self, trigger: SarcasmTrigger) -> Adjustment {
        Adjustment::Sarcasm {
            trigger,
            penalty: self.penalty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::tokenize;
    use common::SentimentLabel;

    fn lexicon() -> Arc<Lexicon> {
        Arc::new(Lexicon::new())
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("Great earnings report /s"), ("Great earnings report".to_string(), true));
        assert_eq!(strip_marker("Great report /S  "), ("Great report".to_string(), true));
        assert_eq!(strip_marker("yes/sure"), ("yes/sure".to_string(), false));
        assert!(!strip_marker("/s is a marker").1);
    }

    #[test]
    fn test_negation_scope_stops_at_clause() {
        let stage = NegationStage::new(3, 0.5, lexicon());
        let tokens = tokenize("The stock isn't terrible, solid quarter");
        let scan = stage.scan(&tokens);

        assert_eq!(scan.cues, vec!["isn't".to_string()]);
        assert!(scan.negated[3]);
        assert!(!scan.negated[4]);
        assert_eq!(scan.negative_fraction(), 1.0);
        assert_eq!(scan.positive_fraction(), 0.0);
    }

    #[test]
    fn test_negation_scope_stops_at_but() {
        let stage = NegationStage::new(3, 0.5, lexicon());
        let scan = stage.scan(&tokenize("not sure but great"));
        assert!(!scan.negated[3]);
        assert_eq!(scan.negated_positive, 0.0);
    }

    #[test]
    fn test_negation_moves_mass_with_damping() {
        let stage = NegationStage::new(3, 0.5, lexicon());
        let probs = ClassProbabilities {
            positive: 0.1,
            negative: 0.7,
            neutral: 0.2,
        };
        let (adjusted, adjustment) = stage.apply(probs, &tokenize("not bad"));

        assert!((adjusted.positive - 0.45).abs() < 1e-9);
        assert!(adjusted.negative.abs() < 1e-9);
        assert!((adjusted.neutral - 0.55).abs() < 1e-9);
        assert_ne!(adjusted.argmax(), SentimentLabel::Negative);
        assert!(matches!(adjustment, Some(Adjustment::Negation { cues: 1, .. })));
    }

    #[test]
    fn test_no_cue_no_adjustment() {
        let stage = NegationStage::new(3, 0.5, lexicon());
        let probs = ClassProbabilities::from_logits(1.0, 0.0, 0.5);
        let (adjusted, adjustment) = stage.apply(probs, &tokenize("solid quarter overall"));
        assert_eq!(adjusted, probs);
        assert!(adjustment.is_none());
    }

    #[test]
    fn test_marker_always_inverts() {
        let stage = SarcasmStage::new(0.3, lexicon());
        let tokens = tokenize("Great earnings report");
        let trigger = stage.detect("Great earnings report", &tokens, true);
        assert_eq!(trigger, Some(SarcasmTrigger::Marker));

        let (compound, adjustment) = stage.apply_compound(0.62, trigger);
        assert_eq!(compound, -0.62);
        assert!(adjustment.is_some());

        // neutral stays neutral but the inversion is still recorded
        let (compound, adjustment) = stage.apply_compound(0.0, trigger);
        assert_eq!(SentimentLabel::from_score(compound), SentimentLabel::Neutral);
        assert!(adjustment.is_some());
    }

    #[test]
    fn test_mismatch_only_overturns_positive() {
        let stage = SarcasmStage::new(0.3, lexicon());
        let text = "Oh great, another miss";
        let trigger = stage.detect(text, &tokenize(text), false);
        assert_eq!(trigger, Some(SarcasmTrigger::Mismatch));

        let positive = ClassProbabilities::from_logits(2.0, 0.5, 0.5);
        let (inverted, adjustment) = stage.apply_probabilities(positive, trigger);
        assert_eq!(inverted.argmax(), SentimentLabel::Negative);
        assert!(adjustment.is_some());

        let negative = ClassProbabilities::from_logits(0.0, 2.0, 0.5);
        let (unchanged, adjustment) = stage.apply_probabilities(negative, trigger);
        assert_eq!(unchanged, negative);
        assert!(adjustment.is_none());
    }

    #[test]
    fn test_plain_enthusiasm_is_not_sarcasm() {
        let stage = SarcasmStage::new(0.3, lexicon());
        let text = "Oh great, record revenue";
        assert_eq!(stage.detect(text, &tokenize(text), false), None);
    }

    #[test]
    fn test_mild_risk_words_do_not_trigger_mismatch() {
        let stage = SarcasmStage::new(0.3, lexicon());
        let text = "So glad the risk paid off, great gains";
        assert_eq!(stage.detect(text, &tokenize(text), false), None);

        // opener in the middle of a clause is not an opener
        let text = "Everyone is so glad the stock tanked";
        assert_eq!(stage.detect(text, &tokenize(text), false), None);
    }
}
