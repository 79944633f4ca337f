//! Lexical sentiment model (VADER family)
//!
//! Rule-based scoring tuned for short informal text: slang phrases, emoji,
//! emphasis, contrastive "but" and clause-scoped negation.

use async_trait::async_trait;
use common::{Adjustment, EngineConfig, ModelFamily, ModelOpinion, SentimentLabel};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::adjustments::{strip_marker, NegationStage, SarcasmStage};
use crate::lexicon::Lexicon;
use crate::model::SentimentModel;
use crate::normalizer::{normalize, tokenize, word_count, Token};

/// Normalization constant of the compound score
const COMPOUND_ALPHA: f64 = 15.0;
const EXCLAMATION_BOOST: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const CAPS_BOOST: f64 = 0.733;
const BEFORE_BUT: f64 = 0.5;
const AFTER_BUT: f64 = 1.5;
/// Fewer meaningful tokens than this and the model abstains
const MIN_TOKENS: usize = 3;

pub struct LexicalSentimentModel {
    name: String,
    lexicon: Arc<Lexicon>,
    negation: NegationStage,
    sarcasm: SarcasmStage,
    negation_scalar: f64,
}

impl LexicalSentimentModel {
    pub fn new(config: &EngineConfig, lexicon: Arc<Lexicon>) -> Self {
        Self {
            name: "vader-financial".to_string(),
            negation: NegationStage::from_config(config, lexicon.clone()),
            sarcasm: SarcasmStage::from_config(config, lexicon.clone()),
            negation_scalar: config.negation_scalar,
            lexicon,
        }
    }

    /// Score text synchronously; the async trait method delegates here
    pub fn analyze(&self, raw: &str) -> ModelOpinion {
        let start = Instant::now();

        let normalized = normalize(raw);
        let (text, had_marker) = strip_marker(&normalized);
        let tokens = tokenize(&text);
        let emoji = self.lexicon.emoji_hits(&text);

        if word_count(&tokens) + emoji.len() < MIN_TOKENS {
            debug!(model = %self.name, "Too few tokens to score, abstaining");
            return ModelOpinion::abstain(ModelFamily::Lexical, &self.name);
        }

        let mut adjustments = Vec::new();
        let valences = self.token_valences(&tokens, &mut adjustments);

        let mut sum: f64 = valences.iter().sum();
        sum += emoji.iter().map(|(_, v)| v).sum::<f64>();

        let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
        let emphasis = exclamations * EXCLAMATION_BOOST;
        if sum > 0.0 {
            sum += emphasis;
        } else if sum < 0.0 {
            sum -= emphasis;
        }

        let compound = (sum / (sum * sum + COMPOUND_ALPHA).sqrt()).clamp(-1.0, 1.0);

        let trigger = self.sarcasm.detect(&text, &tokens, had_marker);
        let (compound, sarcasm) = self.sarcasm.apply_compound(compound, trigger);

        let mut confidence = (compound.abs() * 1.5).min(1.0);
        if let Some(adjustment) = sarcasm {
            confidence = (confidence - self.sarcasm.penalty()).max(0.0);
            adjustments.push(adjustment);
        }

        let mut raw_scores = self.proportions(&valences, &emoji, tokens.len());
        raw_scores.insert("compound".to_string(), compound);

        ModelOpinion {
            label: SentimentLabel::from_score(compound),
            score: compound,
            confidence,
            raw_scores,
            model_name: self.name.clone(),
            family: ModelFamily::Lexical,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            adjustments,
            error: None,
        }
    }

    /// Per-token valences after phrases, boosters, caps, negation and "but"
    fn token_valences(&self, tokens: &[Token], adjustments: &mut Vec<Adjustment>) -> Vec<f64> {
        let scan = self.negation.scan(tokens);
        let but_at = tokens.iter().position(|t| t.word == "but");
        let mixed_case = tokens.iter().any(|t| t.is_shouting())
            && tokens.iter().any(|t| t.is_word() && !t.is_shouting());

        let mut valences = Vec::new();
        let mut negated_mass = 0.0;
        let mut i = 0;

        while i < tokens.len() {
            let (base, span) = match self.match_phrase(tokens, i) {
                Some(hit) => hit,
                None => match self.lexicon.valence(&tokens[i].word) {
                    Some(v) => (v, 1),
                    None => {
                        i += 1;
                        continue;
                    }
                },
            };

            let mut valence = base * self.booster_before(tokens, i);

            if mixed_case && tokens[i..i + span].iter().any(|t| t.is_shouting()) {
                valence += CAPS_BOOST * valence.signum();
            }

            if scan.negated[i] {
                negated_mass += valence.abs();
                valence *= self.negation_scalar;
            }

            match but_at {
                Some(b) if i < b => valence *= BEFORE_BUT,
                Some(b) if i > b => valence *= AFTER_BUT,
                _ => {}
            }

            valences.push(valence);
            i += span;
        }

        if negated_mass > 0.0 {
            adjustments.push(Adjustment::Negation {
                cues: scan.cues.len(),
                moved_mass: negated_mass,
            });
        }

        valences
    }

    /// Longest slang phrase starting at token i
    fn match_phrase(&self, tokens: &[Token], i: usize) -> Option<(f64, usize)> {
        let longest = self.lexicon.max_phrase_len().min(tokens.len() - i);
        (2..=longest).rev().find_map(|n| {
            let phrase = tokens[i..i + n]
                .iter()
                .map(|t| t.word.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            self.lexicon.phrase(&phrase).map(|v| (v, n))
        })
    }

    /// Multiplier from a degree modifier directly before token i
    fn booster_before(&self, tokens: &[Token], i: usize) -> f64 {
        if i >= 2 {
            let pair = format!("{} {}", tokens[i - 2].word, tokens[i - 1].word);
            if let Some(factor) = self.lexicon.booster(&pair) {
                return factor;
            }
        }
        if i >= 1 {
            if let Some(factor) = self.lexicon.booster(&tokens[i - 1].word) {
                return factor;
            }
        }
        1.0
    }

    /// pos/neg/neu proportions over the scored text
    fn proportions(&self, valences: &[f64], emoji: &[(char, f64)], token_count: usize) -> BTreeMap<String, f64> {
        let values = valences.iter().chain(emoji.iter().map(|(_, v)| v));
        let (mut pos, mut neg) = (0.0, 0.0);
        for v in values {
            if *v > 0.0 {
                pos += v;
            } else {
                neg -= v;
            }
        }
        let neu = token_count.saturating_sub(valences.len()) as f64;
        let total = pos + neg + neu;

        let mut scores = BTreeMap::new();
        for (key, value) in [("pos", pos), ("neg", neg), ("neu", neu)] {
            let share = if total > 0.0 { value / total } else { 0.0 };
            scores.insert(key.to_string(), share);
        }
        scores
    }
}

#[async_trait]
impl SentimentModel for LexicalSentimentModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> ModelFamily {
        ModelFamily::Lexical
    }

    async fn score(&self, text: &str) -> ModelOpinion {
        self.analyze(text)
    }
}
