//! Contextual sentiment models (transformer family and secondary voter)
//!
//! Both run the same pipeline around a `ClassifierBackend`: truncate,
//! classify under a timeout, then apply the negation and sarcasm stages
//! to the raw class probabilities.

use async_trait::async_trait;
use common::{Adjustment, EngineConfig, ModelFamily, ModelOpinion};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::adjustments::{strip_marker, NegationStage, SarcasmStage};
use crate::backend::{ClassProbabilities, ClassifierBackend, KeywordClassifier};
use crate::lexicon::Lexicon;
use crate::model::SentimentModel;
use crate::normalizer::{normalize, tokenize, Token};

/// Text ready for the backend
struct PreparedText {
    text: String,
    tokens: Vec<Token>,
    had_marker: bool,
    truncation: Option<Adjustment>,
}

pub struct ContextualModel {
    name: String,
    family: ModelFamily,
    backend: Arc<dyn ClassifierBackend>,
    negation: NegationStage,
    sarcasm: SarcasmStage,
    timeout: Duration,
    max_input_tokens: usize,
}

impl ContextualModel {
    pub fn new(
        family: ModelFamily,
        backend: Arc<dyn ClassifierBackend>,
        config: &EngineConfig,
        lexicon: Arc<Lexicon>,
    ) -> Self {
        Self {
            name: backend.name().to_string(),
            family,
            backend,
            negation: NegationStage::from_config(config, lexicon.clone()),
            sarcasm: SarcasmStage::from_config(config, lexicon),
            timeout: Duration::from_millis(config.inference_timeout_ms),
            max_input_tokens: config.max_input_tokens,
        }
    }

    /// Transformer-family model backed by the financial classifier
    pub fn transformer(config: &EngineConfig, lexicon: Arc<Lexicon>) -> Self {
        Self::new(
            ModelFamily::Transformer,
            Arc::new(KeywordClassifier::financial()),
            config,
            lexicon,
        )
    }

    /// Lighter secondary voter backed by the compact classifier
    pub fn secondary_voter(config: &EngineConfig, lexicon: Arc<Lexicon>) -> Self {
        Self::new(
            ModelFamily::SecondaryVoter,
            Arc::new(KeywordClassifier::compact()),
            config,
            lexicon,
        )
    }

    /// Normalize, strip the sarcasm marker and truncate. None when nothing
    /// readable is left.
    fn prepare(&self, raw: &str) -> Option<PreparedText> {
        let normalized = normalize(raw);
        let (text, had_marker) = strip_marker(&normalized);

        let pieces: Vec<&str> = text.split_whitespace().collect();
        if pieces.is_empty() {
            return None;
        }

        let (text, truncation) = if pieces.len() > self.max_input_tokens {
            debug!(
                model = %self.name,
                from = pieces.len(),
                to = self.max_input_tokens,
                "Truncating input"
            );
            (
                pieces[..self.max_input_tokens].join(" "),
                Some(Adjustment::Truncated {
                    from_tokens: pieces.len(),
                    to_tokens: self.max_input_tokens,
                }),
            )
        } else {
            (text, None)
        };

        let tokens = tokenize(&text);
        if tokens.is_empty() {
            return None;
        }
        if !self.backend.has_evidence(&text) {
            debug!(model = %self.name, "No evidence in input, abstaining");
            return None;
        }

        Some(PreparedText {
            text,
            tokens,
            had_marker,
            truncation,
        })
    }

    /// Apply the adjustment stages to raw backend output
    fn finish(&self, prepared: &PreparedText, probs: ClassProbabilities, start: Instant) -> ModelOpinion {
        let Some(probs) = probs.normalized() else {
            return self.degraded("backend returned invalid probabilities", start);
        };

        let mut adjustments: Vec<Adjustment> = prepared.truncation.iter().cloned().collect();

        let (probs, negation) = self.negation.apply(probs, &prepared.tokens);
        adjustments.extend(negation);

        let trigger = self
            .sarcasm
            .detect(&prepared.text, &prepared.tokens, prepared.had_marker);
        let (probs, sarcasm) = self.sarcasm.apply_probabilities(probs, trigger);

        let mut confidence = probs.confidence();
        if let Some(adjustment) = sarcasm {
            confidence = (confidence - self.sarcasm.penalty()).max(0.0);
            adjustments.push(adjustment);
        }

        ModelOpinion {
            label: probs.argmax(),
            score: probs.score(),
            confidence,
            raw_scores: probs.as_map(),
            model_name: self.name.clone(),
            family: self.family,
            processing_time_ms: elapsed_ms(start),
            adjustments,
            error: None,
        }
    }

    fn degraded(&self, reason: &str, start: Instant) -> ModelOpinion {
        warn!(model = %self.name, reason, "Contextual model degraded");
        ModelOpinion {
            processing_time_ms: elapsed_ms(start),
            ..ModelOpinion::degraded(self.family, &self.name, reason)
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[async_trait]
impl SentimentModel for ContextualModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> ModelFamily {
        self.family
    }

    async fn score(&self, text: &str) -> ModelOpinion {
        let start = Instant::now();

        let Some(prepared) = self.prepare(text) else {
            return ModelOpinion::abstain(self.family, &self.name);
        };

        match timeout(self.timeout, self.backend.classify(&prepared.text)).await {
            Ok(Ok(probs)) => self.finish(&prepared, probs, start),
            Ok(Err(e)) => self.degraded(&e.to_string(), start),
            Err(_) => self.degraded(
                &format!("inference timed out after {}ms", self.timeout.as_millis()),
                start,
            ),
        }
    }

    /// One backend call for every non-empty text; falls back to individual
    /// scoring when the batch call fails.
    async fn score_batch(&self, texts: &[String]) -> Vec<ModelOpinion> {
        let start = Instant::now();
        let prepared: Vec<Option<PreparedText>> = texts.iter().map(|t| self.prepare(t)).collect();
        let inputs: Vec<String> = prepared
            .iter()
            .flatten()
            .map(|p| p.text.clone())
            .collect();

        let batch = match timeout(self.timeout, self.backend.classify_batch(&inputs)).await {
            Ok(Ok(probs)) if probs.len() == inputs.len() => probs,
            outcome => {
                let reason = match outcome {
                    Ok(Ok(_)) => "batch size mismatch".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => "batch timed out".to_string(),
                };
                warn!(model = %self.name, reason = %reason, "Batch scoring failed, scoring individually");
                let mut opinions = Vec::with_capacity(texts.len());
                for text in texts {
                    opinions.push(self.score(text).await);
                }
                return opinions;
            }
        };

        let mut probs = batch.into_iter();
        prepared
            .iter()
            .map(|p| match p.as_ref().zip(p.as_ref().and_then(|_| probs.next())) {
                Some((p, probs)) => self.finish(p, probs, start),
                None => ModelOpinion::abstain(self.family, &self.name),
            })
            .collect()
    }
}
