//! Ensemble combiner
//!
//! Drives one text through Route -> PrimaryScore -> (Accept | Escalate ->
//! SecondaryScore -> Vote) -> Final. Every visited state is recorded in the
//! verdict diagnostics.

use common::{
    EngineConfig, EnsembleState, ModelFamily, ModelOpinion, SentimentLabel, SentimentVerdict, TextInput,
    VerdictDiagnostics,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::ModelRegistry;
use crate::router::{ModelRouter, Route};

/// Confidences closer than this count as tied
const TIE_EPSILON: f64 = 1e-9;

/// Combined output before it is wrapped into a verdict
struct Outcome {
    label: SentimentLabel,
    score: f64,
    confidence: f64,
    model_used: String,
}

impl Outcome {
    fn single(opinion: &ModelOpinion) -> Self {
        Self {
            label: opinion.label,
            score: opinion.score,
            confidence: opinion.confidence,
            model_used: opinion.model_name.clone(),
        }
    }
}

/// State machine steps, carrying what each state needs
enum Step {
    Route,
    PrimaryScore(Route),
    Accept(ModelOpinion),
    Escalate(Route, ModelOpinion),
    SecondaryScore(Route, ModelOpinion),
    Vote(Route, ModelOpinion, Vec<ModelOpinion>),
    Final(Outcome),
}

impl Step {
    fn state(&self) -> EnsembleState {
        match self {
            Step::Route => EnsembleState::Route,
            Step::PrimaryScore(..) => EnsembleState::PrimaryScore,
            Step::Accept(..) => EnsembleState::Accept,
            Step::Escalate(..) => EnsembleState::Escalate,
            Step::SecondaryScore(..) => EnsembleState::SecondaryScore,
            Step::Vote(..) => EnsembleState::Vote,
            Step::Final(..) => EnsembleState::Final,
        }
    }
}

pub struct EnsembleCombiner {
    config: Arc<EngineConfig>,
    registry: Arc<ModelRegistry>,
    router: ModelRouter,
}

impl EnsembleCombiner {
    pub fn new(config: Arc<EngineConfig>, registry: Arc<ModelRegistry>) -> Self {
        let router = ModelRouter::new(config.enable_secondary_voter && registry.has_secondary());
        Self {
            config,
            registry,
            router,
        }
    }

    /// Produce exactly one verdict for the input. Never fails.
    pub async fn combine(&self, input: &TextInput) -> SentimentVerdict {
        let mut diagnostics = VerdictDiagnostics {
            source: Some(input.source),
            ..Default::default()
        };
        let mut step = Step::Route;

        loop {
            diagnostics.states.push(step.state());

            step = match step {
                Step::Route => {
                    let route = self.router.route(input.source);
                    debug!(source = %input.source, primary = %route.primary, "Routed input");
                    diagnostics.primary = Some(route.primary);
                    Step::PrimaryScore(route)
                }

                Step::PrimaryScore(route) => {
                    let opinion = self.invoke(route.primary, &input.text).await;
                    record(&mut diagnostics, &opinion);

                    if !opinion.is_degraded() && opinion.confidence >= self.config.confidence_threshold {
                        Step::Accept(opinion)
                    } else {
                        Step::Escalate(route, opinion)
                    }
                }

                Step::Accept(opinion) => {
                    diagnostics.weights.insert(opinion.model_name.clone(), 1.0);
                    Step::Final(Outcome::single(&opinion))
                }

                Step::Escalate(route, primary) => {
                    debug!(
                        model = %primary.model_name,
                        confidence = primary.confidence,
                        "Primary opinion below threshold, escalating to {:?}",
                        route.escalation
                    );
                    diagnostics.escalated = true;
                    Step::SecondaryScore(route, primary)
                }

                Step::SecondaryScore(route, primary) => {
                    let opinions = join_all(
                        route
                            .escalation
                            .iter()
                            .map(|family| self.invoke(*family, &input.text)),
                    )
                    .await;

                    for opinion in &opinions {
                        record(&mut diagnostics, opinion);
                    }

                    let usable: Vec<ModelOpinion> = opinions.into_iter().filter(|o| !o.is_degraded()).collect();
                    if usable.is_empty() {
                        warn!("No usable escalation opinion, keeping primary opinion");
                        diagnostics.fallback = true;
                        diagnostics.weights.insert(primary.model_name.clone(), 1.0);
                        Step::Final(Outcome::single(&primary))
                    } else {
                        Step::Vote(route, primary, usable)
                    }
                }

                Step::Vote(route, primary, escalated) => {
                    let mut contributors = Vec::with_capacity(escalated.len() + 1);
                    if !primary.is_degraded() {
                        contributors.push(primary);
                    }
                    contributors.extend(escalated);
                    Step::Final(self.vote(route.primary, &contributors, &mut diagnostics))
                }

                Step::Final(outcome) => {
                    return SentimentVerdict {
                        label: outcome.label,
                        score: outcome.score.clamp(-1.0, 1.0),
                        confidence: outcome.confidence.clamp(0.0, 1.0),
                        model_used: outcome.model_used,
                        diagnostics,
                    };
                }
            };
        }
    }

    async fn invoke(&self, family: ModelFamily, text: &str) -> ModelOpinion {
        match self.registry.get(family) {
            Some(model) => model.score(text).await,
            None => ModelOpinion::degraded(family, family.as_str(), "model not registered"),
        }
    }

    /// Confidence-weighted vote over the contributing opinions
    fn vote(
        &self,
        routed: ModelFamily,
        contributors: &[ModelOpinion],
        diagnostics: &mut VerdictDiagnostics,
    ) -> Outcome {
        let weights = self.vote_weights(routed, contributors);
        let total: f64 = weights.iter().sum();

        for (opinion, weight) in contributors.iter().zip(&weights) {
            diagnostics
                .weights
                .insert(opinion.model_name.clone(), weight / total);
        }

        let mut score = (contributors
            .iter()
            .zip(&weights)
            .map(|(o, w)| o.score * w)
            .sum::<f64>()
            / total)
            .clamp(-1.0, 1.0);

        let mut confidence = contributors
            .iter()
            .zip(&weights)
            .map(|(o, w)| o.confidence * w)
            .sum::<f64>()
            / total;

        // Abstaining models do not get a say in agreement
        let mut voters: Vec<&ModelOpinion> = contributors.iter().filter(|o| o.confidence > 0.0).collect();
        if voters.is_empty() {
            voters = contributors.iter().collect();
        }

        let shared = voters
            .first()
            .map(|o| o.label)
            .filter(|label| voters.iter().all(|o| o.label == *label));

        let label = match shared {
            Some(label) if label.admits(score) => label,
            Some(_) => SentimentLabel::from_score(score),
            None => {
                diagnostics.disagreement = true;
                confidence = confidence.min(self.config.disagreement_cap());

                match tie_break(&voters) {
                    Some(winner) => {
                        debug!(model = %winner.model_name, "Tie-break on equal confidence");
                        diagnostics.tie_break = true;
                        if !winner.label.admits(score) {
                            score = winner.score;
                        }
                        winner.label
                    }
                    None => SentimentLabel::from_score(score),
                }
            }
        };

        let names: Vec<&str> = contributors.iter().map(|o| o.model_name.as_str()).collect();
        Outcome {
            label,
            score,
            confidence,
            model_used: format!("ensemble:{}", names.join("+")),
        }
    }

    /// family weight x routed boost x confidence, with fallbacks when that is all zero
    fn vote_weights(&self, routed: ModelFamily, contributors: &[ModelOpinion]) -> Vec<f64> {
        let base: Vec<f64> = contributors
            .iter()
            .map(|o| {
                let boost = if o.family == routed {
                    self.config.routed_family_boost
                } else {
                    1.0
                };
                self.config.family_weight(o.family) * boost
            })
            .collect();

        let weighted: Vec<f64> = base
            .iter()
            .zip(contributors)
            .map(|(w, o)| w * o.confidence)
            .collect();

        if weighted.iter().sum::<f64>() > f64::EPSILON {
            weighted
        } else if base.iter().sum::<f64>() > f64::EPSILON {
            base
        } else {
            vec![1.0; contributors.len()]
        }
    }
}

/// Among equally confident voters with conflicting labels, the family with
/// the lowest tie-break rank wins
fn tie_break<'a>(voters: &[&'a ModelOpinion]) -> Option<&'a ModelOpinion> {
    let top = voters.iter().map(|o| o.confidence).fold(f64::MIN, f64::max);
    let tied: Vec<&ModelOpinion> = voters
        .iter()
        .copied()
        .filter(|o| (top - o.confidence).abs() <= TIE_EPSILON)
        .collect();

    let conflicting = tied.iter().any(|o| o.label != tied[0].label);
    if tied.len() < 2 || !conflicting {
        return None;
    }

    tied.into_iter().min_by_key(|o| o.family.tie_break_rank())
}

fn record(diagnostics: &mut VerdictDiagnostics, opinion: &ModelOpinion) {
    if let Some(error) = &opinion.error {
        diagnostics.errors.push(format!("{}: {}", opinion.model_name, error));
    }
    diagnostics.opinions.push(opinion.record());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SentimentModel;
    use async_trait::async_trait;
    use common::SourceKind;
    use std::collections::BTreeMap;

    struct StubModel {
        opinion: ModelOpinion,
    }

    #[async_trait]
    impl SentimentModel for StubModel {
        fn name(&self) -> &str {
            &self.opinion.model_name
        }

        fn family(&self) -> ModelFamily {
            self.opinion.family
        }

        async fn score(&self, _text: &str) -> ModelOpinion {
            self.opinion.clone()
        }
    }

    fn opinion(family: ModelFamily, label: SentimentLabel, score: f64, confidence: f64) -> ModelOpinion {
        ModelOpinion {
            label,
            score,
            confidence,
            raw_scores: BTreeMap::new(),
            model_name: family.as_str().to_string(),
            family,
            processing_time_ms: 0.0,
            adjustments: Vec::new(),
            error: None,
        }
    }

    fn stub(opinion: ModelOpinion) -> Arc<dyn SentimentModel> {
        Arc::new(StubModel { opinion })
    }

    fn combiner(
        config: EngineConfig,
        lexical: ModelOpinion,
        transformer: ModelOpinion,
        secondary: Option<ModelOpinion>,
    ) -> EnsembleCombiner {
        let registry = ModelRegistry::new(stub(lexical), stub(transformer), secondary.map(stub));
        EnsembleCombiner::new(Arc::new(config), Arc::new(registry))
    }

    fn social(text: &str) -> TextInput {
        TextInput::new(text, SourceKind::Social, chrono::Utc::now())
    }

    #[tokio::test]
    async fn test_accepts_confident_primary() {
        let combiner = combiner(
            EngineConfig::default(),
            opinion(ModelFamily::Lexical, SentimentLabel::Positive, 0.9, 0.95),
            opinion(ModelFamily::Transformer, SentimentLabel::Negative, -0.9, 0.95),
            None,
        );
        let verdict = combiner.combine(&social("to the moon")).await;

        assert_eq!(verdict.label, SentimentLabel::Positive);
        assert_eq!(verdict.model_used, "lexical");
        assert_eq!(
            verdict.diagnostics.states,
            vec![
                EnsembleState::Route,
                EnsembleState::PrimaryScore,
                EnsembleState::Accept,
                EnsembleState::Final
            ]
        );
        assert!(!verdict.diagnostics.escalated);
    }

    #[tokio::test]
    async fn test_escalation_agreement() {
        let combiner = combiner(
            EngineConfig::default(),
            opinion(ModelFamily::Lexical, SentimentLabel::Negative, -0.4, 0.6),
            opinion(ModelFamily::Transformer, SentimentLabel::Negative, -0.5, 0.7),
            Some(opinion(ModelFamily::SecondaryVoter, SentimentLabel::Negative, -0.3, 0.5)),
        );
        let verdict = combiner.combine(&social("meh")).await;

        assert_eq!(verdict.label, SentimentLabel::Negative);
        assert!(verdict.score < 0.0);
        assert!(!verdict.diagnostics.disagreement);
        assert_eq!(verdict.model_used, "ensemble:lexical+transformer+secondary_voter");
        assert_eq!(
            verdict.diagnostics.states,
            vec![
                EnsembleState::Route,
                EnsembleState::PrimaryScore,
                EnsembleState::Escalate,
                EnsembleState::SecondaryScore,
                EnsembleState::Vote,
                EnsembleState::Final
            ]
        );
        let weight_sum: f64 = verdict.diagnostics.weights.values().sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_disagreement_caps_confidence() {
        let config = EngineConfig::default();
        let cap = config.disagreement_cap();
        let combiner = combiner(
            config,
            opinion(ModelFamily::Lexical, SentimentLabel::Positive, 0.9, 0.84),
            opinion(ModelFamily::Transformer, SentimentLabel::Negative, -0.9, 0.99),
            Some(opinion(ModelFamily::SecondaryVoter, SentimentLabel::Negative, -0.8, 0.97)),
        );
        let verdict = combiner.combine(&social("mixed signals")).await;

        assert!(verdict.diagnostics.disagreement);
        assert!(verdict.confidence <= cap + 1e-12);
        assert!(verdict.is_well_formed());
    }

    #[tokio::test]
    async fn test_fallback_when_escalation_degrades() {
        let primary = opinion(ModelFamily::Lexical, SentimentLabel::Positive, 0.3, 0.45);
        let combiner = combiner(
            EngineConfig::default(),
            primary.clone(),
            ModelOpinion::degraded(ModelFamily::Transformer, "transformer", "timed out"),
            Some(ModelOpinion::degraded(ModelFamily::SecondaryVoter, "secondary_voter", "timed out")),
        );
        let verdict = combiner.combine(&social("decent")).await;

        assert!(verdict.diagnostics.fallback);
        assert_eq!(verdict.label, primary.label);
        assert_eq!(verdict.score, primary.score);
        assert_eq!(verdict.confidence, primary.confidence);
        assert_eq!(verdict.diagnostics.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_tie_break_prefers_transformer() {
        let config = EngineConfig {
            enable_secondary_voter: false,
            ..Default::default()
        };
        let combiner = combiner(
            config,
            opinion(ModelFamily::Lexical, SentimentLabel::Negative, -0.5, 0.6),
            opinion(ModelFamily::Transformer, SentimentLabel::Positive, 0.5, 0.6),
            None,
        );
        let verdict = combiner.combine(&social("hmm")).await;

        assert!(verdict.diagnostics.tie_break);
        assert_eq!(verdict.label, SentimentLabel::Positive);
        assert!(verdict.score > 0.0);
        assert!(verdict.is_well_formed());
    }

    #[test]
    fn test_routed_family_outweighs_at_equal_confidence() {
        let lexical = opinion(ModelFamily::Lexical, SentimentLabel::Positive, 0.8, 0.6);
        let transformer = opinion(ModelFamily::Transformer, SentimentLabel::Negative, -0.8, 0.6);
        let combiner = combiner(EngineConfig::default(), lexical.clone(), transformer.clone(), None);
        let contributors = [lexical, transformer];

        // 1.0 x 1.5 against 1.2 on social text
        let social = combiner.vote_weights(ModelFamily::Lexical, &contributors);
        assert!(social[0] > social[1]);

        // 1.2 x 1.5 against 1.0 on formal news
        let formal = combiner.vote_weights(ModelFamily::Transformer, &contributors);
        assert!(formal[1] > formal[0]);
    }

    #[tokio::test]
    async fn test_vote_leans_to_routed_family() {
        let config = EngineConfig {
            enable_secondary_voter: false,
            ..Default::default()
        };

        // routed lexical model is slightly less confident and still wins on social text
        let combiner_social = combiner(
            config.clone(),
            opinion(ModelFamily::Lexical, SentimentLabel::Positive, 0.8, 0.6),
            opinion(ModelFamily::Transformer, SentimentLabel::Negative, -0.8, 0.62),
            None,
        );
        let verdict = combiner_social.combine(&social("hmm")).await;
        assert!(verdict.score > 0.0);
        assert!(verdict.diagnostics.weights["lexical"] > verdict.diagnostics.weights["transformer"]);

        // and the transformer wins on formal news
        let combiner_formal = combiner(
            config,
            opinion(ModelFamily::Lexical, SentimentLabel::Positive, 0.8, 0.62),
            opinion(ModelFamily::Transformer, SentimentLabel::Negative, -0.8, 0.6),
            None,
        );
        let input = TextInput::new("Results mixed", SourceKind::FormalNews, chrono::Utc::now());
        let verdict = combiner_formal.combine(&input).await;
        assert!(verdict.score < 0.0);
        assert!(verdict.diagnostics.weights["transformer"] > verdict.diagnostics.weights["lexical"]);
    }

    #[tokio::test]
    async fn test_zero_confidence_uses_base_weights() {
        let combiner = combiner(
            EngineConfig::default(),
            opinion(ModelFamily::Lexical, SentimentLabel::Neutral, 0.0, 0.0),
            opinion(ModelFamily::Transformer, SentimentLabel::Neutral, 0.0, 0.0),
            Some(opinion(ModelFamily::SecondaryVoter, SentimentLabel::Neutral, 0.0, 0.0)),
        );
        let verdict = combiner.combine(&social("ok")).await;

        assert_eq!(verdict.label, SentimentLabel::Neutral);
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.diagnostics.weights.values().all(|w| w.is_finite() && *w > 0.0));
    }

    #[tokio::test]
    async fn test_degraded_primary_is_excluded_from_vote() {
        let combiner = combiner(
            EngineConfig::default(),
            opinion(ModelFamily::Lexical, SentimentLabel::Positive, 0.9, 0.99),
            ModelOpinion::degraded(ModelFamily::Transformer, "transformer", "backend down"),
            Some(opinion(ModelFamily::SecondaryVoter, SentimentLabel::Positive, 0.4, 0.6)),
        );
        let input = TextInput::new("Revenue up", SourceKind::FormalNews, chrono::Utc::now());
        let verdict = combiner.combine(&input).await;

        assert!(verdict.diagnostics.escalated);
        assert_eq!(verdict.model_used, "ensemble:lexical+secondary_voter");
        assert_eq!(verdict.label, SentimentLabel::Positive);
    }
}
