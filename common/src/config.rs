//! Engine configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SentimentError};
use crate::sentiment::ModelFamily;

/// Options consumed by the scoring and analytics cores.
///
/// Constructed once at startup and validated before any model is built;
/// workers only ever see it behind a shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Primary opinions at or above this confidence are accepted without escalation
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Half-life of the recency weight used by temporal aggregation (hours)
    #[serde(default = "default_decay_half_life_hours")]
    pub decay_half_life_hours: f64,

    /// Floor for the recency weight so old verdicts never vanish entirely
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,

    /// Base vote weight per model family
    #[serde(default = "default_ensemble_weights")]
    pub ensemble_weights: BTreeMap<ModelFamily, f64>,

    /// Invoke the secondary voter on escalation
    #[serde(default = "default_enable_secondary_voter")]
    pub enable_secondary_voter: bool,

    /// Multiplier on the family the router picked for the text's source
    #[serde(default = "default_routed_family_boost")]
    pub routed_family_boost: f64,

    /// Distance below the accept threshold that disagreeing votes are capped at
    #[serde(default = "default_disagreement_margin")]
    pub disagreement_margin: f64,

    /// Tokens after a negation cue that fall under its scope
    #[serde(default = "default_negation_window")]
    pub negation_window: usize,

    /// Lexical multiplier for a negated word (flip with damping)
    #[serde(default = "default_negation_scalar")]
    pub negation_scalar: f64,

    /// Share of negated probability mass sent to neutral instead of the opposite pole
    #[serde(default = "default_negation_damping")]
    pub negation_damping: f64,

    /// Confidence removed when a sarcasm inversion is applied
    #[serde(default = "default_sarcasm_penalty")]
    pub sarcasm_penalty: f64,

    /// Upper bound on a single contextual inference call (milliseconds)
    #[serde(default = "default_inference_timeout_ms")]
    pub inference_timeout_ms: u64,

    /// Contextual models truncate their input to this many tokens
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    /// Scoring tasks allowed in flight at once
    #[serde(default = "default_max_concurrent_scoring")]
    pub max_concurrent_scoring: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            decay_half_life_hours: default_decay_half_life_hours(),
            min_weight: default_min_weight(),
            ensemble_weights: default_ensemble_weights(),
            enable_secondary_voter: default_enable_secondary_voter(),
            routed_family_boost: default_routed_family_boost(),
            disagreement_margin: default_disagreement_margin(),
            negation_window: default_negation_window(),
            negation_scalar: default_negation_scalar(),
            negation_damping: default_negation_damping(),
            sarcasm_penalty: default_sarcasm_penalty(),
            inference_timeout_ms: default_inference_timeout_ms(),
            max_input_tokens: default_max_input_tokens(),
            max_concurrent_scoring: default_max_concurrent_scoring(),
        }
    }
}

impl EngineConfig {
    /// Fail fast on values that would make scoring or aggregation meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            return Err(SentimentError::configuration(format!(
                "confidence_threshold must be in (0, 1], got {}",
                self.confidence_threshold
            )));
        }

        if !(self.decay_half_life_hours.is_finite() && self.decay_half_life_hours > 0.0) {
            return Err(SentimentError::configuration(format!(
                "decay_half_life_hours must be positive, got {}",
                self.decay_half_life_hours
            )));
        }

        if !(0.0..1.0).contains(&self.min_weight) {
            return Err(SentimentError::configuration(format!(
                "min_weight must be in [0, 1), got {}",
                self.min_weight
            )));
        }

        for family in self.required_families() {
            match self.ensemble_weights.get(&family) {
                None => {
                    return Err(SentimentError::configuration(format!(
                        "ensemble_weights is missing required family '{}'",
                        family
                    )))
                }
                Some(w) if !w.is_finite() || *w < 0.0 => {
                    return Err(SentimentError::configuration(format!(
                        "ensemble weight for '{}' must be finite and non-negative, got {}",
                        family, w
                    )))
                }
                Some(_) => {}
            }
        }

        if !(self.routed_family_boost.is_finite() && self.routed_family_boost > 0.0) {
            return Err(SentimentError::configuration(format!(
                "routed_family_boost must be positive, got {}",
                self.routed_family_boost
            )));
        }

        if !(0.0..self.confidence_threshold).contains(&self.disagreement_margin) {
            return Err(SentimentError::configuration(format!(
                "disagreement_margin must be in [0, confidence_threshold), got {}",
                self.disagreement_margin
            )));
        }

        if self.negation_window == 0 {
            return Err(SentimentError::configuration("negation_window must be at least 1"));
        }

        if !(self.negation_scalar < 0.0 && self.negation_scalar >= -1.0) {
            return Err(SentimentError::configuration(format!(
                "negation_scalar must be in [-1, 0), got {}",
                self.negation_scalar
            )));
        }

        for (name, value) in [
            ("negation_damping", self.negation_damping),
            ("sarcasm_penalty", self.sarcasm_penalty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SentimentError::configuration(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.inference_timeout_ms == 0 || self.max_input_tokens == 0 {
            return Err(SentimentError::configuration(
                "inference_timeout_ms and max_input_tokens must be non-zero",
            ));
        }

        if self.max_concurrent_scoring == 0 {
            return Err(SentimentError::configuration("max_concurrent_scoring must be at least 1"));
        }

        Ok(())
    }

    /// Families that must carry a vote weight
    pub fn required_families(&self) -> Vec<ModelFamily> {
        let mut families = vec![ModelFamily::Lexical, ModelFamily::Transformer];
        if self.enable_secondary_voter {
            families.push(ModelFamily::SecondaryVoter);
        }
        families
    }

    pub fn family_weight(&self, family: ModelFamily) -> f64 {
        self.ensemble_weights.get(&family).copied().unwrap_or(0.0)
    }

    /// Confidence ceiling applied when contributing opinions disagree
    pub fn disagreement_cap(&self) -> f64 {
        self.confidence_threshold - self.disagreement_margin
    }
}

fn default_confidence_threshold() -> f64 {
    0.85
}

fn default_decay_half_life_hours() -> f64 {
    24.0
}

fn default_min_weight() -> f64 {
    0.05
}

fn default_ensemble_weights() -> BTreeMap<ModelFamily, f64> {
    let mut weights = BTreeMap::new();
    weights.insert(ModelFamily::Lexical, 1.0);
    weights.insert(ModelFamily::Transformer, 1.2);
    weights.insert(ModelFamily::SecondaryVoter, 0.8);
    weights
}

fn default_enable_secondary_voter() -> bool {
    true
}

fn default_routed_family_boost() -> f64 {
    1.5
}

fn default_disagreement_margin() -> f64 {
    0.05
}

fn default_negation_window() -> usize {
    3
}

fn default_negation_scalar() -> f64 {
    -0.74
}

fn default_negation_damping() -> f64 {
    0.5
}

fn default_sarcasm_penalty() -> f64 {
    0.3
}

fn default_inference_timeout_ms() -> u64 {
    2_000
}

fn default_max_input_tokens() -> usize {
    512
}

fn default_max_concurrent_scoring() -> usize {
    32
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: &str) -> anyhow::Result<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &EngineConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Write a commented configuration template
pub fn create_config_template(path: &str) -> anyhow::Result<()> {
    let template = "# Sentiment engine configuration
# Every key is optional; omitted keys take the defaults shown here.

# Primary opinions at or above this confidence skip escalation
confidence_threshold = 0.85

# Temporal aggregation: recency half-life (hours) and weight floor
decay_half_life_hours = 24.0
min_weight = 0.05

# Call the secondary voter when a primary opinion is escalated
enable_secondary_voter = true

# Extra weight for the family routed to the text's source
routed_family_boost = 1.5

# Disagreeing votes are capped at confidence_threshold - disagreement_margin
disagreement_margin = 0.05

# Negation handling
negation_window = 3
negation_scalar = -0.74
negation_damping = 0.5

# Confidence removed when sarcasm flips a label
sarcasm_penalty = 0.3

# Contextual model limits
inference_timeout_ms = 2000
max_input_tokens = 512

# Worker pool
max_concurrent_scoring = 32

[ensemble_weights]
lexical = 1.0
transformer = 1.2
secondary_voter = 0.8
";

    std::fs::write(path, template)?;
    Ok(())
}
