use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Batch runner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub run: RunSettings,
    pub encoder: EncoderSettings,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunSettings {
    /// JSON array of applicant rows exported by the event application
    pub snapshot_path: PathBuf,
    /// Where the round report is written
    pub report_path: PathBuf,
    #[serde(default)]
    pub reshuffle: bool,
    pub seed: Option<u64>,
    /// Score matrix workers; defaults to available parallelism
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderSettings {
    #[serde(default)]
    pub kind: EncoderKind,
    /// Base URL of a text-embeddings-inference compatible server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Vector size of the offline hashing encoder
    #[serde(default = "default_hashing_dimension")]
    pub hashing_dimension: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    #[default]
    Http,
    /// Token hashing, for dry runs without an embedding server
    Hashing,
}

fn default_endpoint() -> String { "http://localhost:8080".to_string() }
fn default_batch_size() -> usize { 64 }
fn default_timeout_secs() -> u64 { 60 }
fn default_hashing_dimension() -> usize { 256 }

/// Every tunable constant of the scoring model
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub preference: PreferenceConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub composition: CompositionPolicy,
}

/// Constants for the rule-based preference score
#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceConfig {
    /// Starting value before any term is added
    #[serde(default = "default_preference_base")]
    pub base_score: f64,
    /// Returned unconditionally when the candidate is the named partner
    #[serde(default = "default_preferred_partner_score")]
    pub preferred_partner_score: f64,

    #[serde(default = "default_timezone_base_penalty")]
    pub timezone_base_penalty: f64,
    /// Inclusive; at or above this many hours the penalty escalates
    #[serde(default = "default_timezone_escalation_threshold")]
    pub timezone_escalation_threshold: f64,
    #[serde(default = "default_timezone_escalation_multiplier")]
    pub timezone_escalation_multiplier: f64,

    #[serde(default = "default_grade_base_penalty")]
    pub grade_base_penalty: f64,
    /// Inclusive; at or above this ordinal distance the penalty escalates
    #[serde(default = "default_grade_escalation_threshold")]
    pub grade_escalation_threshold: f64,
    #[serde(default = "default_grade_escalation_multiplier")]
    pub grade_escalation_multiplier: f64,

    #[serde(default = "default_same_location_reward")]
    pub same_location_reward: f64,
    #[serde(default = "default_same_location_group_reward")]
    pub same_location_group_reward: f64,
    /// Applied per unit of region group distance
    #[serde(default = "default_location_group_distance_penalty")]
    pub location_group_distance_penalty: f64,

    #[serde(default = "default_mbti_multiplier")]
    pub mbti_multiplier: f64,
    #[serde(default)]
    pub mbti_transform: MbtiTransform,

    /// Indexed by the candidate's reply frequency minus one
    #[serde(default = "default_reply_frequency_rewards")]
    pub reply_frequency_rewards: [f64; 5],
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            base_score: default_preference_base(),
            preferred_partner_score: default_preferred_partner_score(),
            timezone_base_penalty: default_timezone_base_penalty(),
            timezone_escalation_threshold: default_timezone_escalation_threshold(),
            timezone_escalation_multiplier: default_timezone_escalation_multiplier(),
            grade_base_penalty: default_grade_base_penalty(),
            grade_escalation_threshold: default_grade_escalation_threshold(),
            grade_escalation_multiplier: default_grade_escalation_multiplier(),
            same_location_reward: default_same_location_reward(),
            same_location_group_reward: default_same_location_group_reward(),
            location_group_distance_penalty: default_location_group_distance_penalty(),
            mbti_multiplier: default_mbti_multiplier(),
            mbti_transform: MbtiTransform::default(),
            reply_frequency_rewards: default_reply_frequency_rewards(),
        }
    }
}

fn default_preference_base() -> f64 { 30.0 }
fn default_preferred_partner_score() -> f64 { 999.0 }
fn default_timezone_base_penalty() -> f64 { -2.0 }
fn default_timezone_escalation_threshold() -> f64 { 6.0 }
fn default_timezone_escalation_multiplier() -> f64 { 1.25 }
fn default_grade_base_penalty() -> f64 { -2.25 }
fn default_grade_escalation_threshold() -> f64 { 3.0 }
fn default_grade_escalation_multiplier() -> f64 { 2.0 }
fn default_same_location_reward() -> f64 { 5.0 }
fn default_same_location_group_reward() -> f64 { 3.0 }
fn default_location_group_distance_penalty() -> f64 { -1.0 }
fn default_mbti_multiplier() -> f64 { 0.25 }
fn default_reply_frequency_rewards() -> [f64; 5] { [-4.0, -1.0, 0.0, 2.0, 5.0] }

/// Shaping applied to a partner's MBTI axis score before weighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MbtiTransform {
    /// The 0..=100 score as-is
    #[default]
    Raw,
    /// Score minus 50, so both poles pull equally
    Centered,
    /// `55 * tanh(0.03 * (score - 50))`, saturating near the poles
    ScaledSigmoid,
}

impl MbtiTransform {
    pub fn apply(self, axis_score: f64) -> f64 {
        match self {
            MbtiTransform::Raw => axis_score,
            MbtiTransform::Centered => axis_score - 50.0,
            MbtiTransform::ScaledSigmoid => 55.0 * (0.03 * (axis_score - 50.0)).tanh(),
        }
    }
}

/// Weights for a phrase-list field (hobbies, favorite media)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListFieldWeights {
    pub multiplier: f64,
    /// Inclusive similarity at which the bonus applies
    pub bonus_threshold: f64,
    pub bonus_multiplier: f64,
}

/// Weights for a single-answer free-text field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarFieldWeights {
    pub multiplier: f64,
    /// Inclusive; takes precedence over the lower threshold
    pub upper_threshold: f64,
    pub bonus_multiplier: f64,
    /// Exclusive; below it the reward is scaled by
    /// `(similarity - lower_threshold) * penalty_multiplier`
    pub lower_threshold: f64,
    pub penalty_multiplier: f64,
}

/// Constants for the embedding similarity score
///
/// Each field has its own defaults, and any single constant of a field can
/// be overridden without restating the others.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "SimilarityOverrides")]
pub struct SimilarityConfig {
    pub base_score: f64,
    pub hobbies: ListFieldWeights,
    pub favorite_media: ListFieldWeights,
    pub wish: ScalarFieldWeights,
    pub weekend_plan: ScalarFieldWeights,
    pub expectation: ScalarFieldWeights,
    pub narrative: ScalarFieldWeights,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        let list = ListFieldWeights {
            multiplier: 6.0,
            bonus_threshold: 0.75,
            bonus_multiplier: 1.5,
        };
        let scalar = ScalarFieldWeights {
            multiplier: 5.0,
            upper_threshold: 0.7,
            bonus_multiplier: 1.5,
            lower_threshold: 0.3,
            penalty_multiplier: 4.0,
        };
        Self {
            base_score: 0.0,
            hobbies: list,
            favorite_media: ListFieldWeights { multiplier: 4.0, ..list },
            wish: scalar,
            weekend_plan: ScalarFieldWeights { multiplier: 4.0, ..scalar },
            expectation: scalar,
            narrative: ScalarFieldWeights { multiplier: 3.0, ..scalar },
        }
    }
}

/// Wire form of `SimilarityConfig`: whatever is present replaces the
/// matching default
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimilarityOverrides {
    base_score: Option<f64>,
    hobbies: ListFieldOverrides,
    favorite_media: ListFieldOverrides,
    wish: ScalarFieldOverrides,
    weekend_plan: ScalarFieldOverrides,
    expectation: ScalarFieldOverrides,
    narrative: ScalarFieldOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListFieldOverrides {
    multiplier: Option<f64>,
    bonus_threshold: Option<f64>,
    bonus_multiplier: Option<f64>,
}

impl ListFieldOverrides {
    fn apply(self, base: ListFieldWeights) -> ListFieldWeights {
        ListFieldWeights {
            multiplier: self.multiplier.unwrap_or(base.multiplier),
            bonus_threshold: self.bonus_threshold.unwrap_or(base.bonus_threshold),
            bonus_multiplier: self.bonus_multiplier.unwrap_or(base.bonus_multiplier),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScalarFieldOverrides {
    multiplier: Option<f64>,
    upper_threshold: Option<f64>,
    bonus_multiplier: Option<f64>,
    lower_threshold: Option<f64>,
    penalty_multiplier: Option<f64>,
}

impl ScalarFieldOverrides {
    fn apply(self, base: ScalarFieldWeights) -> ScalarFieldWeights {
        ScalarFieldWeights {
            multiplier: self.multiplier.unwrap_or(base.multiplier),
            upper_threshold: self.upper_threshold.unwrap_or(base.upper_threshold),
            bonus_multiplier: self.bonus_multiplier.unwrap_or(base.bonus_multiplier),
            lower_threshold: self.lower_threshold.unwrap_or(base.lower_threshold),
            penalty_multiplier: self.penalty_multiplier.unwrap_or(base.penalty_multiplier),
        }
    }
}

impl From<SimilarityOverrides> for SimilarityConfig {
    fn from(overrides: SimilarityOverrides) -> Self {
        let defaults = SimilarityConfig::default();
        Self {
            base_score: overrides.base_score.unwrap_or(defaults.base_score),
            hobbies: overrides.hobbies.apply(defaults.hobbies),
            favorite_media: overrides.favorite_media.apply(defaults.favorite_media),
            wish: overrides.wish.apply(defaults.wish),
            weekend_plan: overrides.weekend_plan.apply(defaults.weekend_plan),
            expectation: overrides.expectation.apply(defaults.expectation),
            narrative: overrides.narrative.apply(defaults.narrative),
        }
    }
}

/// How directed component scores fold into one matching weight
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompositionPolicy {
    pub preference_weight: f64,
    pub similarity_weight: f64,
    pub direction: DirectionMerge,
}

impl Default for CompositionPolicy {
    fn default() -> Self {
        Self {
            preference_weight: 1.0,
            similarity_weight: 1.0,
            direction: DirectionMerge::Sum,
        }
    }
}

/// How `score(a, b)` and `score(b, a)` combine into one pair weight.
/// A disqualified direction disqualifies the pair unless only the forward
/// direction is consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionMerge {
    /// Only the `from -> to` score
    Forward,
    #[default]
    Sum,
    Mean,
    Min,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSettings {
    /// Values from `LOG_LEVEL` / `LOG_FORMAT` replace the configured ones
    pub fn overridden_by(mut self, level: Option<String>, format: Option<String>) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        if let Some(format) = format {
            self.format = format;
        }
        self
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "full".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PAIRING__)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PAIRING__ENCODER__ENDPOINT -> encoder.endpoint
            .add_source(
                Environment::with_prefix("PAIRING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PAIRING")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
