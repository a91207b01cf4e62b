//! Core types, configuration, and errors for omograph
//!
//! This crate contains the foundational pieces shared by the homograph
//! classifier and its command-line driver: the error type, the YAML
//! configuration model, and the two narrow boundaries (pair encoding and
//! sequence-pair inference) that the classification engine talks to.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum token length for every (context, candidate) pair.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Stress marker inserted by the accentuation pipeline after the stressed vowel.
pub const DEFAULT_STRESS_MARKER: char = '+';

/// Base forms whose candidate runs are split into chunks of three rather
/// than two.
///
/// These are morphologically ambiguous forms (e.g. `начала`, `развитая`)
/// where adjacent occurrences would otherwise be merged into a single run
/// that the even-split rule cuts in the wrong place.
pub const DEFAULT_SPECIAL_WORDS: &[&str] = &[
    "балчуга",
    "вертела",
    "волоки",
    "волоку",
    "воронью",
    "выбродите",
    "вывозите",
    "выносите",
    "выноситесь",
    "выходите",
    "железы",
    "начала",
    "округа",
    "перепела",
    "развитая",
    "развитого",
    "развитое",
    "развитой",
    "развитом",
    "развитому",
    "развитою",
    "развитую",
    "развитые",
    "развитым",
    "развитыми",
    "развитых",
    "сторожа",
    "сторожи",
    "сторожу",
    "удало",
    "начался",
    "началась",
    "началось",
    "бутиках",
    "ожила",
    "создало",
    "коротки",
    "проклята",
    "роженица",
    "роженицы",
    "рожениц",
    "роженице",
    "роженицам",
    "роженицу",
    "роженицей",
    "роженицею",
    "роженицами",
    "роженицах",
    "пристава",
    "приставов",
    "приставам",
    "приставами",
    "приставах",
    "пережитое",
    "пережитого",
    "пережитые",
    "пережитых",
    "пережитому",
    "пережитым",
    "пережитыми",
    "пережитом",
    "нипоняла",
];

// ---------------------------------------------------------------------------
// Model boundary types
// ---------------------------------------------------------------------------

/// Tokenizer settings for one encoding call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Maximum number of tokens per pair.
    pub max_length: usize,
    /// Truncate pairs longer than `max_length`.
    pub truncation: bool,
    /// Pad every row to the longest row of the batch.
    pub padding: bool,
}

impl EncodeOptions {
    /// Options for a padded batch of pairs.
    #[must_use]
    pub fn batched(max_length: usize) -> Self {
        Self {
            max_length,
            truncation: true,
            padding: true,
        }
    }

    /// Options for a single, unpadded pair.
    #[must_use]
    pub fn single(max_length: usize) -> Self {
        Self {
            max_length,
            truncation: true,
            padding: false,
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::batched(DEFAULT_MAX_LENGTH)
    }
}

/// Model-ready token tensors for a list of (text, hypothesis) pairs.
///
/// Row `i` of every field belongs to input pair `i`. Rows are only
/// guaranteed to share a length when the batch was encoded with padding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedBatch {
    /// Token ids.
    pub input_ids: Vec<Vec<u32>>,
    /// 1 for real tokens, 0 for padding.
    pub attention_mask: Vec<Vec<u32>>,
    /// Segment ids (0 for the text, 1 for the hypothesis).
    pub token_type_ids: Vec<Vec<u32>>,
}

impl EncodedBatch {
    /// Number of encoded pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Returns `true` if the batch holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Raw classifier output: one row of logits per encoded pair.
pub type ScoreMatrix = Vec<Vec<f32>>;

/// Column of a score row holding the "entailment is true" logit.
pub const ENTAILMENT_TRUE_INDEX: usize = 1;

// ---------------------------------------------------------------------------
// Boundary traits
// ---------------------------------------------------------------------------

/// Turns (text, hypothesis) string pairs into model-ready tensors.
///
/// Implementations must support both a single pair and a padded list of
/// pairs.
pub trait PairEncoder: Send + Sync {
    /// Encode `pairs` using `options`.
    fn encode_pairs(&self, pairs: &[(&str, &str)], options: &EncodeOptions)
        -> Result<EncodedBatch>;
}

/// Runs the sequence-pair classifier over an encoded batch.
pub trait PairClassifier: Send + Sync {
    /// Return raw logits, one row per input pair, with at least two columns.
    fn run(&self, batch: &EncodedBatch) -> Result<ScoreMatrix>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Top-level configuration for the omograph classifier and CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OmographConfig {
    /// Classification engine settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Model location and device.
    #[serde(default)]
    pub model: ModelConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl OmographConfig {
    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`OmographError::Config`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        self.model.validate()
    }
}

/// Settings for grouping and classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Maximum token length per pair.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Character marking the stressed vowel in candidate variants.
    #[serde(default = "default_stress_marker")]
    pub stress_marker: char,
    /// Fail fast on malformed input instead of silently truncating.
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Base forms that split into groups of three.
    #[serde(default = "default_special_words")]
    pub special_words: Vec<String>,
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_stress_marker() -> char {
    DEFAULT_STRESS_MARKER
}

fn default_strict() -> bool {
    true
}

fn default_special_words() -> Vec<String> {
    DEFAULT_SPECIAL_WORDS.iter().map(|w| (*w).to_string()).collect()
}

impl ClassifierConfig {
    fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(OmographError::Config(
                "classifier.max_length must be greater than zero".to_string(),
            ));
        }
        if self.stress_marker.is_alphanumeric() {
            return Err(OmographError::Config(format!(
                "classifier.stress_marker '{}' must not be a letter or digit",
                self.stress_marker
            )));
        }
        Ok(())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            stress_marker: default_stress_marker(),
            strict: default_strict(),
            special_words: default_special_words(),
        }
    }
}

/// Compute device preference for model inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// CUDA, then Metal, then CPU.
    #[default]
    Auto,
    /// Always run on the CPU.
    Cpu,
    /// CUDA device 0, CPU if unavailable.
    Cuda,
    /// Metal device 0, CPU if unavailable.
    Metal,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::Metal => write!(f, "metal"),
        }
    }
}

/// Where to load the classifier model from.
///
/// A local `path` takes precedence over `model_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hugging Face Hub repository id.
    #[serde(default)]
    pub model_id: Option<String>,
    /// Local directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Hub revision (branch, tag or commit).
    #[serde(default)]
    pub revision: Option<String>,
    /// Hub download cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Inference device.
    #[serde(default)]
    pub device: DevicePreference,
}

impl ModelConfig {
    fn validate(&self) -> Result<()> {
        let has_id = self.model_id.as_deref().is_some_and(|id| !id.is_empty());
        if self.path.is_none() && !has_id {
            return Err(OmographError::Config(
                "model.path or model.model_id must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `text` (human-readable) or `json` (structured).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum OmographError {
    /// Caller supplied inconsistent inputs.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The pair encoder failed.
    #[error("Tokenization error: {0}")]
    Tokenization(String),

    /// The inference engine failed or returned a malformed score matrix.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Model or tokenizer could not be loaded.
    #[error("Model loading error: {0}")]
    Model(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `std::result::Result<T, OmographError>`.
pub type Result<T> = std::result::Result<T, OmographError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
