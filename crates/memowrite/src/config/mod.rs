use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{MemoWriteError, Result};
use crate::scheduler::SchedulerError;

/// Main configuration structure for MemoWrite
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Spaced repetition parameters
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Answer grading service configuration
    #[serde(default)]
    pub grader: GraderConfig,
    /// Item store configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Question/answer import configuration
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from an explicit path, or from the first default
    /// location that exists, falling back to built-in defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".memowrite").join("config.toml")),
            dirs::config_dir().map(|c| c.join("memowrite").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Read and validate a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MemoWriteError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| MemoWriteError::Config(format!("Failed to parse config: {e}")))?;
        config
            .scheduler
            .validate()
            .map_err(|e| MemoWriteError::Config(e.to_string()))?;
        Ok(config)
    }
}

/// How a grown interval (previous interval times ease) becomes whole days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round half up to the nearest whole day (7.5 -> 8, 7.49 -> 7)
    #[default]
    HalfUp,
    /// Truncate toward zero
    Floor,
    /// Round up to the next whole day
    Ceil,
}

impl RoundingPolicy {
    /// Apply the policy to a non-negative day count
    pub fn apply(self, days: f64) -> f64 {
        match self {
            // f64::round rounds half away from zero, which is half up for positives
            RoundingPolicy::HalfUp => days.round(),
            RoundingPolicy::Floor => days.floor(),
            RoundingPolicy::Ceil => days.ceil(),
        }
    }
}

impl std::fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoundingPolicy::HalfUp => "half_up",
            RoundingPolicy::Floor => "floor",
            RoundingPolicy::Ceil => "ceil",
        };
        f.write_str(name)
    }
}

/// Spaced repetition (SM-2 family) parameters.
///
/// Loaded once at startup and read-only afterwards. Every constant the
/// scheduler uses lives here.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Ease factor given to a newly created item
    #[serde(default = "default_initial_ease")]
    pub initial_ease: f64,
    /// Floor the ease factor never drops below
    #[serde(default = "default_min_ease")]
    pub min_ease: f64,
    /// Optional ceiling for the ease factor (uncapped when unset)
    #[serde(default)]
    pub max_ease: Option<f64>,
    /// Lowest quality (0-5) that counts as a successful recall
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,
    /// Interval after the first successful review, in days
    #[serde(default = "default_first_interval_days")]
    pub first_interval_days: u32,
    /// Interval after the second consecutive successful review, in days
    #[serde(default = "default_second_interval_days")]
    pub second_interval_days: u32,
    /// Interval after a lapse, in days
    #[serde(default = "default_lapse_interval_days")]
    pub lapse_interval_days: u32,
    /// Interval held by a never-reviewed item
    #[serde(default)]
    pub seed_interval_days: u32,
    /// Rounding applied to grown intervals
    #[serde(default)]
    pub rounding: RoundingPolicy,
    /// Multiplier bonus added to the ease on a perfect (5) review; 1.0 disables it
    #[serde(default = "default_easy_bonus")]
    pub easy_bonus: f64,
    /// Cap on any grown interval, in days
    #[serde(default = "default_max_interval_days")]
    pub max_interval_days: u32,
    /// Consecutive successes needed for the "mastered" label
    #[serde(default = "default_mastery_repetitions")]
    pub mastery_repetitions: u32,
    /// Minimum ease needed for the "mastered" label
    #[serde(default = "default_mastery_min_ease")]
    pub mastery_min_ease: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease: default_initial_ease(),
            min_ease: default_min_ease(),
            max_ease: None,
            pass_threshold: default_pass_threshold(),
            first_interval_days: default_first_interval_days(),
            second_interval_days: default_second_interval_days(),
            lapse_interval_days: default_lapse_interval_days(),
            seed_interval_days: 0,
            rounding: RoundingPolicy::default(),
            easy_bonus: default_easy_bonus(),
            max_interval_days: default_max_interval_days(),
            mastery_repetitions: default_mastery_repetitions(),
            mastery_min_ease: default_mastery_min_ease(),
        }
    }
}

impl SchedulerConfig {
    /// Reject parameter combinations the scheduler cannot honor
    pub fn validate(&self) -> std::result::Result<(), SchedulerError> {
        let invalid = |msg: String| Err(SchedulerError::InvalidInput(msg));

        if !self.min_ease.is_finite() || self.min_ease <= 0.0 {
            return invalid(format!("min_ease must be positive, got {}", self.min_ease));
        }
        if !self.initial_ease.is_finite() || self.initial_ease < self.min_ease {
            return invalid(format!(
                "initial_ease {} is below min_ease {}",
                self.initial_ease, self.min_ease
            ));
        }
        if let Some(max) = self.max_ease {
            if !max.is_finite() || max < self.initial_ease {
                return invalid(format!(
                    "max_ease {max} is below initial_ease {}",
                    self.initial_ease
                ));
            }
        }
        if !(1..=crate::scheduler::Quality::MAX).contains(&self.pass_threshold) {
            return invalid(format!(
                "pass_threshold must be within 1..=5, got {}",
                self.pass_threshold
            ));
        }
        if self.first_interval_days == 0
            || self.second_interval_days == 0
            || self.lapse_interval_days == 0
        {
            return invalid("first, second and lapse intervals must be at least 1 day".into());
        }
        let fixed_max = self
            .first_interval_days
            .max(self.second_interval_days)
            .max(self.lapse_interval_days);
        if self.max_interval_days < fixed_max || self.max_interval_days > MAX_INTERVAL_LIMIT_DAYS {
            return invalid(format!(
                "max_interval_days must be within {fixed_max}..={MAX_INTERVAL_LIMIT_DAYS}, got {}",
                self.max_interval_days
            ));
        }
        if !self.easy_bonus.is_finite() || self.easy_bonus < 1.0 {
            return invalid(format!("easy_bonus must be >= 1.0, got {}", self.easy_bonus));
        }
        Ok(())
    }
}

fn default_initial_ease() -> f64 {
    2.5
}

fn default_min_ease() -> f64 {
    1.3
}

fn default_pass_threshold() -> u8 {
    3
}

fn default_first_interval_days() -> u32 {
    1
}

fn default_second_interval_days() -> u32 {
    6
}

fn default_lapse_interval_days() -> u32 {
    1
}

/// Upper bound accepted for `max_interval_days` (about 2700 years), keeping
/// every due date representable
pub const MAX_INTERVAL_LIMIT_DAYS: u32 = 1_000_000;

fn default_max_interval_days() -> u32 {
    36_500
}

fn default_easy_bonus() -> f64 {
    1.0
}

fn default_mastery_repetitions() -> u32 {
    4
}

fn default_mastery_min_ease() -> f64 {
    2.0
}

/// Remote grading service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraderConfig {
    /// OpenAI-compatible API base URL
    #[serde(default)]
    pub api_url: String,
    /// Environment variable name for API key
    #[serde(default = "default_grader_api_key_env")]
    pub api_key_env: String,
    /// Model identifier for remote API
    #[serde(default = "default_grader_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_grader_timeout_secs")]
    pub timeout_secs: u64,
    /// Grading strictness (0.0 = lenient, 1.0 = strict)
    #[serde(default = "default_grading_strictness")]
    pub strictness: f32,
    /// Plain-text course notes used as grading context
    #[serde(default)]
    pub course_notes: Option<PathBuf>,
    /// Maximum characters of course context sent with each request
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Longest accepted learner answer, in characters
    #[serde(default = "default_max_answer_length")]
    pub max_answer_length: usize,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key_env: default_grader_api_key_env(),
            model: default_grader_model(),
            timeout_secs: default_grader_timeout_secs(),
            strictness: default_grading_strictness(),
            course_notes: None,
            max_context_chars: default_max_context_chars(),
            max_answer_length: default_max_answer_length(),
        }
    }
}

fn default_grader_api_key_env() -> String {
    "MEMOWRITE_API_KEY".to_string()
}

fn default_grader_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_grader_timeout_secs() -> u64 {
    30
}

fn default_grading_strictness() -> f32 {
    0.7
}

fn default_max_context_chars() -> usize {
    2000
}

fn default_max_answer_length() -> usize {
    5000
}

/// Item store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory for all storage data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Store database file name inside the data directory
    #[serde(default = "default_store_file")]
    pub store_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_file: default_store_file(),
        }
    }
}

impl StorageConfig {
    /// Full path of the store database
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".memowrite"))
        .unwrap_or_else(|| PathBuf::from(".memowrite"))
}

fn default_store_file() -> String {
    "memowrite.db".to_string()
}

/// Question/answer import configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Repair spacing in extracted text before storing it
    #[serde(default = "default_fix_spacing")]
    pub fix_spacing: bool,
    /// Skip pairs whose question text already exists in the store
    #[serde(default = "default_skip_duplicates")]
    pub skip_duplicates: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fix_spacing: default_fix_spacing(),
            skip_duplicates: default_skip_duplicates(),
        }
    }
}

fn default_fix_spacing() -> bool {
    true
}

fn default_skip_duplicates() -> bool {
    true
}
