//! Meal planner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::generation::RetryPolicy;

/// Longest history window accepted from config or the command line (ten years)
pub const MAX_HISTORY_WEEKS: u32 = 520;

/// Main meal planner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Retry and timeout policy for generation calls
    pub retry: RetryConfig,

    /// Conversation defaults
    pub planning: PlanningConfig,

    /// Prompt assembly settings
    pub prompts: PromptsConfig,

    /// Plan parser settings
    pub parser: ParserConfig,

    /// Storage locations
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set. Call this before starting a chat so
    /// a missing key fails fast instead of on the first generation.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.planning.min_meals == 0 || self.planning.min_meals > self.planning.max_meals {
            return Err(eyre::eyre!(
                "Invalid meal range: min-meals {} max-meals {}",
                self.planning.min_meals,
                self.planning.max_meals
            ));
        }
        if self.planning.history_weeks > MAX_HISTORY_WEEKS {
            return Err(eyre::eyre!(
                "Invalid history-weeks {}: at most {}",
                self.planning.history_weeks,
                MAX_HISTORY_WEEKS
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .mealplanner.yml
        let local_config = PathBuf::from(".mealplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/mealplanner/mealplanner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mealplanner").join("mealplanner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// HTTP request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 90_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} is not set", self.api_key_env))
    }
}

/// Retry and timeout policy for generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,

    /// Backoff growth factor per attempt
    pub multiplier: f64,

    /// Upper bound for any single delay
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Random extra delay added to each backoff
    #[serde(rename = "jitter-ms")]
    pub jitter_ms: u64,

    /// Per-attempt generation timeout
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            multiplier: 2.0,
            max_backoff_ms: 30_000,
            jitter_ms: 250,
            timeout_ms: 60_000,
        }
    }
}

impl RetryConfig {
    /// Build the runtime retry policy
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            multiplier: self.multiplier,
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            jitter: Duration::from_millis(self.jitter_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Conversation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Meals planned when the reply has no usable number
    #[serde(rename = "default-meals")]
    pub default_meals: u32,

    #[serde(rename = "min-meals")]
    pub min_meals: u32,

    #[serde(rename = "max-meals")]
    pub max_meals: u32,

    /// Cap for free-text special requests and refinement feedback
    #[serde(rename = "max-request-chars")]
    pub max_request_chars: usize,

    /// How far back meal history is read for prompt context
    #[serde(rename = "history-weeks")]
    pub history_weeks: u32,

    /// Token budget for a plan generation
    #[serde(rename = "plan-max-tokens")]
    pub plan_max_tokens: u32,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            default_meals: 7,
            min_meals: 1,
            max_meals: 14,
            max_request_chars: 500,
            history_weeks: 4,
            plan_max_tokens: 4000,
        }
    }
}

/// Prompt assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Maximum offers listed per department
    #[serde(rename = "offers-per-category")]
    pub offers_per_category: usize,

    /// Directory with `*.pmt` template overrides
    pub dir: Option<PathBuf>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            offers_per_category: 20,
            dir: None,
        }
    }
}

/// Plan parser settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Units recognized in addition to the built-in set
    #[serde(rename = "extra-units")]
    pub extra_units: Vec<String>,

    /// Currency markers recognized in price estimates in addition to the built-in set
    #[serde(rename = "currency-markers")]
    pub currency_markers: Vec<String>,
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for preferences and history files
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    /// JSON file with current offers
    #[serde(rename = "offers-file")]
    pub offers_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/mealplanner on Linux)
        let data_dir = dirs::data_dir()
            .map(|d| d.join("mealplanner"))
            .unwrap_or_else(|| PathBuf::from(".mealplanner"));

        Self {
            data_dir,
            offers_file: None,
        }
    }
}

impl StorageConfig {
    /// Directory holding one preferences YAML per household
    pub fn preferences_dir(&self) -> PathBuf {
        self.data_dir.join("preferences")
    }

    /// Append-only meal history file
    pub fn history_file(&self) -> PathBuf {
        self.data_dir.join("history.jsonl")
    }
}
