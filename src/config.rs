//! Configuration loading and validation.
//!
//! Loads `./growth-advisor.toml` (or `$GROWTH_ADVISOR_CONFIG`). Environment
//! variables override file values; file values override defaults. A missing
//! file is not an error: every section has working defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::messaging::ReplacementFilter;
use crate::profile::OnboardingFlow;
use crate::search::classifier::{ClassifierRules, SearchClassifier, DEFAULT_SHORT_QUERY_MAX_TOKENS};
use crate::search::MAX_FORWARDED_RESULTS;

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "GROWTH_ADVISOR_CONFIG";
/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "growth-advisor.toml";

/// Errors from loading configuration or credentials.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config at {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range or malformed.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// A required credential is absent.
    #[error("missing required credential: {0}")]
    MissingCredential(String),
    /// The credentials file could not be parsed.
    #[error("failed to load credentials from {path}: {reason}")]
    Credentials {
        /// File path.
        path: PathBuf,
        /// Parse failure.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level advisor configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text-generation backend.
    pub generation: GenerationConfig,
    /// Web search backend.
    pub search: SearchConfig,
    /// Onboarding questions.
    pub onboarding: OnboardingConfig,
    /// Response shaping.
    pub response: ResponseConfig,
    /// Extra search-relevance rules.
    pub classifier: ClassifierConfig,
    /// Profile store bounds.
    pub store: StoreConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load with precedence env vars > TOML file > defaults, then validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`Config::load`], reading `path` instead of the default location.
    ///
    /// An explicitly given path must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or a
    /// value fails validation.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::load_default_file()?,
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_default_file() -> Result<Self, ConfigError> {
        let path = config_path_with(|key| std::env::var(key).ok());
        if path.exists() {
            Self::load_file(&path)
        } else {
            tracing::info!("no config file found, using defaults");
            Ok(Self::default())
        }
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loading config from file");
        Self::from_toml(&contents)
    }

    /// Parse a TOML string into config. No env overrides, no validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests need not touch the process
    /// environment. Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("GROWTH_ADVISOR_MODEL") {
            self.generation.model = v;
        }
        if let Some(v) = env("GROWTH_ADVISOR_MODEL_BASE_URL") {
            self.generation.base_url = v;
        }
        if let Some(v) = env("GROWTH_ADVISOR_STREAMING") {
            match parse_bool(&v) {
                Some(b) => self.generation.streaming = b,
                None => warn_invalid("GROWTH_ADVISOR_STREAMING", &v),
            }
        }
        if let Some(v) = env("GROWTH_ADVISOR_ONBOARDING_FLOW") {
            match v.parse() {
                Ok(flow) => self.onboarding.flow = flow,
                Err(_) => warn_invalid("GROWTH_ADVISOR_ONBOARDING_FLOW", &v),
            }
        }
        if let Some(v) = env("GROWTH_ADVISOR_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("GROWTH_ADVISOR_LOGS_DIR") {
            self.logging.logs_dir = Some(PathBuf::from(v));
        }
    }

    /// Reject values the advisor cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("generation.base_url", &self.generation.base_url)?;
        check_url("search.base_url", &self.search.base_url)?;

        if self.generation.model.trim().is_empty() {
            return Err(invalid("generation.model", "must not be empty"));
        }
        if self.generation.max_attempts == 0 {
            return Err(invalid("generation.max_attempts", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(invalid("generation.temperature", "must be within 0.0..=2.0"));
        }
        if self.search.max_results == 0 {
            return Err(invalid("search.max_results", "must be at least 1"));
        }
        if self.search.top_k == 0 {
            return Err(invalid("search.top_k", "must be at least 1"));
        }
        if self.search.top_k > MAX_FORWARDED_RESULTS {
            return Err(invalid(
                "search.top_k",
                &format!("must be at most {MAX_FORWARDED_RESULTS}"),
            ));
        }
        if self.response.min_words == 0 {
            return Err(invalid("response.min_words", "must be at least 1"));
        }

        SearchClassifier::new(&ClassifierRules::from_config(&self.classifier))
            .map_err(|e| invalid("classifier", &e.to_string()))?;
        ReplacementFilter::new(&self.response.replacements)
            .map_err(|e| invalid("response.replacements", &e.to_string()))?;

        Ok(())
    }
}

/// Resolve the config file path using a custom env resolver.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    env(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn warn_invalid(var: &str, value: &str) {
    tracing::warn!(var, value, "ignoring invalid env override");
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| invalid(field, &e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(field, &format!("unsupported scheme {other}"))),
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Text-generation backend (`[generation]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// OpenAI-compatible API base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap. Unset leaves it to the server.
    pub max_tokens: Option<u32>,
    /// Stream completions instead of waiting for the full text.
    pub streaming: bool,
    /// Total attempts for the answer-producing call (1 = no retry).
    pub max_attempts: u32,
    /// Credential key holding the API key.
    pub api_key_env: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fireworks.ai/inference/v1".to_owned(),
            model: "accounts/sentientfoundation/models/dobby-unhinged-llama-3-3-70b-new".to_owned(),
            temperature: 0.5,
            max_tokens: None,
            streaming: true,
            max_attempts: 2,
            api_key_env: "MODEL_API_KEY".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Web search backend (`[search]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Tavily API base URL.
    pub base_url: String,
    /// Credential key holding the API key.
    pub api_key_env: String,
    /// `basic` or `advanced`.
    pub search_depth: String,
    /// Domains results are restricted to. Empty means any.
    pub include_domains: Vec<String>,
    /// Results requested from the backend.
    pub max_results: u32,
    /// Results forwarded to the caller and embedded in the prompt, at most
    /// [`MAX_FORWARDED_RESULTS`].
    pub top_k: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_owned(),
            api_key_env: "TAVILY_API_KEY".to_owned(),
            search_depth: "advanced".to_owned(),
            include_domains: [
                "ycombinator.com",
                "a16z.com",
                "firstround.com",
                "techcrunch.com",
                "crunchbase.com",
            ]
            .iter()
            .map(|d| (*d).to_owned())
            .collect(),
            max_results: 5,
            top_k: 3,
            timeout_secs: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Onboarding / response / classifier
// ---------------------------------------------------------------------------

/// Onboarding questions (`[onboarding]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    /// Four-question or idea-only flow.
    pub flow: OnboardingFlow,
    /// Shorter answers are stored as "Not specified".
    pub min_answer_chars: usize,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            flow: OnboardingFlow::Full,
            min_answer_chars: 3,
        }
    }
}

/// Response shaping (`[response]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Words per streamed chunk, unless a clause ends first.
    pub min_words: usize,
    /// Sentence cap requested from the model for standard advice.
    pub max_sentences: Option<u32>,
    /// Whole-word replacements applied to generated text.
    pub replacements: BTreeMap<String, String>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            min_words: 2,
            max_sentences: None,
            replacements: default_replacements(),
        }
    }
}

fn default_replacements() -> BTreeMap<String, String> {
    [
        ("shit", "stuff"),
        ("fuck", "darn"),
        ("fucking", "really"),
        ("damn", "darn"),
        ("ass", "butt"),
        ("bitch", "difficult person"),
        ("hell", "heck"),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
    .collect()
}

/// Additions to the built-in search-relevance rules (`[classifier]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Extra explicit-request regexes.
    pub extra_explicit_patterns: Vec<String>,
    /// Extra factual-question regexes.
    pub extra_factual_patterns: Vec<String>,
    /// Extra keyword substrings.
    pub extra_keywords: Vec<String>,
    /// Extra short-query continuation words.
    pub extra_continuation_words: Vec<String>,
    /// Extra short-query information nouns.
    pub extra_info_nouns: Vec<String>,
    /// Token count at or below which a query is "short".
    pub short_query_max_tokens: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            extra_explicit_patterns: Vec::new(),
            extra_factual_patterns: Vec::new(),
            extra_keywords: Vec::new(),
            extra_continuation_words: Vec::new(),
            extra_info_nouns: Vec::new(),
            short_query_max_tokens: DEFAULT_SHORT_QUERY_MAX_TOKENS,
        }
    }
}

// ---------------------------------------------------------------------------
// Store / logging
// ---------------------------------------------------------------------------

/// Profile store bounds (`[store]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum stored profiles. Unset means unbounded.
    pub capacity: Option<usize>,
    /// Seconds of inactivity before a profile expires. Unset means never.
    pub idle_ttl_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: Some(10_000),
            idle_ttl_secs: Some(86_400),
        }
    }
}

/// Log output (`[logging]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs. Unset logs to stderr only.
    pub logs_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            logs_dir: None,
        }
    }
}
