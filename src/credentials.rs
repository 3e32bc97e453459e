//! Credential loading from an optional `.env` file and the process
//! environment.
//!
//! The file is `$GROWTH_ADVISOR_ENV_FILE` or `./.env`. Process environment
//! values for the keys the advisor needs override file values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, ConfigError};

/// Env var naming the credentials file.
pub const ENV_FILE_ENV: &str = "GROWTH_ADVISOR_ENV_FILE";

/// Loaded API credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns a required credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] when the key is absent or blank.
    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .map(str::to_owned)
            .ok_or_else(|| ConfigError::MissingCredential(key.to_owned()))
    }

    /// Overlay values from `env` for each of `keys`.
    pub fn overlay_env(&mut self, keys: &[&str], env: impl Fn(&str) -> Option<String>) {
        for key in keys {
            if let Some(value) = env(key) {
                self.vars.insert((*key).to_owned(), value);
            }
        }
    }
}

/// Parse a `.env` file.
///
/// # Errors
///
/// Returns [`ConfigError::Credentials`] if the file cannot be read or a line
/// cannot be parsed.
pub fn load_env_file(path: &Path) -> Result<Credentials, ConfigError> {
    let fail = |e: dotenvy::Error| ConfigError::Credentials {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut vars = BTreeMap::new();
    for item in dotenvy::from_path_iter(path).map_err(fail)? {
        let (key, value) = item.map_err(fail)?;
        vars.insert(key, value);
    }
    debug!(path = %path.display(), keys = vars.len(), "loaded credentials file");
    Ok(Credentials { vars })
}

/// Resolve the credentials file path using a custom env resolver.
pub fn env_file_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    env(ENV_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".env"))
}

/// Load the credentials `config` needs.
///
/// A missing `.env` file is fine; presence of the keys is checked later by
/// whoever requires them.
///
/// # Errors
///
/// Returns [`ConfigError::Credentials`] if an existing file is malformed.
pub fn load_credentials(config: &Config) -> Result<Credentials, ConfigError> {
    let path = env_file_path_with(|key| std::env::var(key).ok());
    let mut credentials = if path.exists() {
        load_env_file(&path)?
    } else {
        Credentials::default()
    };
    credentials.overlay_env(
        &[
            config.generation.api_key_env.as_str(),
            config.search.api_key_env.as_str(),
        ],
        |key| std::env::var(key).ok(),
    );
    Ok(credentials)
}
