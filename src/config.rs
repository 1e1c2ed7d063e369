//! Configuration management for sqlgate.
//!
//! Handles loading configuration from a TOML file, with sections for the
//! database, the validator policy, the session budget and the LLM provider.

use crate::error::{GateError, Result};
use crate::safety::ValidatorOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure for sqlgate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Database to open.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Query validation policy.
    #[serde(default)]
    pub validator: ValidatorOptions,

    /// Retry budget for one user request.
    #[serde(default)]
    pub session: SessionConfig,

    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLAlchemy-style SQLite URI, e.g. `sqlite:///Chinook.db`.
    pub url: String,

    /// Upper bound for one statement, in seconds.
    pub statement_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:///Chinook.db".to_string(),
            statement_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// Returns the statement timeout as a Duration.
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    /// Resolves the configured URI to a database file path.
    ///
    /// `sqlite:///rel.db` is relative to the working directory and
    /// `sqlite:////abs.db` is absolute.
    pub fn sqlite_path(&self) -> Result<PathBuf> {
        let url = Url::parse(&self.url)
            .map_err(|e| GateError::config(format!("Invalid database URI '{}': {e}", self.url)))?;

        if url.scheme() != "sqlite" {
            return Err(GateError::config(format!(
                "Invalid scheme '{}'. Only 'sqlite' databases are supported",
                url.scheme()
            )));
        }

        if url.host_str().is_some_and(|host| !host.is_empty()) {
            return Err(GateError::config(format!(
                "Database URI '{}' must not name a host; use sqlite:///path/to/file.db",
                self.url
            )));
        }

        let path = url.path().strip_prefix('/').unwrap_or(url.path());
        if path.is_empty() {
            return Err(GateError::config(format!(
                "Database URI '{}' does not name a file",
                self.url
            )));
        }

        Ok(PathBuf::from(path))
    }
}

/// Session budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of validation passes per request.
    pub attempt_cap: usize,

    /// Wall-clock limit for a whole request, in seconds.
    pub deadline_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            attempt_cap: 5,
            deadline_secs: 120,
        }
    }
}

impl SessionConfig {
    /// Returns the session deadline as a Duration.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "groq", "openai", "ollama" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name. Empty means the provider's default.
    #[serde(default)]
    pub model: String,

    /// Overrides the provider's API base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_provider() -> String {
    "groq".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            base_url: None,
            temperature: None,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlgate")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GateError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            GateError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.check()?;
        Ok(config)
    }

    /// Rejects values no session could run with.
    pub fn check(&self) -> Result<()> {
        if self.session.attempt_cap == 0 {
            return Err(GateError::config("session.attempt_cap must be at least 1"));
        }
        if self.validator.default_row_limit == 0 {
            return Err(GateError::config(
                "validator.default_row_limit must be at least 1",
            ));
        }
        if self.database.statement_timeout_secs == 0 {
            return Err(GateError::config(
                "database.statement_timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }
}
