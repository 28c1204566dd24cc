//! Configuration management.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, `SLACKPRUNE_CONFIG_PATH`, or the default location)
//! 3. Environment variables (`SLACKPRUNE_*`)
//! 4. Command-line flags
//!
//! # Config File
//!
//! ```toml
//! me = "alice"
//! filter = "ace,base"
//! before = "20240101"
//!
//! [api]
//! base_url = "https://slack.com/api"
//! timeout_ms = 30000
//!
//! [pacing]
//! rate_limit_wait_ms = 1000
//! delete_pause_ms = 200
//!
//! [logging]
//! format = "json"
//! ```

use crate::models::{Cutoff, FilterPattern};
use crate::services::{PruneOptions, RetryPolicy};
use crate::slack::{SlackClient, SlackHttpConfig};
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Slack token.
pub const TOKEN_ENV: &str = "MY_SLACK_TOKEN";

/// Environment variable pointing at a config file.
pub const CONFIG_PATH_ENV: &str = "SLACKPRUNE_CONFIG_PATH";

/// Resolved configuration for a run.
#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// Slack OAuth token.
    pub token: Option<SecretString>,
    /// Username to prune for.
    pub me: Option<String>,
    /// Comma-separated conversation filter terms.
    pub filter: Option<String>,
    /// `YYYYMMDD` cutoff date.
    pub before: Option<String>,
    /// Perform deletes.
    pub commit: bool,
    /// Slack API settings.
    pub api: ApiSettings,
    /// Retry and throttle settings.
    pub pacing: PacingSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Slack API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// API base URL.
    pub base_url: String,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        let http = SlackHttpConfig::default();
        Self {
            base_url: SlackClient::DEFAULT_ENDPOINT.to_string(),
            timeout_ms: http.timeout_ms,
            connect_timeout_ms: http.connect_timeout_ms,
        }
    }
}

/// Retry and throttle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingSettings {
    /// Wait after a rate-limited call, in milliseconds.
    pub rate_limit_wait_ms: u64,
    /// Pause after each successful delete, in milliseconds.
    pub delete_pause_ms: u64,
    /// Attempt ceiling per call; `None` retries rate limits forever.
    pub max_attempts: Option<u32>,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            rate_limit_wait_ms: 1_000,
            delete_pause_ms: 200,
            max_attempts: None,
        }
    }
}

/// Logging settings from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `slackprune=debug`.
    pub level: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Slack token.
    pub token: Option<String>,
    /// Username.
    pub me: Option<String>,
    /// Filter terms.
    pub filter: Option<String>,
    /// Cutoff date.
    pub before: Option<String>,
    /// API section.
    pub api: Option<ConfigFileApi>,
    /// Pacing section.
    pub pacing: Option<ConfigFilePacing>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// API section in config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileApi {
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Pacing section in config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFilePacing {
    /// Rate-limit wait.
    pub rate_limit_wait_ms: Option<u64>,
    /// Delete pause.
    pub delete_pause_ms: Option<u64>,
    /// Attempt ceiling.
    pub max_attempts: Option<u32>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--token` (or `MY_SLACK_TOKEN`).
    pub token: Option<String>,
    /// `--me`.
    pub me: Option<String>,
    /// `--filter`.
    pub filter: Option<String>,
    /// `--before`.
    pub before: Option<String>,
    /// `--commit`.
    pub commit: bool,
    /// `--api-url`.
    pub api_url: Option<String>,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            token: None,
            me: None,
            filter: None,
            before: None,
            commit: false,
            api: ApiSettings::default(),
            pacing: PacingSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PruneConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location, if a file exists there.
    ///
    /// Returns default configuration if no config file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads configuration from an explicit path, `SLACKPRUNE_CONFIG_PATH`,
    /// or the default location, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Self::load_from_file(Path::new(&path));
            }
        }

        Self::load_default()
    }

    /// Converts a `ConfigFile` to `PruneConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        config.token = file.token.map(SecretString::from);
        config.me = file.me;
        config.filter = file.filter;
        config.before = file.before;

        if let Some(api) = file.api {
            if let Some(base_url) = api.base_url {
                config.api.base_url = base_url;
            }
            if let Some(v) = api.timeout_ms {
                config.api.timeout_ms = v;
            }
            if let Some(v) = api.connect_timeout_ms {
                config.api.connect_timeout_ms = v;
            }
        }
        if let Some(pacing) = file.pacing {
            if let Some(v) = pacing.rate_limit_wait_ms {
                config.pacing.rate_limit_wait_ms = v;
            }
            if let Some(v) = pacing.delete_pause_ms {
                config.pacing.delete_pause_ms = v;
            }
            config.pacing.max_attempts = pacing.max_attempts;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides read through `lookup`.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.token = Some(SecretString::from(token));
        }
        if let Some(url) = lookup("SLACKPRUNE_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(v) = lookup("SLACKPRUNE_RATE_LIMIT_WAIT_MS").and_then(|v| v.parse().ok()) {
            self.pacing.rate_limit_wait_ms = v;
        }
        if let Some(v) = lookup("SLACKPRUNE_DELETE_PAUSE_MS").and_then(|v| v.parse().ok()) {
            self.pacing.delete_pause_ms = v;
        }
        self
    }

    /// Applies command-line values.
    #[must_use]
    pub fn with_cli_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(token) = overrides.token.filter(|v| !v.trim().is_empty()) {
            self.token = Some(SecretString::from(token));
        }
        if overrides.me.is_some() {
            self.me = overrides.me;
        }
        if overrides.filter.is_some() {
            self.filter = overrides.filter;
        }
        if overrides.before.is_some() {
            self.before = overrides.before;
        }
        if let Some(url) = overrides.api_url {
            self.api.base_url = url;
        }
        self.commit = self.commit || overrides.commit;
        self
    }

    /// Returns the token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no token was configured.
    pub fn token(&self) -> Result<&SecretString> {
        self.token.as_ref().ok_or_else(|| {
            Error::InvalidInput(format!("env {TOKEN_ENV} missing and --token flag empty"))
        })
    }

    /// Validates the run settings and builds pipeline options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `me` is missing, the filter does not
    /// compile, or `before` is not a `YYYYMMDD` date.
    pub fn prune_options(&self) -> Result<PruneOptions> {
        let me = self
            .me
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| Error::InvalidInput("--me flag missing".to_string()))?;

        let filter = match self.filter.as_deref() {
            Some(terms) => FilterPattern::parse(terms)?,
            None => None,
        };
        let cutoff = match self.before.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(date) => Some(Cutoff::parse(date)?),
            None => None,
        };

        Ok(PruneOptions::new(me)
            .with_filter(filter)
            .with_cutoff(cutoff)
            .with_commit(self.commit)
            .with_delete_pause(Duration::from_millis(self.pacing.delete_pause_ms)))
    }

    /// Builds the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(self.pacing.rate_limit_wait_ms))
            .with_max_attempts(self.pacing.max_attempts)
    }

    /// Builds the Slack client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no token was configured.
    pub fn slack_client(&self) -> Result<SlackClient> {
        let token = self.token()?.clone();
        Ok(SlackClient::new(token)
            .with_endpoint(self.api.base_url.clone())
            .with_http_config(SlackHttpConfig {
                timeout_ms: self.api.timeout_ms,
                connect_timeout_ms: self.api.connect_timeout_ms,
            }))
    }
}

/// Default config file location (`<config dir>/slackprune/config.toml`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "slackprune")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
