//! Log format and filter selection.

use crate::config::LoggingSettings;

/// Environment variable holding a filter directive for this tool.
pub const LOG_ENV: &str = "SLACKPRUNE_LOG";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub directive: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            directive: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from file settings and the `--verbose` flag,
    /// with environment overrides.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        Self::from_settings_with(settings, verbose, |key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_settings`], reading the environment through `lookup`.
    ///
    /// The filter directive is the first of `SLACKPRUNE_LOG`, `RUST_LOG`,
    /// `debug` when verbose, the configured level, then `info`.
    #[must_use]
    pub fn from_settings_with(
        settings: &LoggingSettings,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let format = settings
            .format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default();

        let directive = lookup(LOG_ENV)
            .or_else(|| lookup("RUST_LOG"))
            .filter(|d| !d.trim().is_empty())
            .or_else(|| verbose.then(|| "debug".to_string()))
            .or_else(|| settings.level.clone())
            .unwrap_or_else(|| "info".to_string());

        Self { format, directive }
    }

    /// Overrides the format, e.g. from `--log-format`.
    #[must_use]
    pub fn with_format(mut self, format: Option<LogFormat>) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_to_pretty_info() {
        let config = LoggingConfig::from_settings_with(&LoggingSettings::default(), false, no_env);
        assert_eq!(config, LoggingConfig::default());
    }

    #[test]
    fn test_verbose_beats_configured_level() {
        let settings = LoggingSettings {
            format: Some("JSON".to_string()),
            level: Some("warn".to_string()),
        };
        let config = LoggingConfig::from_settings_with(&settings, true, no_env);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directive, "debug");

        let config = LoggingConfig::from_settings_with(&settings, false, no_env);
        assert_eq!(config.directive, "warn");
    }

    #[test]
    fn test_env_directive_wins() {
        let config = LoggingConfig::from_settings_with(&LoggingSettings::default(), true, |key| {
            (key == "RUST_LOG").then(|| "slackprune=trace".to_string())
        });
        assert_eq!(config.directive, "slackprune=trace");
    }

    #[test]
    fn test_cli_format_override() {
        let config = LoggingConfig::default().with_format(Some(LogFormat::Json));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(LogFormat::parse("yaml"), None);
    }
}
