// ABOUTME: Logging configuration value passed explicitly to the subscriber and orchestrator
// ABOUTME: Resolves verbosity from flag, environment and config file and lists suppressed loggers

use crate::constants;
use crate::error::{ConfigError, Result};
use crate::pipeline::PipelineConfig;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Loggers that are quietened to `warn` unless the config file overrides the list
pub const DEFAULT_SUPPRESSED_LOGGERS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub suppressed_loggers: Vec<String>,
    /// Log captured stdout of each operation at info level
    pub echo_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            suppressed_loggers: DEFAULT_SUPPRESSED_LOGGERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            echo_output: true,
        }
    }
}

impl LoggingConfig {
    /// Precedence: flag, then `E2B_WRITER_LOG`, then config file, then `info`.
    pub fn resolve(cli_level: Option<LogLevel>, pipeline: Option<&PipelineConfig>) -> Result<Self> {
        let mut config = Self::default();

        let env_level = env::var(constants::E2B_WRITER_LOG)
            .ok()
            .filter(|s| !s.trim().is_empty());

        config.level = match (cli_level, env_level, pipeline.and_then(|p| p.log_level.as_deref())) {
            (Some(level), _, _) => level,
            (None, Some(level), _) => level.parse()?,
            (None, None, Some(level)) => level.parse()?,
            (None, None, None) => constants::DEFAULT_LOG_LEVEL.parse()?,
        };

        if let Some(pipeline) = pipeline {
            if let Some(suppressed) = &pipeline.suppressed_loggers {
                config.suppressed_loggers = suppressed.clone();
            }
            if let Some(echo) = pipeline.echo_output {
                config.echo_output = echo;
            }
        }

        Ok(config)
    }

    /// `EnvFilter` directive string, e.g. `info,hyper=warn,reqwest=warn`.
    /// Suppression never raises a logger above the global level.
    pub fn filter_directives(&self) -> String {
        let suppressed_level = self.level.max(LogLevel::Warn);
        let mut directives = vec![self.level.as_str().to_string()];
        directives.extend(
            self.suppressed_loggers
                .iter()
                .filter(|target| !target.trim().is_empty())
                .map(|target| format!("{}={}", target.trim(), suppressed_level)),
        );
        directives.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_filter_directives_default() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            suppressed_loggers: vec!["hyper".to_string(), "reqwest".to_string()],
            echo_output: true,
        };
        assert_eq!(config.filter_directives(), "debug,hyper=warn,reqwest=warn");
    }

    #[test]
    fn test_filter_directives_never_louder_than_global() {
        let config = LoggingConfig {
            level: LogLevel::Error,
            suppressed_loggers: vec!["hyper".to_string()],
            echo_output: true,
        };
        assert_eq!(config.filter_directives(), "error,hyper=error");
    }

    #[test]
    fn test_cli_level_wins_over_config() {
        let pipeline = PipelineConfig::parse(
            r#"
            log_level = "error"
            suppressed_loggers = []
            echo_output = false
            "#,
        )
        .unwrap();

        let config = LoggingConfig::resolve(Some(LogLevel::Trace), Some(&pipeline)).unwrap();
        assert_eq!(config.level, LogLevel::Trace);
        assert!(config.suppressed_loggers.is_empty());
        assert!(!config.echo_output);
    }

    #[test]
    #[serial]
    fn test_env_level_beats_config_but_not_flag() {
        let pipeline = PipelineConfig::parse(r#"log_level = "error""#).unwrap();
        env::set_var(constants::E2B_WRITER_LOG, "debug");

        let from_env = LoggingConfig::resolve(None, Some(&pipeline));
        let from_flag = LoggingConfig::resolve(Some(LogLevel::Warn), Some(&pipeline));
        env::remove_var(constants::E2B_WRITER_LOG);

        assert_eq!(from_env.unwrap().level, LogLevel::Debug);
        assert_eq!(from_flag.unwrap().level, LogLevel::Warn);
    }

    #[test]
    #[serial]
    fn test_invalid_env_level_is_rejected() {
        env::set_var(constants::E2B_WRITER_LOG, "shouty");

        let result = LoggingConfig::resolve(None, None);
        env::remove_var(constants::E2B_WRITER_LOG);

        assert!(matches!(result, Err(ConfigError::InvalidLogLevel(ref v)) if v == "shouty"));
    }

    #[test]
    #[serial]
    fn test_config_level_used_without_env_or_flag() {
        env::remove_var(constants::E2B_WRITER_LOG);
        let pipeline = PipelineConfig::parse(r#"log_level = "error""#).unwrap();

        let config = LoggingConfig::resolve(None, Some(&pipeline)).unwrap();
        assert_eq!(config.level, LogLevel::Error);

        let config = LoggingConfig::resolve(None, None).unwrap();
        assert_eq!(config.level, LogLevel::Info);
    }
}
