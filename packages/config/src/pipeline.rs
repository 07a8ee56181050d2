// ABOUTME: Pipeline configuration file model loaded from TOML
// ABOUTME: Supplies run mode, log settings, an optional credential and the input table list

use crate::constants;
use crate::error::{ConfigError, Result};
use crate::tables::{resolve_tables, TableEntry};
use crate::TableDescriptor;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Which workflow a run drives once the session is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[serde(alias = "self-test")]
    SelfTest,
    Transfer,
}

impl RunMode {
    /// Flag beats config file; self-test is the standalone default.
    pub fn resolve(cli: Option<RunMode>, pipeline: Option<&PipelineConfig>) -> RunMode {
        cli.or_else(|| pipeline.and_then(|p| p.mode))
            .unwrap_or(RunMode::SelfTest)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::SelfTest => "selftest",
            RunMode::Transfer => "transfer",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "selftest" | "self-test" => Ok(RunMode::SelfTest),
            "transfer" => Ok(RunMode::Transfer),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsSection {
    #[serde(default)]
    pub e2b_api_key: Option<String>,
}

/// Parsed pipeline config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub mode: Option<RunMode>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub suppressed_loggers: Option<Vec<String>>,
    #[serde(default)]
    pub echo_output: Option<bool>,
    #[serde(default)]
    pub staging_dir: Option<String>,
    #[serde(default)]
    pub credentials: CredentialsSection,
    #[serde(default)]
    pub tables: Vec<TableEntry>,

    /// Directory relative table paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

impl PipelineConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&raw).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        debug!(
            "Loaded pipeline config from {} ({} tables)",
            path.display(),
            config.tables.len()
        );

        Ok(config)
    }

    /// Parse config text; relative table paths resolve against the current directory
    pub fn parse(raw: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Find the config file from the CLI flag or `E2B_WRITER_CONFIG`.
    /// Returns `Ok(None)` when neither names a file.
    pub fn locate(cli_path: Option<&Path>) -> Result<Option<Self>> {
        let path = match cli_path {
            Some(path) => Some(path.to_path_buf()),
            None => env::var(constants::E2B_WRITER_CONFIG)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        };

        path.map(|p| Self::load(&p)).transpose()
    }

    fn validate(&self) -> Result<()> {
        if let Some(level) = &self.log_level {
            crate::logging::LogLevel::from_str(level)?;
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.tables {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::InvalidTable(format!(
                    "table with path '{}' has an empty name",
                    entry.path.display()
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::InvalidTable(format!(
                    "duplicate table name '{}'",
                    entry.name
                )));
            }
        }

        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve configured tables into descriptors, in file order
    pub fn tables(&self) -> Vec<TableDescriptor> {
        resolve_tables(&self.tables, &self.base_dir)
    }

    pub fn staging_dir(&self) -> &str {
        self.staging_dir
            .as_deref()
            .unwrap_or(constants::DEFAULT_STAGING_DIR)
    }
}
