// ABOUTME: Error types for configuration loading and credential resolution
// ABOUTME: Separates fatal load errors from a missing credential so callers can pick exit codes

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid table entry: {0}")]
    InvalidTable(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid run mode: {0}")]
    InvalidMode(String),

    #[error("No E2B API key found (checked: {})", .tried.join(", "))]
    MissingCredential { tried: Vec<&'static str> },
}

impl ConfigError {
    /// True when the configuration itself could not be loaded, as opposed to
    /// a well-formed configuration that simply lacks a credential.
    pub fn is_load_failure(&self) -> bool {
        !matches!(self, ConfigError::MissingCredential { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
