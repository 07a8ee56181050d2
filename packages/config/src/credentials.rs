// ABOUTME: Ordered credential provider chain for the execution-service API key
// ABOUTME: Each provider reports "not applicable" or a key; the first key found wins

use crate::constants;
use crate::error::{ConfigError, Result};
use crate::pipeline::PipelineConfig;
use std::env;
use std::fmt;
use tracing::debug;

/// A single place a credential may come from
pub trait CredentialProvider {
    fn name(&self) -> &'static str;

    /// `None` means this provider does not apply; empty values count as absent
    fn credential(&self) -> Option<String>;
}

/// Key supplied by the pipeline config file's `[credentials]` table
pub struct PipelineCredentialProvider {
    api_key: Option<String>,
}

impl PipelineCredentialProvider {
    pub fn new(pipeline: Option<&PipelineConfig>) -> Self {
        Self {
            api_key: pipeline.and_then(|p| p.credentials.e2b_api_key.clone()),
        }
    }
}

impl CredentialProvider for PipelineCredentialProvider {
    fn name(&self) -> &'static str {
        "pipeline config"
    }

    fn credential(&self) -> Option<String> {
        non_empty(self.api_key.clone())
    }
}

/// Key read from an environment variable
pub struct EnvCredentialProvider {
    var: &'static str,
}

impl EnvCredentialProvider {
    pub fn new(var: &'static str) -> Self {
        Self { var }
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new(constants::E2B_API_KEY)
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn name(&self) -> &'static str {
        self.var
    }

    fn credential(&self) -> Option<String> {
        non_empty(env::var(self.var).ok())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }

    /// Pipeline config first, then `E2B_API_KEY`
    pub fn standard(pipeline: Option<&PipelineConfig>) -> Self {
        Self::new(vec![
            Box::new(PipelineCredentialProvider::new(pipeline)),
            Box::new(EnvCredentialProvider::default()),
        ])
    }

    pub fn resolve(&self) -> Result<ResolvedCredential> {
        for provider in &self.providers {
            match provider.credential() {
                Some(secret) => {
                    debug!("Resolved E2B API key from {}", provider.name());
                    return Ok(ResolvedCredential {
                        secret,
                        source: provider.name(),
                    });
                }
                None => debug!("No E2B API key from {}", provider.name()),
            }
        }

        Err(ConfigError::MissingCredential {
            tried: self.providers.iter().map(|p| p.name()).collect(),
        })
    }
}

#[derive(Clone)]
pub struct ResolvedCredential {
    secret: String,
    source: &'static str,
}

impl ResolvedCredential {
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn masked(&self) -> String {
        mask_secret(&self.secret)
    }

    /// Make the key visible to the session client as `E2B_API_KEY`,
    /// whichever provider it came from.
    pub fn export_to_env(&self) {
        env::set_var(constants::E2B_API_KEY, &self.secret);
    }
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("secret", &self.masked())
            .field("source", &self.source)
            .finish()
    }
}

/// First 8 characters followed by `...`, or `***` for short secrets
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() > 8 {
        let prefix: String = secret.chars().take(8).collect();
        format!("{}...", prefix)
    } else {
        "***".to_string()
    }
}
