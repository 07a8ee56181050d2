// ABOUTME: Configuration layer for e2b-writer
// ABOUTME: Pipeline config file, credential provider chain, table descriptors and logging settings

pub mod constants;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod tables;

pub use credentials::{
    mask_secret, CredentialChain, CredentialProvider, EnvCredentialProvider,
    PipelineCredentialProvider, ResolvedCredential,
};
pub use error::{ConfigError, Result};
pub use logging::{LogLevel, LoggingConfig};
pub use pipeline::{PipelineConfig, RunMode};
pub use tables::TableDescriptor;
