// ABOUTME: Installs the global tracing subscriber from the resolved logging config
// ABOUTME: Level and suppressed loggers become EnvFilter directives

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;
use writer_config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let directives = config.filter_directives();
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter '{}'", directives))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}
