// ABOUTME: Command-line arguments for the e2b-writer binary
// ABOUTME: Flags override the pipeline config file and environment

use clap::Parser;
use std::path::PathBuf;
use writer_config::{LogLevel, RunMode};

#[derive(Parser, Debug, Default)]
#[command(name = "e2b-writer")]
#[command(about = "Run the sandbox self-test or transfer tables into a fresh E2B sandbox")]
#[command(version)]
pub struct Args {
    /// Pipeline config file (defaults to $E2B_WRITER_CONFIG)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Workflow to run: selftest or transfer
    #[arg(long, value_name = "MODE")]
    pub mode: Option<RunMode>,

    /// Log verbosity: trace, debug, info, warn or error
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[arg(long, help = "Do not log captured stdout of each operation")]
    pub no_echo: bool,
}
