// ABOUTME: CLI flow from parsed arguments to a process exit status
// ABOUTME: Loads config, installs logging, resolves the E2B key and drives one orchestrated run

use crate::args::Args;
use crate::exit::RunExit;
use crate::logging::init_logging;
use std::sync::Arc;
use tracing::{error, info};
use writer_config::constants::DEFAULT_STAGING_DIR;
use writer_config::{CredentialChain, LoggingConfig, PipelineConfig, RunMode};
use writer_sandbox::{E2BProvider, Orchestrator, SessionProvider, Workflow};

/// Settings for one run, merged from flags, environment and the config file
#[derive(Debug)]
pub struct Invocation {
    pub mode: RunMode,
    pub logging: LoggingConfig,
    pub pipeline: Option<PipelineConfig>,
}

impl Invocation {
    pub fn from_args(args: &Args) -> writer_config::Result<Self> {
        let pipeline = PipelineConfig::locate(args.config.as_deref())?;

        let mut logging = LoggingConfig::resolve(args.log_level, pipeline.as_ref())?;
        if args.no_echo {
            logging.echo_output = false;
        }

        Ok(Self {
            mode: RunMode::resolve(args.mode, pipeline.as_ref()),
            logging,
            pipeline,
        })
    }

    pub fn workflow(&self) -> Workflow {
        match self.mode {
            RunMode::SelfTest => Workflow::SelfTest,
            RunMode::Transfer => Workflow::Transfer {
                tables: self
                    .pipeline
                    .as_ref()
                    .map(PipelineConfig::tables)
                    .unwrap_or_default(),
                staging_dir: self
                    .pipeline
                    .as_ref()
                    .map_or(DEFAULT_STAGING_DIR, PipelineConfig::staging_dir)
                    .to_string(),
            },
        }
    }
}

pub async fn run(args: Args) -> RunExit {
    dotenvy::dotenv().ok();

    let invocation = match Invocation::from_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}", e);
            return RunExit::from(&e);
        }
    };

    if let Err(e) = init_logging(&invocation.logging) {
        eprintln!("Error: {:#}", e);
        return RunExit::ConfigFatal;
    }

    info!(
        "e2b-writer {} starting in {} mode",
        env!("CARGO_PKG_VERSION"),
        invocation.mode
    );

    let provider = match connect(invocation.pipeline.as_ref()) {
        Ok(provider) => provider,
        Err(exit) => return exit,
    };

    execute(invocation, Arc::new(provider)).await
}

/// Resolve the API key, publish it as `E2B_API_KEY` and build the E2B client from the environment
pub fn connect(pipeline: Option<&PipelineConfig>) -> Result<E2BProvider, RunExit> {
    let credential = CredentialChain::standard(pipeline).resolve().map_err(|e| {
        error!("{}", e);
        RunExit::from(&e)
    })?;

    info!(
        "Using E2B API key {} from {}",
        credential.masked(),
        credential.source()
    );
    credential.export_to_env();

    let provider = E2BProvider::from_env().map_err(|e| {
        error!("Failed to configure E2B client: {}", e);
        RunExit::Failure
    })?;
    info!("Sandbox template: {}", provider.template());

    Ok(provider)
}

pub async fn execute(invocation: Invocation, provider: Arc<dyn SessionProvider>) -> RunExit {
    let workflow = invocation.workflow();
    let report = Orchestrator::new(provider, invocation.logging)
        .run(workflow)
        .await;

    let exit = RunExit::from_report(&report);
    match exit {
        RunExit::Success => info!("Run {} passed", report.run_id),
        _ => error!("Run {} failed", report.run_id),
    }
    exit
}
