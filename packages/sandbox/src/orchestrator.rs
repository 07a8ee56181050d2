// ABOUTME: Session orchestrator acquiring a session, driving one workflow and always draining it
// ABOUTME: Tracks the run state machine and folds workflow, acquisition and teardown outcomes into a report

use crate::providers::{Provider, ProviderError, Session};
use crate::runner::OperationRunner;
use crate::selftest::run_selftest;
use crate::summary::RunSummary;
use crate::transfer::{TablePipeline, TransferError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;
use writer_config::{LoggingConfig, TableDescriptor};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Session acquisition failed: {0}")]
    Acquisition(#[source] ProviderError),

    #[error("Workflow aborted unexpectedly: {0}")]
    WorkflowPanicked(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::Acquisition(_) => "session_acquisition_error",
            OrchestratorError::WorkflowPanicked(_) => "workflow_panic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    SessionAcquiring,
    SessionActive,
    Draining,
    Terminated,
    Failed,
}

/// What to do once the session is up
#[derive(Debug, Clone)]
pub enum Workflow {
    SelfTest,
    Transfer {
        tables: Vec<TableDescriptor>,
        staging_dir: String,
    },
}

impl Workflow {
    pub fn name(&self) -> &'static str {
        match self {
            Workflow::SelfTest => "selftest",
            Workflow::Transfer { .. } => "transfer",
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub session_id: Option<String>,
    pub acquisition_time: Option<Duration>,
    pub summary: Option<RunSummary>,
    /// Acquisition failure or an aborted workflow
    pub error: Option<OrchestratorError>,
    pub transfer_error: Option<TransferError>,
    /// Logged only; never affects `success`
    pub teardown_error: Option<ProviderError>,
    /// Every state visited, starting with `Idle`
    pub states: Vec<OrchestratorState>,
    pub success: bool,
}

impl RunReport {
    pub fn final_state(&self) -> OrchestratorState {
        self.states
            .last()
            .copied()
            .unwrap_or(OrchestratorState::Idle)
    }
}

struct WorkflowOutcome {
    success: bool,
    summary: RunSummary,
    transfer_error: Option<TransferError>,
}

/// Drives exactly one run. Consumed by `run`, so a session can only be
/// acquired and drained once per orchestrator.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    logging: LoggingConfig,
    states: Vec<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, logging: LoggingConfig) -> Self {
        Self {
            provider,
            logging,
            states: vec![OrchestratorState::Idle],
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.states
            .last()
            .copied()
            .unwrap_or(OrchestratorState::Idle)
    }

    fn transition(&mut self, next: OrchestratorState) {
        debug!("Orchestrator: {:?} -> {:?}", self.state(), next);
        self.states.push(next);
    }

    pub async fn run(self, workflow: Workflow) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, workflow = workflow.name());
        self.run_inner(run_id, workflow).instrument(span).await
    }

    async fn run_inner(mut self, run_id: Uuid, workflow: Workflow) -> RunReport {
        debug!("Log filter: {}", self.logging.filter_directives());

        self.transition(OrchestratorState::SessionAcquiring);
        info!("Creating sandbox...");
        let clock = Instant::now();
        let mut session = match self.provider.create_session().await {
            Ok(session) => session,
            Err(err) => {
                error!(
                    "Failed to create sandbox after {:.2?} ({}): {}",
                    clock.elapsed(),
                    err.kind(),
                    err
                );
                self.transition(OrchestratorState::Failed);
                return RunReport {
                    run_id,
                    session_id: None,
                    acquisition_time: None,
                    summary: None,
                    error: Some(OrchestratorError::Acquisition(err)),
                    transfer_error: None,
                    teardown_error: None,
                    states: self.states,
                    success: false,
                };
            }
        };
        let acquisition_time = clock.elapsed();
        session.activate();
        self.transition(OrchestratorState::SessionActive);
        info!(
            "Sandbox created: {} in {:.2?}",
            session.id(),
            acquisition_time
        );

        let outcome = AssertUnwindSafe(self.drive(&session, &workflow))
            .catch_unwind()
            .await;

        let (success, summary, transfer_error, error) = match outcome {
            Ok(outcome) => {
                outcome.summary.log();
                if let Some(err) = &outcome.transfer_error {
                    error!("Transfer stopped at table '{}' ({}): {}", err.table(), err.kind(), err);
                }
                (
                    outcome.success,
                    Some(outcome.summary),
                    outcome.transfer_error,
                    None,
                )
            }
            Err(payload) => {
                let err = OrchestratorError::WorkflowPanicked(panic_message(payload.as_ref()));
                error!("{} ({})", err, err.kind());
                self.transition(OrchestratorState::Failed);
                (false, None, None, Some(err))
            }
        };

        let teardown_error = self.drain(&mut session).await;

        RunReport {
            run_id,
            session_id: Some(session.id().to_string()),
            acquisition_time: Some(acquisition_time),
            summary,
            error,
            transfer_error,
            teardown_error,
            states: self.states,
            success,
        }
    }

    async fn drive(&self, session: &Session, workflow: &Workflow) -> WorkflowOutcome {
        let runner = OperationRunner::new(self.provider.as_ref()).echo_output(self.logging.echo_output);

        match workflow {
            Workflow::SelfTest => {
                let report = run_selftest(&runner, session).await;
                WorkflowOutcome {
                    success: report.passed(),
                    summary: RunSummary::from_results(&report.results),
                    transfer_error: None,
                }
            }
            Workflow::Transfer {
                tables,
                staging_dir,
            } => {
                let pipeline = TablePipeline::new(&runner, staging_dir.as_str());
                let report = pipeline.transfer(session, tables).await;
                for table in &report.transferred {
                    info!(
                        "Table '{}' written to {} ({} bytes)",
                        table.name, table.remote_path, table.bytes
                    );
                }
                WorkflowOutcome {
                    success: report.succeeded(),
                    summary: RunSummary::from_results(&report.results),
                    transfer_error: report.error,
                }
            }
        }
    }

    /// Single teardown call; a failure here is a warning only
    async fn drain(&mut self, session: &mut Session) -> Option<ProviderError> {
        self.transition(OrchestratorState::Draining);
        info!("Cleaning up sandbox {}...", session.id());

        let result = self.provider.terminate_session(session).await;
        session.mark_terminated();
        self.transition(OrchestratorState::Terminated);

        match result {
            Ok(()) => {
                info!("Sandbox terminated");
                None
            }
            Err(err) => {
                warn!(
                    "Failed to terminate sandbox {} ({}): {}",
                    session.id(),
                    err.kind(),
                    err
                );
                Some(err)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");

        let boxed: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn test_error_kind_labels() {
        let err = OrchestratorError::Acquisition(ProviderError::NetworkError("refused".into()));
        assert_eq!(err.kind(), "session_acquisition_error");
        assert_eq!(
            err.to_string(),
            "Session acquisition failed: Network error: refused"
        );
        assert_eq!(
            OrchestratorError::WorkflowPanicked("x".into()).kind(),
            "workflow_panic"
        );
    }

    #[test]
    fn test_workflow_names() {
        assert_eq!(Workflow::SelfTest.name(), "selftest");
        let transfer = Workflow::Transfer {
            tables: vec![],
            staging_dir: "/tmp".to_string(),
        };
        assert_eq!(transfer.name(), "transfer");
    }
}
