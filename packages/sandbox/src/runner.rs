// ABOUTME: Operation runner executing one named unit of code in a session
// ABOUTME: Times the remote call, captures output and classifies the outcome into a structured result

use crate::providers::{Provider, ProviderError, Session};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A named unit of remote work
#[derive(Debug, Clone)]
pub struct Operation {
    pub name: String,
    /// 1-based position within its battery or pipeline
    pub index: usize,
    pub total: usize,
    pub code: String,
    pub description: Option<String>,
}

impl Operation {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 1,
            total: 1,
            code: code.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn at(mut self, index: usize, total: usize) -> Self {
        self.index = index;
        self.total = total;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Error type label, e.g. `execution_error` or `transfer_precondition`
    pub kind: String,
    pub message: String,
    /// Remote traceback when the code itself raised
    pub traceback: Option<String>,
    /// Stdout produced before the failure
    pub partial_stdout: String,
}

impl OperationFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            traceback: None,
            partial_stdout: String::new(),
        }
    }
}

impl From<&ProviderError> for OperationFailure {
    fn from(err: &ProviderError) -> Self {
        let mut failure = Self::new(err.kind(), err.to_string());
        if let ProviderError::ExecutionError {
            traceback, stdout, ..
        } = err
        {
            failure.traceback = Some(traceback.clone()).filter(|t| !t.trim().is_empty());
            failure.partial_stdout = stdout.clone();
        }
        failure
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Succeeded { stdout: String },
    Failed(OperationFailure),
}

#[derive(Debug, Clone)]
pub struct OperationResult {
    pub name: String,
    pub index: usize,
    pub total: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Captured even on success; never decides the outcome on its own
    pub stderr: String,
    pub outcome: OperationOutcome,
}

impl OperationResult {
    /// A failure recorded without contacting the backend
    pub fn failed_locally(operation: &Operation, failure: OperationFailure) -> Self {
        Self {
            name: operation.name.clone(),
            index: operation.index,
            total: operation.total,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            stderr: String::new(),
            outcome: OperationOutcome::Failed(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, OperationOutcome::Succeeded { .. })
    }

    /// Captured stdout; for failed operations, whatever was streamed before the failure
    pub fn stdout(&self) -> &str {
        match &self.outcome {
            OperationOutcome::Succeeded { stdout } => stdout,
            OperationOutcome::Failed(failure) => &failure.partial_stdout,
        }
    }

    pub fn failure(&self) -> Option<&OperationFailure> {
        match &self.outcome {
            OperationOutcome::Succeeded { .. } => None,
            OperationOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Runs operations one at a time against a borrowed session
pub struct OperationRunner<'a> {
    provider: &'a dyn Provider,
    echo_output: bool,
}

impl<'a> OperationRunner<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            echo_output: true,
        }
    }

    pub fn echo_output(mut self, echo: bool) -> Self {
        self.echo_output = echo;
        self
    }

    /// Run one operation. Never retries and never errors: remote failures
    /// come back as a failed `OperationResult`.
    pub async fn run(&self, session: &Session, operation: &Operation) -> OperationResult {
        info!(
            "[{}/{}] {}",
            operation.index, operation.total, operation.name
        );
        if let Some(description) = &operation.description {
            info!("  {}", description);
        }

        if !session.is_active() {
            let result = OperationResult::failed_locally(
                operation,
                OperationFailure::new(
                    "inactive_session",
                    format!("session {} is {:?}", session.id(), session.state()),
                ),
            );
            self.log_result(&result);
            return result;
        }

        if operation.code.trim().is_empty() {
            let result = OperationResult::failed_locally(
                operation,
                OperationFailure::new("invalid_operation", "empty code payload"),
            );
            self.log_result(&result);
            return result;
        }

        let started_at = Utc::now();
        let clock = Instant::now();
        let call = self.provider.run_code(session, &operation.code).await;
        let elapsed = clock.elapsed();

        let result = match call {
            Ok(execution) => OperationResult {
                name: operation.name.clone(),
                index: operation.index,
                total: operation.total,
                started_at,
                elapsed,
                stderr: execution.stderr,
                outcome: OperationOutcome::Succeeded {
                    stdout: execution.stdout,
                },
            },
            Err(err) => OperationResult {
                name: operation.name.clone(),
                index: operation.index,
                total: operation.total,
                started_at,
                elapsed,
                stderr: match &err {
                    ProviderError::ExecutionError { stderr, .. } => stderr.clone(),
                    _ => String::new(),
                },
                outcome: OperationOutcome::Failed(OperationFailure::from(&err)),
            },
        };

        self.log_result(&result);
        result
    }

    fn log_result(&self, result: &OperationResult) {
        match &result.outcome {
            OperationOutcome::Succeeded { stdout } => {
                if self.echo_output && !stdout.trim().is_empty() {
                    for line in stdout.trim_end().lines() {
                        info!("  | {}", line);
                    }
                }
                if !result.stderr.trim().is_empty() {
                    warn!(
                        "[{}/{}] {} wrote to stderr: {}",
                        result.index,
                        result.total,
                        result.name,
                        result.stderr.trim_end()
                    );
                }
                info!(
                    "[{}/{}] {} succeeded in {:.2?}",
                    result.index, result.total, result.name, result.elapsed
                );
            }
            OperationOutcome::Failed(failure) => {
                if self.echo_output && !failure.partial_stdout.trim().is_empty() {
                    for line in failure.partial_stdout.trim_end().lines() {
                        info!("  | {}", line);
                    }
                }
                if !result.stderr.trim().is_empty() {
                    warn!("  stderr: {}", result.stderr.trim_end());
                }
                if let Some(traceback) = &failure.traceback {
                    error!("  {}", traceback.trim_end());
                }
                error!(
                    "[{}/{}] {} failed after {:.2?} ({}): {}",
                    result.index,
                    result.total,
                    result.name,
                    result.elapsed,
                    failure.kind,
                    failure.message
                );
            }
        }
    }
}
