// ABOUTME: Remote sandbox session orchestration for e2b-writer
// ABOUTME: Provider contract, operation runner, self-test battery, table transfer and the session orchestrator

pub mod orchestrator;
pub mod providers;
pub mod runner;
pub mod selftest;
pub mod summary;
pub mod transfer;

pub use orchestrator::{Orchestrator, OrchestratorError, OrchestratorState, RunReport, Workflow};
pub use providers::{
    CodeExecution, E2BProvider, Provider as SessionProvider, ProviderError, Session, SessionState,
};
pub use runner::{
    Operation, OperationFailure, OperationOutcome, OperationResult, OperationRunner,
};
pub use selftest::{battery, run_selftest, SelfTestReport};
pub use summary::{OperationRecord, RunSummary};
pub use transfer::{TablePipeline, TransferError, TransferReport, TransferredTable};
