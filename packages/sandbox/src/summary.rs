// ABOUTME: Aggregate run summary computed once from a finished set of operation results
// ABOUTME: Counts passes and failures, totals elapsed time and logs the per-operation table

use crate::runner::{OperationFailure, OperationResult};
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub name: String,
    pub index: usize,
    pub success: bool,
    pub elapsed: Duration,
    pub failure: Option<OperationFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub outcomes: Vec<OperationRecord>,
}

impl RunSummary {
    pub fn from_results(results: &[OperationResult]) -> Self {
        let outcomes: Vec<OperationRecord> = results
            .iter()
            .map(|r| OperationRecord {
                name: r.name.clone(),
                index: r.index,
                success: r.is_success(),
                elapsed: r.elapsed,
                failure: r.failure().cloned(),
            })
            .collect();

        let passed = outcomes.iter().filter(|o| o.success).count();

        Self {
            total: outcomes.len(),
            passed,
            failed: outcomes.len() - passed,
            elapsed: outcomes.iter().map(|o| o.elapsed).sum(),
            outcomes,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn log(&self) {
        for outcome in &self.outcomes {
            match &outcome.failure {
                None => info!("  PASS {:>2}. {} ({:.2?})", outcome.index, outcome.name, outcome.elapsed),
                Some(failure) => error!(
                    "  FAIL {:>2}. {} ({:.2?}) {}: {}",
                    outcome.index, outcome.name, outcome.elapsed, failure.kind, failure.message
                ),
            }
        }
        info!(
            "{} operations: {} passed, {} failed, {:.2?} total",
            self.total, self.passed, self.failed, self.elapsed
        );
    }
}
