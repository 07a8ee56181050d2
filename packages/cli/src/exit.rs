// ABOUTME: Process exit status for a run
// ABOUTME: 0 when every operation passed, 1 on run failure, 2 on fatal configuration errors

use std::process::ExitCode;
use writer_config::ConfigError;
use writer_sandbox::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Success,
    /// Acquisition, workflow or credential failure
    Failure,
    /// Config file or logging setup could not be loaded
    ConfigFatal,
}

impl RunExit {
    pub fn code(self) -> u8 {
        match self {
            RunExit::Success => 0,
            RunExit::Failure => 1,
            RunExit::ConfigFatal => 2,
        }
    }

    pub fn from_report(report: &RunReport) -> Self {
        if report.success {
            RunExit::Success
        } else {
            RunExit::Failure
        }
    }
}

impl From<&ConfigError> for RunExit {
    fn from(err: &ConfigError) -> Self {
        if err.is_load_failure() {
            RunExit::ConfigFatal
        } else {
            RunExit::Failure
        }
    }
}

impl From<RunExit> for ExitCode {
    fn from(exit: RunExit) -> Self {
        ExitCode::from(exit.code())
    }
}
