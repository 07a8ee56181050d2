// ABOUTME: Fixed diagnostic battery validating a fresh session end to end
// ABOUTME: Runs every check in order without short-circuiting and reports the aggregate

use crate::providers::Session;
use crate::runner::{Operation, OperationResult, OperationRunner};

const INTERPRETER_CHECK: &str = r#"print('Hello from e2b sandbox!')"#;

const DEPENDENCY_CHECK: &str = r#"
import subprocess, sys
subprocess.run([sys.executable, '-m', 'pip', 'install', '-q', 'pandas'], check=True)
import pandas as pd
df = pd.DataFrame({'name': ['Alice', 'Bob'], 'age': [25, 30]})
print(df)
print(f"\nDataFrame shape: {df.shape}")
"#;

const FILESYSTEM_CHECK: &str = r#"
with open('/tmp/test.txt', 'w') as f:
    f.write('Hello from e2b file system!')

with open('/tmp/test.txt', 'r') as f:
    content = f.read()
    print(f"File content: {content}")

assert content == 'Hello from e2b file system!', content
"#;

const LISTING_CHECK: &str = r#"
import os
files = os.listdir('/tmp')
print(f"Files in /tmp: {files}")
"#;

// Exercises the stderr path; the try/except keeps the operation successful.
const LOGGING_DEMO: &str = r#"
import logging, sys
logging.basicConfig(stream=sys.stderr, level=logging.INFO)
log = logging.getLogger('selftest')
log.warning('This is a synthetic warning from the sandbox')
try:
    raise RuntimeError('synthetic error for logging demonstration')
except RuntimeError as exc:
    log.error('Caught expected error: %s', exc)
print('Logging demonstration complete')
"#;

/// The battery in execution order, with positions filled in
pub fn battery() -> Vec<Operation> {
    let operations = vec![
        Operation::new("interpreter", INTERPRETER_CHECK)
            .with_description("Running simple Python code"),
        Operation::new("dependencies", DEPENDENCY_CHECK)
            .with_description("Installing and using pandas"),
        Operation::new("filesystem", FILESYSTEM_CHECK)
            .with_description("Creating and reading a file"),
        Operation::new("listing", LISTING_CHECK).with_description("Listing files in /tmp"),
        Operation::new("logging", LOGGING_DEMO)
            .with_description("Emitting a synthetic warning and error"),
    ];

    let total = operations.len();
    operations
        .into_iter()
        .enumerate()
        .map(|(i, op)| op.at(i + 1, total))
        .collect()
}

#[derive(Debug, Clone)]
pub struct SelfTestReport {
    pub results: Vec<OperationResult>,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(OperationResult::is_success)
    }
}

/// Run every battery operation; one failure does not stop the rest
pub async fn run_selftest(runner: &OperationRunner<'_>, session: &Session) -> SelfTestReport {
    let mut results = Vec::new();
    for operation in battery() {
        results.push(runner.run(session, &operation).await);
    }
    SelfTestReport { results }
}
