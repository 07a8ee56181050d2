// ABOUTME: Sequential transfer of local tables into the session filesystem
// ABOUTME: Writes each table to the staging directory, reads back its size and stops at the first failure

use crate::providers::Session;
use crate::runner::{
    Operation, OperationFailure, OperationOutcome, OperationResult, OperationRunner,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};
use writer_config::TableDescriptor;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Local file for table '{table}' not found: {}", .path.display())]
    MissingLocalFile { table: String, path: PathBuf },

    #[error("Failed to read local file for table '{table}' at {}: {source}", .path.display())]
    Read {
        table: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote write of table '{table}' failed ({kind}): {message}")]
    Remote {
        table: String,
        kind: String,
        message: String,
    },

    #[error("Remote size check for table '{table}' failed: {detail}")]
    Verification { table: String, detail: String },

    #[error("Tables '{first}' and '{table}' would both be written to {remote_path}")]
    DuplicateDestination {
        table: String,
        first: String,
        remote_path: String,
    },
}

impl TransferError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::MissingLocalFile { .. } | TransferError::DuplicateDestination { .. } => {
                "transfer_precondition"
            }
            TransferError::Read { .. } => "local_read_error",
            TransferError::Remote { .. } => "remote_write_error",
            TransferError::Verification { .. } => "verification_error",
        }
    }

    pub fn table(&self) -> &str {
        match self {
            TransferError::MissingLocalFile { table, .. }
            | TransferError::Read { table, .. }
            | TransferError::Remote { table, .. }
            | TransferError::Verification { table, .. }
            | TransferError::DuplicateDestination { table, .. } => table,
        }
    }

    fn to_failure(&self) -> OperationFailure {
        OperationFailure::new(self.kind(), self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferredTable {
    pub name: String,
    pub remote_path: String,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct TransferReport {
    /// One result per attempted table, in order
    pub results: Vec<OperationResult>,
    pub transferred: Vec<TransferredTable>,
    /// The failure that stopped the pipeline, if any
    pub error: Option<TransferError>,
}

impl TransferReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Remote file name for a table: unsafe characters become `_`, and the local
/// file's extension (default `csv`) is appended unless the name already ends
/// in an alphanumeric extension.
pub fn remote_file_name(table: &TableDescriptor) -> String {
    let mut name: String = table
        .name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    name = name.trim_start_matches('.').to_string();
    if name.is_empty() {
        name = "table".to_string();
    }

    if !has_extension(&name) {
        let ext = table
            .path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("csv");
        name = format!("{}.{}", name, ext);
    }

    name
}

fn has_extension(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// First pair of tables whose remote paths collide, as (earlier, later, path)
fn find_duplicate_destination<'t>(
    staging_dir: &str,
    tables: &'t [TableDescriptor],
) -> Option<(&'t TableDescriptor, usize, String)> {
    let mut seen: HashMap<String, &TableDescriptor> = HashMap::new();
    for (i, table) in tables.iter().enumerate() {
        let destination = remote_path(staging_dir, table);
        if let Some(first) = seen.get(&destination) {
            return Some((*first, i, destination));
        }
        seen.insert(destination, table);
    }
    None
}

pub fn remote_path(staging_dir: &str, table: &TableDescriptor) -> String {
    format!(
        "{}/{}",
        staging_dir.trim_end_matches('/'),
        remote_file_name(table)
    )
}

/// Python that writes `content` to `path` (overwriting) and prints the resulting size
pub fn write_and_verify_code(path: &str, content: &[u8]) -> String {
    // A JSON string literal is also a valid Python string literal.
    let path_literal = serde_json::Value::String(path.to_string()).to_string();
    format!(
        "import base64, os\n\
         _path = {path}\n\
         os.makedirs(os.path.dirname(_path) or '.', exist_ok=True)\n\
         with open(_path, 'wb') as _f:\n    _f.write(base64.b64decode('{payload}'))\n\
         print(os.path.getsize(_path))\n",
        path = path_literal,
        payload = STANDARD.encode(content),
    )
}

fn parse_reported_size(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse().ok())
}

pub struct TablePipeline<'r, 'p> {
    runner: &'r OperationRunner<'p>,
    staging_dir: String,
}

impl<'r, 'p> TablePipeline<'r, 'p> {
    pub fn new(runner: &'r OperationRunner<'p>, staging_dir: impl Into<String>) -> Self {
        Self {
            runner,
            staging_dir: staging_dir.into(),
        }
    }

    /// Transfer tables strictly in order. The first failure of any kind
    /// stops the pipeline; later tables are not even checked for existence.
    /// Tables that would share a remote file are rejected before anything is written.
    pub async fn transfer(&self, session: &Session, tables: &[TableDescriptor]) -> TransferReport {
        let mut report = TransferReport {
            results: Vec::new(),
            transferred: Vec::new(),
            error: None,
        };

        if tables.is_empty() {
            info!("No tables configured; nothing to transfer");
            return report;
        }

        let total = tables.len();

        if let Some((first, i, remote_path)) = find_duplicate_destination(&self.staging_dir, tables) {
            let err = TransferError::DuplicateDestination {
                table: tables[i].name.clone(),
                first: first.name.clone(),
                remote_path,
            };
            let placeholder =
                Operation::new(format!("transfer {}", tables[i].name), "").at(i + 1, total);
            error!("[{}/{}] {}", i + 1, total, err);
            report
                .results
                .push(OperationResult::failed_locally(&placeholder, err.to_failure()));
            report.error = Some(err);
            return report;
        }

        for (i, table) in tables.iter().enumerate() {
            let destination = remote_path(&self.staging_dir, table);
            let operation_name = format!("transfer {}", table.name);

            let content = match read_table(table).await {
                Ok(content) => content,
                Err(err) => {
                    let placeholder = Operation::new(operation_name, "").at(i + 1, total);
                    error!("[{}/{}] {}", i + 1, total, err);
                    report
                        .results
                        .push(OperationResult::failed_locally(&placeholder, err.to_failure()));
                    report.error = Some(err);
                    break;
                }
            };

            info!(
                "Transferring table '{}' ({} bytes, {} columns) to {}",
                table.name,
                content.len(),
                table.columns.len(),
                destination
            );

            let operation = Operation::new(
                operation_name,
                write_and_verify_code(&destination, &content),
            )
            .with_description(format!("{} -> {}", table.path.display(), destination))
            .at(i + 1, total);

            let mut result = self.runner.run(session, &operation).await;

            let outcome = match result.failure() {
                Some(failure) => Err(TransferError::Remote {
                    table: table.name.clone(),
                    kind: failure.kind.clone(),
                    message: failure.message.clone(),
                }),
                None => verify_size(table, &content, result.stdout()),
            };

            match outcome {
                Ok(bytes) => {
                    report.results.push(result);
                    report.transferred.push(TransferredTable {
                        name: table.name.clone(),
                        remote_path: destination,
                        bytes,
                    });
                }
                Err(err) => {
                    if result.is_success() {
                        error!("[{}/{}] {}", i + 1, total, err);
                        result.outcome = OperationOutcome::Failed(err.to_failure());
                    }
                    report.results.push(result);
                    report.error = Some(err);
                    break;
                }
            }
        }

        report
    }
}

async fn read_table(table: &TableDescriptor) -> Result<Vec<u8>, TransferError> {
    match tokio::fs::read(&table.path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(TransferError::MissingLocalFile {
            table: table.name.clone(),
            path: table.path.clone(),
        }),
        Err(source) => Err(TransferError::Read {
            table: table.name.clone(),
            path: table.path.clone(),
            source,
        }),
    }
}

fn verify_size(table: &TableDescriptor, content: &[u8], stdout: &str) -> Result<u64, TransferError> {
    let expected = content.len() as u64;
    match parse_reported_size(stdout) {
        Some(actual) if actual == expected => Ok(actual),
        Some(actual) => Err(TransferError::Verification {
            table: table.name.clone(),
            detail: format!("expected {} bytes, remote file has {}", expected, actual),
        }),
        None => Err(TransferError::Verification {
            table: table.name.clone(),
            detail: format!("could not read a size from output {:?}", stdout.trim()),
        }),
    }
}
