// ABOUTME: Input table metadata and local path resolution
// ABOUTME: Turns configured table entries into read-only descriptors for the transfer pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A `[[tables]]` entry as written in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// One input dataset to transfer into the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Logical name, also used to derive the remote destination file
    pub name: String,
    pub path: PathBuf,
    pub columns: Vec<String>,
    /// Size on disk at resolution time; `None` if the file was absent
    pub size_bytes: Option<u64>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size_bytes = std::fs::metadata(&path).ok().map(|m| m.len());
        Self {
            name: name.into(),
            path,
            columns: Vec::new(),
            size_bytes,
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

pub(crate) fn resolve_tables(entries: &[TableEntry], base_dir: &Path) -> Vec<TableDescriptor> {
    entries
        .iter()
        .map(|entry| {
            let path = if entry.path.is_absolute() {
                entry.path.clone()
            } else {
                base_dir.join(&entry.path)
            };
            TableDescriptor::new(entry.name.clone(), path).with_columns(entry.columns.clone())
        })
        .collect()
}
