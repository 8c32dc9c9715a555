//! Repair configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! { "backup_extension": "orig", "migrate_side_files": false }
//! ```

use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding `.ldml` side files, relative to the document.
pub const DEFAULT_WS_STORE: &str = "WritingSystemStore";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepairConfig {
    /// Appended to the document name for the kept original.
    pub backup_extension: String,
    /// Appended to the document name for the change-log file.
    pub log_extension: String,
    /// Writing-system store; `<document dir>/WritingSystemStore` when unset.
    pub ws_store_dir: Option<PathBuf>,
    pub migrate_side_files: bool,
    /// Leave `<file>.tmp` behind when a run fails, for inspection.
    pub keep_temp_on_failure: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            backup_extension: "bak".to_string(),
            log_extension: "fixlog".to_string(),
            ws_store_dir: None,
            migrate_side_files: true,
            keep_temp_on_failure: false,
        }
    }
}

impl RepairConfig {
    pub fn backup_path(&self, document: &Path) -> PathBuf {
        with_suffix(document, &self.backup_extension)
    }

    pub fn log_path(&self, document: &Path) -> PathBuf {
        with_suffix(document, &self.log_extension)
    }

    pub fn temp_path(&self, document: &Path) -> PathBuf {
        with_suffix(document, "tmp")
    }

    pub fn ws_store_for(&self, document: &Path) -> PathBuf {
        match &self.ws_store_dir {
            Some(dir) => dir.clone(),
            None => document
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_WS_STORE),
        }
    }
}

/// Load a JSON config file. Missing keys take their defaults.
pub fn load_config(path: &Path) -> Result<RepairConfig, StorageError> {
    let text = fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StorageError::Config {
        path: path.to_path_buf(),
        source,
    })
}

/// `dir/name.ext` -> `dir/name.ext.suffix`; the existing extension is kept.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
