//! Mendgraph file-level repair
//!
//! Wraps the two-pass engine with everything a repair of a document on disk
//! involves:
//!
//! ```text
//!   sena.fwdata ──pass 1──┐
//!   sena.fwdata ──pass 2──┼──► sena.fwdata.tmp ──flush──┐
//!                         │                             ▼
//!                         │    sena.fwdata ──rename──► sena.fwdata.bak
//!                         │    sena.fwdata.tmp ─rename─► sena.fwdata
//!                         ├──► sena.fwdata.fixlog   (only if something changed)
//!                         └──► WritingSystemStore/<old>.ldml ─► <new>.ldml
//! ```
//!
//! The original document is only renamed once the replacement is completely
//! written, so a failed or interrupted run leaves it untouched.

pub mod config;
pub mod ldml;


pub use config::{load_config, RepairConfig};
pub use ldml::{migrate_ldml, LdmlMigration, MigrationOutcome};

use chrono::{DateTime, Utc};
use mendgraph_engine::{scan, ChangeLog, Pipeline, PipelineError, ProgressReporter, RunReport, ScanReport};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RepairOutcome {
    pub document: PathBuf,
    pub report: RunReport,
    pub log: ChangeLog,
    /// The kept original; `None` when the document was left untouched.
    pub backup: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub migrations: Vec<LdmlMigration>,
    pub completed_at: DateTime<Utc>,
}

impl RepairOutcome {
    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }
}

// ============================================================================
// Entry points
// ============================================================================

fn open(path: &Path) -> Result<BufReader<File>, StorageError> {
    File::open(path).map(BufReader::new).map_err(io_at(path))
}

fn pipeline_for(path: &Path) -> Result<Pipeline, StorageError> {
    let len = fs::metadata(path).map_err(io_at(path))?.len();
    Ok(Pipeline::standard().with_input_len(len))
}

/// Repair `path` in place.
///
/// A run that logs no change leaves the document (and its side files)
/// exactly as they were.
pub fn repair_file(
    path: &Path,
    config: &RepairConfig,
    progress: &mut dyn ProgressReporter,
) -> Result<RepairOutcome, StorageError> {
    let pipeline = pipeline_for(path)?;
    let tmp = config.temp_path(path);
    tracing::info!(document = %path.display(), "repair started");

    let result = write_repaired(path, &tmp, pipeline, progress);
    let (report, log) = match result {
        Ok(done) => done,
        Err(err) => {
            if !config.keep_temp_on_failure {
                let _ = fs::remove_file(&tmp);
            }
            return Err(err);
        }
    };

    if report.is_clean() {
        fs::remove_file(&tmp).map_err(io_at(&tmp))?;
        tracing::info!(document = %path.display(), "document already consistent");
        return Ok(RepairOutcome {
            document: path.to_path_buf(),
            report,
            log,
            backup: None,
            log_file: None,
            migrations: Vec::new(),
            completed_at: Utc::now(),
        });
    }

    let backup = config.backup_path(path);
    fs::rename(path, &backup).map_err(io_at(path))?;
    fs::rename(&tmp, path).map_err(io_at(&tmp))?;

    let log_file = config.log_path(path);
    write_change_log(&log_file, &log)?;

    let migrations = if config.migrate_side_files {
        migrate_ldml(&config.ws_store_for(path), &report.tag_normalizations)
    } else {
        Vec::new()
    };

    tracing::info!(
        document = %path.display(),
        changes = report.changes,
        deleted = report.nodes_deleted,
        "repair complete"
    );
    Ok(RepairOutcome {
        document: path.to_path_buf(),
        report,
        log,
        backup: Some(backup),
        log_file: Some(log_file),
        migrations,
        completed_at: Utc::now(),
    })
}

fn write_repaired(
    path: &Path,
    tmp: &Path,
    pipeline: Pipeline,
    progress: &mut dyn ProgressReporter,
) -> Result<(RunReport, ChangeLog), StorageError> {
    let out = File::create(tmp).map_err(io_at(tmp))?;
    let mut log = ChangeLog::new();
    let (out, report) = pipeline.run(open(path)?, open(path)?, BufWriter::new(out), &mut log, progress)?;
    let file = out.into_inner().map_err(|e| StorageError::Io {
        path: tmp.to_path_buf(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(io_at(tmp))?;
    Ok((report, log))
}

fn write_change_log(path: &Path, log: &ChangeLog) -> Result<(), StorageError> {
    let file = File::create(path).map_err(io_at(path))?;
    let mut w = BufWriter::new(file);
    for entry in log.entries() {
        writeln!(w, "{}", entry.to_line()).map_err(io_at(path))?;
    }
    w.flush().map_err(io_at(path))
}

/// Run both passes without touching the file system.
pub fn check_file(path: &Path, progress: &mut dyn ProgressReporter) -> Result<RepairOutcome, StorageError> {
    let pipeline = pipeline_for(path)?;
    let mut log = ChangeLog::new();
    let (_, report) = pipeline.run(open(path)?, open(path)?, io::sink(), &mut log, progress)?;
    Ok(RepairOutcome {
        document: path.to_path_buf(),
        report,
        log,
        backup: None,
        log_file: None,
        migrations: Vec::new(),
        completed_at: Utc::now(),
    })
}

/// Pass 1 only.
pub fn scan_file(path: &Path, progress: &mut dyn ProgressReporter) -> Result<ScanReport, StorageError> {
    let len = fs::metadata(path).map_err(io_at(path))?.len();
    progress.set_maximum(len);
    Ok(scan(open(path)?, progress)?)
}
