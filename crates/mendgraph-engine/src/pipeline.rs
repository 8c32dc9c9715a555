//! Two-pass orchestration.
//!
//! ```text
//!  pass 1: read ──► index.record ──► fixer.inspect (in order)
//!          │
//!          ▼
//!  fixer.finalize (in order) ──► cascade expansion (once)
//!          │
//!          ▼
//!  pass 2: read ──► pending? drop : fixer.fix (in order) ──► write
//! ```
//!
//! The document is streamed twice; at most one node is materialized at a
//! time in either pass.

use crate::decisions::Decisions;
use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::fixers;
use crate::index::{Conflict, GlobalIndex, IndexStats};
use crate::logger::{log_now, ChangeLog, ChangeLogger, CountingLogger, NullProgress, ProgressReporter};
use crate::pending::PendingDeletions;
use crate::PipelineError;
use mendgraph_model::{DocumentError, DocumentHeader, DocumentReader, DocumentWriter, Record};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Nodes between progress updates.
const PROGRESS_EVERY: u64 = 1000;

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub index: IndexStats,
    pub conflicts: Vec<Conflict>,
    /// Nodes scheduled directly by a fixer.
    pub scheduled_deletions: usize,
    /// Nodes added by the cascade resolver.
    pub cascaded_deletions: usize,
    pub nodes_written: u64,
    pub nodes_deleted: u64,
    /// Change-log entries produced by this run.
    pub changes: usize,
    pub changes_by_fixer: BTreeMap<String, usize>,
    /// Writing-system tags rewritten, old -> new.
    pub tag_normalizations: BTreeMap<String, String>,
}

impl RunReport {
    /// No change was logged; the document needs no re-synchronization.
    pub fn is_clean(&self) -> bool {
        self.changes == 0
    }
}

/// Pass-1-only view of a document.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub stats: IndexStats,
    pub conflicts: Vec<Conflict>,
    pub custom_fields: usize,
}

/// Output of [`Pipeline::repair_str`].
#[derive(Debug, Clone)]
pub struct RepairedText {
    pub text: String,
    pub log: ChangeLog,
    pub report: RunReport,
}

/// Everything pass 2 needs from pass 1.
struct Analysis {
    header: DocumentHeader,
    index: GlobalIndex,
    pending: PendingDeletions,
    decisions: Decisions,
    scheduled: usize,
    cascaded: usize,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline {
    fixers: Vec<Box<dyn Fixer>>,
    input_len: Option<u64>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("fixers", &self.fixer_names())
            .finish()
    }
}

/// The default repair order.
pub fn standard_fixers() -> Vec<Box<dyn Fixer>> {
    vec![
        Box::new(fixers::BaselineFixer::new()),
        Box::new(fixers::CustomFieldPruner),
        Box::new(fixers::CustomFieldDefaults),
        Box::new(fixers::UnusedAnalysisPruner::new()),
        Box::new(fixers::MorphBundleRepairer::new()),
        Box::new(fixers::SequenceRepairer::new()),
        Box::new(fixers::HomographAssigner::new()),
        Box::new(fixers::WordformMerger::new()),
        Box::new(fixers::DuplicateStyles::new()),
        Box::new(fixers::DuplicateListNames::new()),
    ]
}

impl Pipeline {
    /// Build a pipeline, checking that every fixer runs after the fixers
    /// whose decisions it reads.
    pub fn new(fixers: Vec<Box<dyn Fixer>>) -> Result<Self, PipelineError> {
        for (pos, fixer) in fixers.iter().enumerate() {
            if fixers[..pos].iter().any(|f| f.name() == fixer.name()) {
                return Err(PipelineError::DuplicateFixer(fixer.name()));
            }
            for &dependency in fixer.depends_on() {
                match fixers.iter().position(|f| f.name() == dependency) {
                    None => {
                        return Err(PipelineError::MissingDependency {
                            fixer: fixer.name(),
                            dependency,
                        })
                    }
                    Some(dep_pos) if dep_pos > pos => {
                        return Err(PipelineError::OrderViolation {
                            fixer: fixer.name(),
                            dependency,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(Self {
            fixers,
            input_len: None,
        })
    }

    pub fn standard() -> Self {
        Self {
            fixers: standard_fixers(),
            input_len: None,
        }
    }

    /// Total input size in bytes, reported as the progress maximum.
    pub fn with_input_len(mut self, len: u64) -> Self {
        self.input_len = Some(len);
        self
    }

    pub fn fixer_names(&self) -> Vec<&'static str> {
        self.fixers.iter().map(|f| f.name()).collect()
    }

    /// Run both passes. `pass1` and `pass2` must read the same document.
    pub fn run<R1, R2, W>(
        mut self,
        pass1: R1,
        pass2: R2,
        out: W,
        log: &mut dyn ChangeLogger,
        progress: &mut dyn ProgressReporter,
    ) -> Result<(W, RunReport), PipelineError>
    where
        R1: BufRead,
        R2: BufRead,
        W: Write,
    {
        let analysis = self.analyze(DocumentReader::new(pass1)?, progress)?;
        self.rewrite(analysis, DocumentReader::new(pass2)?, out, log, progress)
    }

    /// Repair an in-memory document.
    pub fn repair_str(self, input: &str) -> Result<RepairedText, PipelineError> {
        let mut log = ChangeLog::new();
        let (bytes, report) = self.run(
            input.as_bytes(),
            input.as_bytes(),
            Vec::new(),
            &mut log,
            &mut NullProgress,
        )?;
        let text = String::from_utf8(bytes).map_err(|e| DocumentError::Utf8(e.utf8_error()))?;
        Ok(RepairedText { text, log, report })
    }

    // ------------------------------------------------------------------
    // Pass 1
    // ------------------------------------------------------------------

    fn analyze<R: BufRead>(
        &mut self,
        mut reader: DocumentReader<R>,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Analysis, PipelineError> {
        progress.set_message("Indexing nodes");
        if let Some(max) = self.input_len {
            progress.set_maximum(max);
        }

        let header = reader.header().clone();
        let mut index = GlobalIndex::new();
        let mut nodes = 0u64;
        while let Some(record) = reader.next_record()? {
            let Record::Node(node) = record else {
                continue;
            };
            index.record(&node);
            let ctx = InspectContext {
                header: &header,
                index: &index,
            };
            for fixer in self.fixers.iter_mut() {
                fixer.inspect(&node, &ctx);
            }
            nodes += 1;
            if nodes % PROGRESS_EVERY == 0 {
                progress.set_position(reader.position());
            }
        }
        progress.set_position(reader.position());
        tracing::info!(
            nodes,
            identities = index.len(),
            conflicts = index.conflicts().len(),
            "pass 1 complete"
        );

        let mut pending = PendingDeletions::new();
        let mut decisions = Decisions::new();
        {
            let mut ctx = FinalizeContext {
                header: &header,
                index: &mut index,
                pending: &mut pending,
                decisions: &mut decisions,
            };
            for fixer in self.fixers.iter_mut() {
                let before = ctx.pending.len();
                fixer.finalize(&mut ctx);
                tracing::debug!(
                    fixer = fixer.name(),
                    scheduled = ctx.pending.len() - before,
                    "finalized"
                );
            }
        }

        let scheduled = pending.len();
        let cascaded = pending.expand_cascade(&index);
        tracing::info!(scheduled, cascaded, "pending deletions resolved");

        Ok(Analysis {
            header,
            index,
            pending,
            decisions,
            scheduled,
            cascaded,
        })
    }

    // ------------------------------------------------------------------
    // Pass 2
    // ------------------------------------------------------------------

    fn rewrite<R: BufRead, W: Write>(
        &mut self,
        analysis: Analysis,
        mut reader: DocumentReader<R>,
        out: W,
        log: &mut dyn ChangeLogger,
        progress: &mut dyn ProgressReporter,
    ) -> Result<(W, RunReport), PipelineError> {
        progress.set_message("Repairing nodes");
        if let Some(max) = self.input_len {
            progress.set_maximum(max);
        }

        let Analysis {
            header,
            index,
            pending,
            decisions,
            scheduled,
            cascaded,
        } = analysis;
        let ctx = FixContext {
            header: &header,
            index: &index,
            pending: &pending,
            decisions: &decisions,
        };

        let mut total = CountingLogger::new(log);
        let mut per_fixer = vec![0usize; self.fixers.len()];
        let mut deletion_entries = 0usize;
        let mut nodes_deleted = 0u64;
        let mut seen = 0u64;

        let mut writer = DocumentWriter::new(out, &header)?;
        while let Some(record) = reader.next_record()? {
            let mut node = match record {
                Record::Other(element) => {
                    writer.write_element(&element)?;
                    continue;
                }
                Record::Node(node) => node,
            };
            seen += 1;
            if seen % PROGRESS_EVERY == 0 {
                progress.set_position(reader.position());
            }

            let guid = node.guid();
            if let Some(reason) = pending.reason(guid) {
                let line = format!("Deleted {} {}: {}", node.class(), guid, reason.describe());
                log_now(&mut total, guid, &line);
                deletion_entries += 1;
                nodes_deleted += 1;
                continue;
            }

            for (i, fixer) in self.fixers.iter_mut().enumerate() {
                let mut counting = CountingLogger::new(&mut total);
                let FixOutcome::Keep = fixer.fix(&mut node, &ctx, &mut counting);
                per_fixer[i] += counting.count;
            }
            writer.write_node(&node)?;
        }
        progress.set_position(reader.position());
        let nodes_written = writer.nodes_written();
        let out = writer.finish()?;

        let mut changes_by_fixer = BTreeMap::new();
        for (fixer, count) in self.fixers.iter().zip(per_fixer) {
            if count > 0 {
                changes_by_fixer.insert(fixer.name().to_string(), count);
            }
        }
        if deletion_entries > 0 {
            changes_by_fixer.insert("deletions".to_string(), deletion_entries);
        }

        let report = RunReport {
            index: index.stats(),
            conflicts: index.conflicts().to_vec(),
            scheduled_deletions: scheduled,
            cascaded_deletions: cascaded,
            nodes_written,
            nodes_deleted,
            changes: total.count,
            changes_by_fixer,
            tag_normalizations: decisions.tag_normalizations().clone(),
        };
        tracing::info!(
            written = report.nodes_written,
            deleted = report.nodes_deleted,
            changes = report.changes,
            "pass 2 complete"
        );
        Ok((out, report))
    }
}

/// Pass 1 only: index statistics and conflicts, no fixers.
pub fn scan<R: BufRead>(input: R, progress: &mut dyn ProgressReporter) -> Result<ScanReport, PipelineError> {
    progress.set_message("Indexing nodes");
    let mut reader = DocumentReader::new(input)?;
    let mut index = GlobalIndex::new();
    let mut nodes = 0u64;
    while let Some(record) = reader.next_record()? {
        if let Record::Node(node) = record {
            index.record(&node);
            nodes += 1;
            if nodes % PROGRESS_EVERY == 0 {
                progress.set_position(reader.position());
            }
        }
    }
    progress.set_position(reader.position());
    Ok(ScanReport {
        stats: index.stats(),
        conflicts: index.conflicts().to_vec(),
        custom_fields: reader.header().custom_fields.len(),
    })
}
