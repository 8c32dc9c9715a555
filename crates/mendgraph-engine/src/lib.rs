//! Mendgraph repair engine
//!
//! Repairs the structural damage an offline, text-level merge leaves in a
//! project document: nodes with two owners, references to deleted nodes,
//! emptied sequences, duplicated names and duplicated entities.
//!
//! ```text
//!  ┌──────────────┐   pass 1   ┌─────────────┐  finalize  ┌──────────────┐
//!  │ DocumentRead │ ─────────► │ GlobalIndex │ ─────────► │   Pending    │
//!  └──────────────┘  inspect   └─────────────┘            │  Deletions   │
//!                                                         │  + cascade   │
//!  ┌──────────────┐   pass 2   ┌─────────────┐            └──────┬───────┘
//!  │ DocumentWrite│ ◄───────── │ Fixer::fix  │ ◄─────────────────┘
//!  └──────────────┘            └──────┬──────┘
//!                                     ▼
//!                               ChangeLogger
//! ```
//!
//! Every repair is deterministic and logged; an empty change log means the
//! document was already consistent.

pub mod decisions;
pub mod error;
pub mod fixer;
pub mod fixers;
pub mod index;
pub mod logger;
pub mod pending;
pub mod pipeline;

pub use decisions::Decisions;
pub use error::PipelineError;
pub use fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
pub use index::{Conflict, GlobalIndex, IndexStats};
pub use logger::{ChangeEntry, ChangeLog, ChangeLogger, NullProgress, ProgressReporter};
pub use pending::{DeletionReason, PendingDeletions};
pub use pipeline::{scan, standard_fixers, Pipeline, RepairedText, RunReport, ScanReport};
