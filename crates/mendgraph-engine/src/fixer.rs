//! The repair-policy contract.
//!
//! ```text
//!   pass 1          after pass 1          pass 2
//!  ┌─────────┐     ┌──────────┐         ┌───────┐
//!  │ inspect │ ──► │ finalize │ ──► ... │  fix  │
//!  └─────────┘     └──────────┘         └───────┘
//!  read-only,       complete view,       mutate
//!  own state        schedule/claim       one node
//! ```
//!
//! Each fixer matches the class tags it cares about itself; every hook sees
//! every node.

use crate::decisions::Decisions;
use crate::index::GlobalIndex;
use crate::logger::ChangeLogger;
use crate::pending::PendingDeletions;
use mendgraph_model::{DocumentHeader, Guid, Node};

/// What pass 2 does with a node after a fixer has seen it.
///
/// There is no delete outcome. Deletion is scheduled in `finalize`, where
/// the cascade can reach owned nodes that stream before their owner and the
/// baseline fixer can prune the references that hold them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Keep,
}

pub struct InspectContext<'a> {
    pub header: &'a DocumentHeader,
    /// Index as built so far (the current node included).
    pub index: &'a GlobalIndex,
}

pub struct FinalizeContext<'a> {
    pub header: &'a DocumentHeader,
    pub index: &'a mut GlobalIndex,
    pub pending: &'a mut PendingDeletions,
    pub decisions: &'a mut Decisions,
}

impl FinalizeContext<'_> {
    /// Known and not (transitively) slated for deletion.
    pub fn is_live(&self, guid: Guid) -> bool {
        self.index.is_known(guid) && !self.pending.is_doomed(guid, self.index)
    }
}

pub struct FixContext<'a> {
    pub header: &'a DocumentHeader,
    pub index: &'a GlobalIndex,
    pub pending: &'a PendingDeletions,
    pub decisions: &'a Decisions,
}

impl FixContext<'_> {
    /// Known and not pending deletion. The cascade has been expanded by the
    /// time pass 2 runs, so no owner walk is needed.
    pub fn is_live(&self, guid: Guid) -> bool {
        self.index.is_known(guid) && !self.pending.contains(guid)
    }

    /// `Class guid`, for log lines.
    pub fn describe(&self, guid: Guid) -> String {
        match self.index.class_of(guid) {
            Some(class) => format!("{class} {guid}"),
            None => format!("node {guid}"),
        }
    }

    /// `a < b < c`: the node and its owners, for log lines.
    pub fn owner_chain(&self, guid: Guid) -> String {
        std::iter::once(guid)
            .chain(self.index.ancestors(guid))
            .map(|g| self.describe(g))
            .collect::<Vec<_>>()
            .join(" < ")
    }
}

pub trait Fixer {
    /// Stable name, used for dependency checks and per-fixer counts.
    fn name(&self) -> &'static str;

    /// Fixers whose finalize results this one reads.
    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    fn inspect(&mut self, _node: &Node, _ctx: &InspectContext<'_>) {}

    fn finalize(&mut self, _ctx: &mut FinalizeContext<'_>) {}

    fn fix(&mut self, node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger)
        -> FixOutcome;
}
