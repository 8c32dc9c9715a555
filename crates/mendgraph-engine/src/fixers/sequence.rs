//! Empty-sequence cascade for discourse charts and rule contexts, plus the
//! segment-reference repair of chart word groups.
//!
//! A word group spans a range of text segments. When a merge deletes the
//! segments it points at, the word group is meaningless; when that leaves a
//! chart row without cells, the row goes too, and so on up. The finalize
//! step runs to a fixed point so each level sees the deletions below it.

use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::classes::{
    CONST_CHART_CLAUSE_MARKER, CONST_CHART_ROW, CONST_CHART_WORD_GROUP, DS_CONST_CHART,
    PH_SEQUENCE_CONTEXT,
};
use mendgraph_model::{Guid, Node};
use std::collections::HashMap;

pub const NAME: &str = "empty-sequence";

const BEGIN_SEGMENT: &str = "BeginSegment";
const END_SEGMENT: &str = "EndSegment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceKind {
    ChartRow,
    ClauseMarker,
    RuleContext,
}

impl SequenceKind {
    fn reason(self, guid: Guid) -> String {
        match self {
            Self::ChartRow => format!("chart row {guid} has no remaining cells"),
            Self::ClauseMarker => format!("clause marker {guid} has no remaining dependent clauses"),
            Self::RuleContext => format!("rule context {guid} has no remaining members"),
        }
    }
}

#[derive(Debug)]
struct Sequence {
    guid: Guid,
    kind: SequenceKind,
    members: Vec<Guid>,
}

#[derive(Debug)]
struct WordGroup {
    guid: Guid,
    begin: Option<Guid>,
    end: Option<Guid>,
}

/// Copy the surviving segment reference into the missing one.
#[derive(Debug, Clone)]
struct SegmentFill {
    missing: &'static str,
    present: &'static str,
    segment: Guid,
}

#[derive(Debug, Default)]
pub struct SequenceRepairer {
    sequences: Vec<Sequence>,
    word_groups: Vec<WordGroup>,
    /// member -> nodes whose tracked sequence lists it
    holders: HashMap<Guid, Vec<Guid>>,
    removals: HashMap<Guid, Vec<Guid>>,
    fills: HashMap<Guid, SegmentFill>,
}

impl SequenceRepairer {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&mut self, holder: Guid, members: &[Guid]) {
        for m in members {
            self.holders.entry(*m).or_default().push(holder);
        }
    }
}

impl Fixer for SequenceRepairer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        let guid = node.guid();
        let (kind, property) = match node.class() {
            DS_CONST_CHART => {
                let rows = node.reference_targets("Rows");
                self.track(guid, &rows);
                return;
            }
            CONST_CHART_WORD_GROUP => {
                self.word_groups.push(WordGroup {
                    guid,
                    begin: node.reference_target(BEGIN_SEGMENT),
                    end: node.reference_target(END_SEGMENT),
                });
                return;
            }
            CONST_CHART_ROW => (SequenceKind::ChartRow, "Cells"),
            CONST_CHART_CLAUSE_MARKER => (SequenceKind::ClauseMarker, "DependentClauses"),
            PH_SEQUENCE_CONTEXT => (SequenceKind::RuleContext, "Members"),
            _ => return,
        };
        let members = node.reference_targets(property);
        self.track(guid, &members);
        self.sequences.push(Sequence {
            guid,
            kind,
            members,
        });
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        let mut scheduled = Vec::new();

        for wg in &self.word_groups {
            if !ctx.is_live(wg.guid) {
                continue;
            }
            let begin_live = wg.begin.filter(|s| ctx.is_live(*s));
            let end_live = wg.end.filter(|s| ctx.is_live(*s));
            let fill = match (begin_live, end_live) {
                (Some(_), Some(_)) => continue,
                (None, None) => {
                    let reason = format!("word group {} has lost both its begin and end segments", wg.guid);
                    if ctx.pending.schedule(wg.guid, NAME, reason) {
                        scheduled.push(wg.guid);
                    }
                    continue;
                }
                (Some(segment), None) => (
                    SegmentFill {
                        missing: END_SEGMENT,
                        present: BEGIN_SEGMENT,
                        segment,
                    },
                    wg.end,
                ),
                (None, Some(segment)) => (
                    SegmentFill {
                        missing: BEGIN_SEGMENT,
                        present: END_SEGMENT,
                        segment,
                    },
                    wg.begin,
                ),
            };
            let (fill, old) = fill;
            if let Some(old) = old {
                ctx.decisions.claim(wg.guid, old);
            }
            self.fills.insert(wg.guid, fill);
        }

        loop {
            let mut changed = false;
            for seq in &self.sequences {
                if !ctx.is_live(seq.guid) {
                    continue;
                }
                // An empty or absent collection counts as having no survivors.
                if seq.members.iter().all(|m| !ctx.is_live(*m))
                    && ctx.pending.schedule(seq.guid, NAME, seq.kind.reason(seq.guid))
                {
                    scheduled.push(seq.guid);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        for target in &scheduled {
            let Some(holders) = self.holders.get(target) else {
                continue;
            };
            for holder in holders {
                if ctx.is_live(*holder) {
                    ctx.decisions.claim(*holder, *target);
                    self.removals.entry(*holder).or_default().push(*target);
                }
            }
        }
        tracing::debug!(
            scheduled = scheduled.len(),
            segment_fills = self.fills.len(),
            "empty sequences resolved"
        );
    }

    fn fix(&mut self, node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let guid = node.guid();

        if let Some(targets) = self.removals.get(&guid) {
            let removed = node.retain_references(|_, s| !s.target.is_some_and(|t| targets.contains(&t)));
            let chain = ctx.owner_chain(guid);
            for (prop, s) in removed {
                if let Some(target) = s.target {
                    let line = format!(
                        "Removed reference in {prop} of {chain} to deleted {}",
                        ctx.describe(target)
                    );
                    log_now(log, guid, &line);
                }
            }
        }

        if let Some(fill) = self.fills.get(&guid) {
            if node.reference_target(fill.missing) != Some(fill.segment) {
                node.set_references(fill.missing, &[fill.segment], false);
                let line = format!(
                    "Set missing {} of ConstChartWordGroup {guid} to {} (copied from {}; best-effort guess)",
                    fill.missing, fill.segment, fill.present
                );
                log_now(log, guid, &line);
            }
        }

        FixOutcome::Keep
    }
}
