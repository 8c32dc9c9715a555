//! Prunes grammatical analyses (MSAs) that no sense of their entry uses.
//!
//! Merges leave entries with extra analyses when two users each created
//! one for the same sense. The one the senses point at survives.

use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::classes::{LEX_ENTRY, LEX_SENSE};
use mendgraph_model::{Guid, Node};
use std::collections::{HashMap, HashSet};

pub const NAME: &str = "unused-analysis";

const ENTRY_ANALYSES: &str = "MorphoSyntaxAnalyses";
const SENSE_ANALYSIS: &str = "MorphoSyntaxAnalysis";

#[derive(Debug, Default)]
pub struct UnusedAnalysisPruner {
    /// entry -> owned analyses, in document order
    entries: Vec<(Guid, Vec<Guid>)>,
    /// sense -> referenced analysis
    senses: Vec<(Guid, Guid)>,
    condemned_by_entry: HashMap<Guid, Vec<Guid>>,
}

impl UnusedAnalysisPruner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fixer for UnusedAnalysisPruner {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        match node.class() {
            LEX_ENTRY => {
                let owned: Vec<Guid> = node
                    .references()
                    .into_iter()
                    .filter(|(prop, s)| *prop == ENTRY_ANALYSES && s.owning)
                    .filter_map(|(_, s)| s.target)
                    .collect();
                if !owned.is_empty() {
                    self.entries.push((node.guid(), owned));
                }
            }
            LEX_SENSE => {
                if let Some(analysis) = node.reference_target(SENSE_ANALYSIS) {
                    self.senses.push((node.guid(), analysis));
                }
            }
            _ => {}
        }
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        // A sense (at any depth) keeps analyses alive only for its own entry.
        let mut used_by_entry: HashMap<Guid, HashSet<Guid>> = HashMap::new();
        for (sense, analysis) in &self.senses {
            ctx.decisions.set_sense_analysis(*sense, *analysis);
            if let Some(entry) = ctx.index.nearest_of_class(*sense, LEX_ENTRY) {
                used_by_entry.entry(entry).or_default().insert(*analysis);
            }
        }

        let mut condemned_total = 0;
        for (entry, owned) in &self.entries {
            let mut surviving = Vec::new();
            let mut condemned = Vec::new();
            for analysis in owned {
                if !ctx.index.is_known(*analysis) || ctx.index.owner_of(*analysis) != Some(*entry) {
                    continue;
                }
                if used_by_entry.get(entry).is_some_and(|used| used.contains(analysis)) {
                    surviving.push(*analysis);
                } else {
                    condemned.push(*analysis);
                }
            }
            for analysis in &condemned {
                ctx.pending.schedule(
                    *analysis,
                    NAME,
                    format!("analysis not used by any sense of entry {entry}"),
                );
                ctx.decisions.condemn_analysis(*analysis);
                ctx.decisions.claim(*entry, *analysis);
            }
            ctx.decisions.set_surviving_analyses(*entry, surviving);
            if !condemned.is_empty() {
                condemned_total += condemned.len();
                self.condemned_by_entry.insert(*entry, condemned);
            }
        }
        tracing::debug!(condemned = condemned_total, "unused analyses");
    }

    fn fix(&mut self, node: &mut Node, _ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let guid = node.guid();
        let Some(condemned) = self.condemned_by_entry.get(&guid) else {
            return FixOutcome::Keep;
        };
        let removed = node.retain_references(|prop, s| {
            !(prop == ENTRY_ANALYSES && s.target.is_some_and(|t| condemned.contains(&t)))
        });
        for (_, s) in removed {
            if let Some(target) = s.target {
                let line = format!("Removed unused analysis {target} from LexEntry {guid}");
                log_now(log, guid, &line);
            }
        }
        FixOutcome::Keep
    }
}
