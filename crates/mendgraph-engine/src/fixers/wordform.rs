//! Merges duplicate wordforms.
//!
//! Two wordforms with the same set of form alternatives are the same word.
//! The first one streamed survives: it adopts the analyses of every
//! duplicate, and references to a duplicate are redirected to it.

use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::classes::WFI_WORDFORM;
use mendgraph_model::wstag::normalize_ws_tag;
use mendgraph_model::{Guid, Node};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const NAME: &str = "wordform-merger";

const FORM: &str = "Form";
const ANALYSES: &str = "Analyses";

type FormKey = BTreeSet<(String, String)>;

#[derive(Debug)]
struct Survivor {
    guid: Guid,
    analyses: Vec<Guid>,
    /// Analyses adopted from duplicates.
    adopted: Vec<Guid>,
}

#[derive(Debug, Default)]
pub struct WordformMerger {
    survivors: HashMap<FormKey, Survivor>,
    /// condemned -> (survivor, its form key rendered for log lines)
    condemned: Vec<(Guid, Guid, String)>,
    /// survivor -> merged analyses list, filled in finalize
    merged: HashMap<Guid, Vec<Guid>>,
}

impl WordformMerger {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The form as the baseline fixer will write it: tags normalized, and only
/// the first alternative per writing system kept.
fn form_key(node: &Node) -> FormKey {
    let mut seen = HashSet::new();
    node.alternatives(FORM)
        .into_iter()
        .map(|(ws, text)| (normalize_ws_tag(&ws).unwrap_or(ws), text))
        .filter(|(ws, _)| seen.insert(ws.clone()))
        .collect()
}

fn render_key(key: &FormKey) -> String {
    key.iter()
        .map(|(ws, text)| format!("{ws}:{text}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Fixer for WordformMerger {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        if node.class() != WFI_WORDFORM {
            return;
        }
        let key = form_key(node);
        if key.is_empty() {
            return;
        }
        let guid = node.guid();
        let analyses = node.reference_targets(ANALYSES);

        match self.survivors.get_mut(&key) {
            None => {
                self.survivors.insert(
                    key,
                    Survivor {
                        guid,
                        analyses,
                        adopted: Vec::new(),
                    },
                );
            }
            Some(survivor) if survivor.guid == guid => {}
            Some(survivor) => {
                for a in analyses {
                    if !survivor.analyses.contains(&a) && !survivor.adopted.contains(&a) {
                        survivor.adopted.push(a);
                    }
                }
                self.condemned.push((guid, survivor.guid, render_key(&key)));
            }
        }
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        for (condemned, survivor, key) in &self.condemned {
            ctx.pending.schedule(
                *condemned,
                NAME,
                format!("duplicate of wordform {survivor} (form {key})"),
            );
            ctx.decisions.redirect(*condemned, *survivor);
        }

        for survivor in self.survivors.values() {
            if survivor.adopted.is_empty() {
                continue;
            }
            for a in &survivor.adopted {
                if ctx.index.is_known(*a) {
                    ctx.index.transfer_ownership(*a, survivor.guid);
                }
            }
            let merged: Vec<Guid> = survivor
                .analyses
                .iter()
                .chain(&survivor.adopted)
                .copied()
                .filter(|a| ctx.index.is_known(*a) && ctx.index.owner_of(*a) == Some(survivor.guid))
                .collect();
            self.merged.insert(survivor.guid, merged);
        }
        tracing::debug!(merged = self.condemned.len(), "duplicate wordforms");
    }

    fn fix(&mut self, node: &mut Node, ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let guid = node.guid();
        let class = node.class().to_string();

        if let Some(merged) = self.merged.get(&guid) {
            let live: Vec<Guid> = merged.iter().copied().filter(|a| ctx.is_live(*a)).collect();
            if node.reference_targets(ANALYSES) != live {
                let before = node.reference_targets(ANALYSES).len();
                node.set_references(ANALYSES, &live, true);
                let line = format!(
                    "Merged analyses of duplicate wordforms into WfiWordform {guid} ({before} -> {} analyses)",
                    live.len()
                );
                log_now(log, guid, &line);
            }
        }

        // A holder owning a duplicate must not end up owning the survivor twice.
        let dropped = node.retain_references(|_, s| {
            !(s.owning && s.target.is_some_and(|t| ctx.decisions.redirect_of(t).is_some()))
        });
        for (prop, s) in dropped {
            if let Some(target) = s.target {
                let line = format!("Removed owning reference in {prop} of {class} {guid} to merged wordform {target}");
                log_now(log, guid, &line);
            }
        }

        let rewritten = node.rewrite_references(|_, s| s.target.and_then(|t| ctx.decisions.redirect_of(t)));
        for (prop, old, new) in rewritten {
            let line = format!("Redirected {prop} of {class} {guid} from merged wordform {old} to {new}");
            log_now(log, guid, &line);
        }

        if let Some(declared) = node.owner() {
            if let Some(new_owner) = ctx.decisions.redirect_of(declared) {
                node.set_owner(new_owner);
                let line = format!("Moved {class} {guid} from merged wordform {declared} to {new_owner}");
                log_now(log, guid, &line);
            }
        }

        FixOutcome::Keep
    }
}
