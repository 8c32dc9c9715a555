//! Repairs morph bundles whose analysis or morph reference no longer
//! resolves, preferring a confident replacement over removal.

use super::unused_analysis;
use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::classes::{LEX_ENTRY, WFI_MORPH_BUNDLE};
use mendgraph_model::{Guid, Node};
use std::collections::HashMap;

pub const NAME: &str = "morph-bundle";

const MSA: &str = "Msa";
const SENSE: &str = "Sense";
const MORPH: &str = "Morph";

#[derive(Debug)]
struct Bundle {
    guid: Guid,
    msa: Option<Guid>,
    sense: Option<Guid>,
    morph: Option<Guid>,
}

#[derive(Debug, Default)]
struct EntryForms {
    lexeme_form: Option<Guid>,
    has_alternate_forms: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repair {
    Repoint {
        property: &'static str,
        old: Guid,
        new: Guid,
        why: String,
    },
    Remove {
        property: &'static str,
        old: Guid,
        why: String,
    },
}

#[derive(Debug, Default)]
pub struct MorphBundleRepairer {
    bundles: Vec<Bundle>,
    entries: HashMap<Guid, EntryForms>,
    plans: HashMap<Guid, Vec<Repair>>,
}

impl MorphBundleRepairer {
    pub fn new() -> Self {
        Self::default()
    }

    fn plan_analysis(&self, bundle: &Bundle, old: Guid, ctx: &FinalizeContext<'_>) -> Repair {
        let from_sense = bundle
            .sense
            .and_then(|s| ctx.decisions.sense_analysis(s))
            .filter(|a| ctx.is_live(*a));
        if let Some(new) = from_sense {
            return Repair::Repoint {
                property: MSA,
                old,
                new,
                why: "the analysis used by its sense".to_string(),
            };
        }

        let entry = bundle
            .morph
            .and_then(|m| ctx.index.nearest_of_class(m, LEX_ENTRY));
        if let Some(entry) = entry {
            if let [only] = ctx.decisions.surviving_analyses(entry) {
                if ctx.is_live(*only) {
                    return Repair::Repoint {
                        property: MSA,
                        old,
                        new: *only,
                        why: format!("the only remaining analysis of entry {entry}"),
                    };
                }
            }
        }

        Repair::Remove {
            property: MSA,
            old,
            why: "no unambiguous replacement analysis".to_string(),
        }
    }

    fn plan_morph(&self, bundle: &Bundle, old: Guid, ctx: &FinalizeContext<'_>) -> Repair {
        let entry = bundle
            .sense
            .and_then(|s| ctx.index.nearest_of_class(s, LEX_ENTRY))
            .or_else(|| bundle.msa.and_then(|a| ctx.index.nearest_of_class(a, LEX_ENTRY)))
            .filter(|e| ctx.is_live(*e));

        let forms = entry.and_then(|e| self.entries.get(&e).map(|f| (e, f)));
        match forms {
            Some((entry, f)) if !f.has_alternate_forms => match f.lexeme_form.filter(|l| ctx.is_live(*l)) {
                Some(new) => Repair::Repoint {
                    property: MORPH,
                    old,
                    new,
                    why: format!("the lexeme form of entry {entry}"),
                },
                None => Repair::Remove {
                    property: MORPH,
                    old,
                    why: format!("entry {entry} has no lexeme form"),
                },
            },
            Some((entry, _)) => Repair::Remove {
                property: MORPH,
                old,
                why: format!("entry {entry} has alternate forms, so the morph is ambiguous"),
            },
            None => Repair::Remove {
                property: MORPH,
                old,
                why: "no owning entry found".to_string(),
            },
        }
    }
}

impl Fixer for MorphBundleRepairer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[unused_analysis::NAME]
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        match node.class() {
            WFI_MORPH_BUNDLE => self.bundles.push(Bundle {
                guid: node.guid(),
                msa: node.reference_target(MSA),
                sense: node.reference_target(SENSE),
                morph: node.reference_target(MORPH),
            }),
            LEX_ENTRY => {
                self.entries.insert(
                    node.guid(),
                    EntryForms {
                        lexeme_form: node.reference_target("LexemeForm"),
                        has_alternate_forms: !node.reference_targets("AlternateForms").is_empty(),
                    },
                );
            }
            _ => {}
        }
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        let mut plans = HashMap::new();
        for bundle in &self.bundles {
            let mut plan = Vec::new();
            if let Some(msa) = bundle.msa.filter(|a| !ctx.is_live(*a)) {
                plan.push(self.plan_analysis(bundle, msa, ctx));
            }
            if let Some(morph) = bundle.morph.filter(|m| !ctx.is_live(*m)) {
                plan.push(self.plan_morph(bundle, morph, ctx));
            }
            if plan.is_empty() {
                continue;
            }
            for repair in &plan {
                let (Repair::Repoint { old, .. } | Repair::Remove { old, .. }) = repair;
                ctx.decisions.claim(bundle.guid, *old);
            }
            plans.insert(bundle.guid, plan);
        }
        tracing::debug!(bundles = plans.len(), "morph bundles to repair");
        self.plans = plans;
    }

    fn fix(&mut self, node: &mut Node, _ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let guid = node.guid();
        let Some(plan) = self.plans.get(&guid) else {
            return FixOutcome::Keep;
        };
        for repair in plan {
            match repair {
                Repair::Repoint {
                    property,
                    old,
                    new,
                    why,
                } => {
                    let changed = node.rewrite_references(|prop, s| {
                        (prop == *property && s.target == Some(*old)).then_some(*new)
                    });
                    if !changed.is_empty() {
                        let line = format!(
                            "Repointed {property} of WfiMorphBundle {guid} from {old} to {new}, {why}"
                        );
                        log_now(log, guid, &line);
                    }
                }
                Repair::Remove { property, old, why } => {
                    let removed = node.retain_references(|prop, s| {
                        !(prop == *property && s.target == Some(*old))
                    });
                    if !removed.is_empty() {
                        let line = format!(
                            "Removed dangling {property} reference {old} from WfiMorphBundle {guid}: {why}"
                        );
                        log_now(log, guid, &line);
                    }
                }
            }
        }
        FixOutcome::Keep
    }
}
