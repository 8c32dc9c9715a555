//! Homograph numbering.
//!
//! Entries whose lexeme forms share a form and morph type are homographs and
//! must be numbered `1..n`. Two users adding the same word offline both end
//! up with number 0 after a merge.

use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::classes::{LEX_ENTRY, MO_STEM_ALLOMORPH};
use mendgraph_model::{Guid, Node};
use std::collections::{BTreeMap, HashMap};

pub const NAME: &str = "homograph";

const HOMOGRAPH_NUMBER: &str = "HomographNumber";

/// Form text plus morph-type identity.
type HomographKey = (String, Option<Guid>);

#[derive(Debug, Default)]
pub struct HomographAssigner {
    /// (allomorph, key) in stream order
    allomorphs: Vec<(Guid, HomographKey)>,
    lexeme_forms: HashMap<Guid, Guid>,
    numbers: HashMap<Guid, i64>,
    assigned: HashMap<Guid, i64>,
}

impl HomographAssigner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fixer for HomographAssigner {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        match node.class() {
            MO_STEM_ALLOMORPH => {
                let Some((_, form)) = node.first_alternative("Form") else {
                    return;
                };
                if form.trim().is_empty() {
                    return;
                }
                let key = (form, node.reference_target("MorphType"));
                self.allomorphs.push((node.guid(), key));
            }
            LEX_ENTRY => {
                if let Some(lf) = node.reference_target("LexemeForm") {
                    self.lexeme_forms.insert(node.guid(), lf);
                }
                self.numbers
                    .insert(node.guid(), node.int_val(HOMOGRAPH_NUMBER).unwrap_or(0));
            }
            _ => {}
        }
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        let mut groups: BTreeMap<usize, Vec<Guid>> = BTreeMap::new();
        let mut group_of: HashMap<&HomographKey, usize> = HashMap::new();

        for (allomorph, key) in &self.allomorphs {
            let Some(entry) = ctx.index.owner_of(*allomorph) else {
                continue;
            };
            if ctx.index.class_of(entry) != Some(LEX_ENTRY) || !ctx.is_live(entry) || !ctx.is_live(*allomorph) {
                continue;
            }
            if let Some(lf) = self.lexeme_forms.get(&entry) {
                if lf != allomorph {
                    continue;
                }
            }
            let next = group_of.len();
            let slot = *group_of.entry(key).or_insert(next);
            let members = groups.entry(slot).or_default();
            if !members.contains(&entry) {
                members.push(entry);
            }
        }

        for members in groups.values().filter(|m| m.len() > 1) {
            let already_numbered = members
                .iter()
                .enumerate()
                .all(|(i, e)| self.numbers.get(e).copied().unwrap_or(0) == i as i64 + 1);
            if already_numbered {
                continue;
            }
            for (i, entry) in members.iter().enumerate() {
                self.assigned.insert(*entry, i as i64 + 1);
            }
        }
        tracing::debug!(entries = self.assigned.len(), "homograph numbers assigned");
    }

    fn fix(&mut self, node: &mut Node, _ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let guid = node.guid();
        let Some(number) = self.assigned.get(&guid).copied() else {
            return FixOutcome::Keep;
        };
        let old = node.val(HOMOGRAPH_NUMBER).map(str::to_string);
        if old.as_deref() != Some(number.to_string().as_str()) {
            node.set_val(HOMOGRAPH_NUMBER, number.to_string());
            let line = format!(
                "Changed homograph number of LexEntry {guid} from {} to {number}",
                old.as_deref().unwrap_or("none")
            );
            log_now(log, guid, &line);
        }
        FixOutcome::Keep
    }
}
