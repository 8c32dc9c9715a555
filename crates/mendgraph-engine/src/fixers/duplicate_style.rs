//! Sibling styles with the same name: the first is kept, the others are
//! deleted. References to the deleted styles are then pruned by the
//! baseline fixer like any other reference to a deleted node.

use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::ChangeLogger;
use mendgraph_model::classes::ST_STYLE;
use mendgraph_model::{Guid, Node};
use std::collections::HashMap;

pub const NAME: &str = "duplicate-style";

#[derive(Debug, Default)]
pub struct DuplicateStyles {
    styles: Vec<(Guid, String)>,
}

impl DuplicateStyles {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fixer for DuplicateStyles {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        if node.class() != ST_STYLE {
            return;
        }
        if let Some(name) = node.uni_text("Name") {
            self.styles.push((node.guid(), name));
        }
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        let mut first: HashMap<(Guid, &str), Guid> = HashMap::new();
        let mut removed = 0;
        for (guid, name) in &self.styles {
            if !ctx.is_live(*guid) {
                continue;
            }
            // Unowned styles have no siblings.
            let Some(owner) = ctx.index.owner_of(*guid) else {
                continue;
            };
            match first.get(&(owner, name.as_str())) {
                Some(kept) => {
                    let reason = format!("duplicate of style {kept} named '{name}'");
                    if ctx.pending.schedule(*guid, NAME, reason) {
                        removed += 1;
                    }
                }
                None => {
                    first.insert((owner, name.as_str()), *guid);
                }
            }
        }
        tracing::debug!(removed, "duplicate styles");
    }

    fn fix(&mut self, _node: &mut Node, _ctx: &FixContext<'_>, _log: &mut dyn ChangeLogger) -> FixOutcome {
        FixOutcome::Keep
    }
}
