//! Sibling possibility lists must have distinct names. Later duplicates are
//! renamed `Name (2)`, `Name (3)`, ... skipping names already in use.

use crate::fixer::{FinalizeContext, FixContext, FixOutcome, Fixer, InspectContext};
use crate::logger::{log_now, ChangeLogger};
use mendgraph_model::classes::CM_POSSIBILITY_LIST;
use mendgraph_model::{Guid, Node};
use std::collections::{HashMap, HashSet};

pub const NAME: &str = "duplicate-list-name";

#[derive(Debug, Clone)]
struct ListName {
    guid: Guid,
    ws: String,
    text: String,
}

#[derive(Debug, Default)]
pub struct DuplicateListNames {
    lists: Vec<ListName>,
    /// list -> (ws, old name, new name)
    renames: HashMap<Guid, (String, String, String)>,
}

impl DuplicateListNames {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fixer for DuplicateListNames {
    fn name(&self) -> &'static str {
        NAME
    }

    fn inspect(&mut self, node: &Node, _ctx: &InspectContext<'_>) {
        if node.class() != CM_POSSIBILITY_LIST {
            return;
        }
        if let Some((ws, text)) = node.first_alternative("Name") {
            self.lists.push(ListName {
                guid: node.guid(),
                ws,
                text,
            });
        }
    }

    fn finalize(&mut self, ctx: &mut FinalizeContext<'_>) {
        let mut by_owner: HashMap<Option<Guid>, Vec<&ListName>> = HashMap::new();
        for list in &self.lists {
            if ctx.is_live(list.guid) {
                by_owner.entry(ctx.index.owner_of(list.guid)).or_default().push(list);
            }
        }

        let mut renames = HashMap::new();
        for siblings in by_owner.values() {
            let mut taken: HashSet<String> = siblings.iter().map(|l| l.text.clone()).collect();
            let mut seen: HashSet<&str> = HashSet::new();
            for list in siblings {
                if seen.insert(list.text.as_str()) {
                    continue;
                }
                let mut n = 2;
                let new_name = loop {
                    let candidate = format!("{} ({n})", list.text);
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                    n += 1;
                };
                taken.insert(new_name.clone());
                renames.insert(list.guid, (list.ws.clone(), list.text.clone(), new_name));
            }
        }
        tracing::debug!(renamed = renames.len(), "duplicate list names");
        self.renames = renames;
    }

    fn fix(&mut self, node: &mut Node, _ctx: &FixContext<'_>, log: &mut dyn ChangeLogger) -> FixOutcome {
        let guid = node.guid();
        if let Some((ws, old, new)) = self.renames.get(&guid) {
            if node.set_alternative_text("Name", ws, new) {
                let line = format!("Renamed CmPossibilityList {guid} from '{old}' to '{new}'");
                log_now(log, guid, &line);
            }
        }
        FixOutcome::Keep
    }
}
