//! Global index built during pass 1.
//!
//! Ownership is kept as a derived map keyed by identity: `owner_of` answers
//! "who owns this node" and `owned_children` keeps each owner's children in
//! the order their owning references were streamed. Nothing here points at
//! node data; pass 2 re-reads nodes from the document.

use mendgraph_model::{Guid, Node};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Structural damage that is reported but not repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// A second node record with an identity already seen.
    DuplicateIdentity { guid: Guid, class: String },
    /// A second owner claiming a child; the first claim is kept.
    DoubleOwnership {
        child: Guid,
        kept_owner: Guid,
        rejected_owner: Guid,
    },
}

#[derive(Debug, Default)]
pub struct GlobalIndex {
    /// identity -> class tag, first record wins
    classes: HashMap<Guid, String>,
    owner_of: HashMap<Guid, Guid>,
    owned_children: HashMap<Guid, Vec<Guid>>,
    conflicts: Vec<Conflict>,
    nodes_seen: u64,
}

/// Pass-1 summary, used by `stats` and the run report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub nodes: u64,
    pub identities: usize,
    pub owned_edges: usize,
    pub duplicate_identities: usize,
    pub double_ownerships: usize,
    pub classes: BTreeMap<String, u64>,
}

impl GlobalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one streamed node: its identity, then every owning reference
    /// it holds.
    pub fn record(&mut self, node: &Node) {
        self.nodes_seen += 1;
        let guid = node.guid();
        if self.classes.contains_key(&guid) {
            tracing::warn!(guid = %guid, class = node.class(), "duplicate node identity");
            self.conflicts.push(Conflict::DuplicateIdentity {
                guid,
                class: node.class().to_string(),
            });
        } else {
            self.classes.insert(guid, node.class().to_string());
        }

        for child in node.owning_targets() {
            match self.owner_of.get(&child) {
                Some(existing) if *existing == guid => {}
                Some(existing) => {
                    tracing::warn!(
                        child = %child,
                        kept_owner = %existing,
                        rejected_owner = %guid,
                        "node claimed by two owners"
                    );
                    self.conflicts.push(Conflict::DoubleOwnership {
                        child,
                        kept_owner: *existing,
                        rejected_owner: guid,
                    });
                }
                None => {
                    self.owner_of.insert(child, guid);
                    self.owned_children.entry(guid).or_default().push(child);
                }
            }
        }
    }

    pub fn is_known(&self, guid: Guid) -> bool {
        self.classes.contains_key(&guid)
    }

    pub fn class_of(&self, guid: Guid) -> Option<&str> {
        self.classes.get(&guid).map(String::as_str)
    }

    pub fn owner_of(&self, guid: Guid) -> Option<Guid> {
        self.owner_of.get(&guid).copied()
    }

    pub fn owned_children(&self, owner: Guid) -> &[Guid] {
        self.owned_children
            .get(&owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Owner chain of `guid`, nearest first. Stops on a cycle.
    pub fn ancestors(&self, guid: Guid) -> Vec<Guid> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([guid]);
        let mut current = guid;
        while let Some(owner) = self.owner_of(current) {
            if !seen.insert(owner) {
                break;
            }
            chain.push(owner);
            current = owner;
        }
        chain
    }

    /// Nearest ancestor (or `guid` itself) whose class is `class`.
    pub fn nearest_of_class(&self, guid: Guid, class: &str) -> Option<Guid> {
        if self.class_of(guid) == Some(class) {
            return Some(guid);
        }
        self.ancestors(guid)
            .into_iter()
            .find(|a| self.class_of(*a) == Some(class))
    }

    /// Move `child` under `new_owner`. Only finalize hooks call this, for
    /// repairs that re-parent nodes (wordform merges).
    pub fn transfer_ownership(&mut self, child: Guid, new_owner: Guid) {
        if let Some(old) = self.owner_of.insert(child, new_owner) {
            if old == new_owner {
                return;
            }
            if let Some(list) = self.owned_children.get_mut(&old) {
                list.retain(|c| *c != child);
            }
        }
        let list = self.owned_children.entry(new_owner).or_default();
        if !list.contains(&child) {
            list.push(child);
        }
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let mut classes = BTreeMap::new();
        for class in self.classes.values() {
            *classes.entry(class.clone()).or_insert(0u64) += 1;
        }
        let mut stats = IndexStats {
            nodes: self.nodes_seen,
            identities: self.classes.len(),
            owned_edges: self.owner_of.len(),
            classes,
            ..IndexStats::default()
        };
        for conflict in &self.conflicts {
            match conflict {
                Conflict::DuplicateIdentity { .. } => stats.duplicate_identities += 1,
                Conflict::DoubleOwnership { .. } => stats.double_ownerships += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(n: u128) -> Guid {
        Guid::from_u128(n)
    }

    fn owner(guid: Guid, children: &[Guid]) -> Node {
        let mut n = Node::new("LexEntry", guid, None);
        n.set_references("Senses", children, true);
        n
    }

    #[test]
    fn first_owner_wins() {
        let mut idx = GlobalIndex::new();
        idx.record(&owner(g(1), &[g(3)]));
        idx.record(&owner(g(2), &[g(3), g(4)]));
        idx.record(&Node::new("LexSense", g(3), Some(g(1))));

        assert_eq!(idx.owner_of(g(3)), Some(g(1)));
        assert_eq!(idx.owned_children(g(2)), &[g(4)]);
        assert_eq!(
            idx.conflicts(),
            &[Conflict::DoubleOwnership {
                child: g(3),
                kept_owner: g(1),
                rejected_owner: g(2),
            }]
        );
        assert!(idx.is_known(g(3)));
        assert!(!idx.is_known(g(4)));
    }

    #[test]
    fn duplicate_identity_is_reported() {
        let mut idx = GlobalIndex::new();
        idx.record(&Node::new("LexEntry", g(1), None));
        idx.record(&Node::new("LexSense", g(1), None));
        assert_eq!(idx.class_of(g(1)), Some("LexEntry"));
        let stats = idx.stats();
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.identities, 1);
        assert_eq!(stats.duplicate_identities, 1);
    }

    #[test]
    fn transfer_moves_child_between_lists() {
        let mut idx = GlobalIndex::new();
        idx.record(&owner(g(1), &[g(3), g(4)]));
        idx.transfer_ownership(g(3), g(2));
        assert_eq!(idx.owner_of(g(3)), Some(g(2)));
        assert_eq!(idx.owned_children(g(1)), &[g(4)]);
        assert_eq!(idx.owned_children(g(2)), &[g(3)]);
    }

    #[test]
    fn ancestors_stop_on_cycles() {
        let mut idx = GlobalIndex::new();
        idx.record(&owner(g(1), &[g(2)]));
        idx.record(&owner(g(2), &[g(1)]));
        assert_eq!(idx.ancestors(g(2)), vec![g(1)]);
    }
}
