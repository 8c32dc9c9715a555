//! Pending deletions and the cascade resolver.
//!
//! Fixers schedule nodes during finalize. Once every finalize hook has run,
//! [`PendingDeletions::expand_cascade`] adds every node transitively owned by
//! a scheduled one, exactly once. Pass 2 drops every pending node and logs
//! the reason stored here.

use crate::index::GlobalIndex;
use mendgraph_model::Guid;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionReason {
    /// Scheduled directly by a fixer.
    Scheduled { fixer: &'static str, message: String },
    /// Reached by cascade from a scheduled owner.
    Cascade { root: Guid },
}

impl DeletionReason {
    pub fn describe(&self) -> String {
        match self {
            Self::Scheduled { message, .. } => message.clone(),
            Self::Cascade { root } => format!("owned by deleted node {root}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct PendingDeletions {
    reasons: HashMap<Guid, DeletionReason>,
    order: Vec<Guid>,
}

impl PendingDeletions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `guid`. The first reason recorded for a node is kept;
    /// returns false when it was already pending.
    pub fn schedule(&mut self, guid: Guid, fixer: &'static str, message: impl Into<String>) -> bool {
        self.insert(
            guid,
            DeletionReason::Scheduled {
                fixer,
                message: message.into(),
            },
        )
    }

    fn insert(&mut self, guid: Guid, reason: DeletionReason) -> bool {
        if self.reasons.contains_key(&guid) {
            return false;
        }
        self.reasons.insert(guid, reason);
        self.order.push(guid);
        true
    }

    pub fn contains(&self, guid: Guid) -> bool {
        self.reasons.contains_key(&guid)
    }

    pub fn reason(&self, guid: Guid) -> Option<&DeletionReason> {
        self.reasons.get(&guid)
    }

    /// Pending itself, or owned (transitively) by a pending node. Finalize
    /// hooks use this before the cascade has been expanded.
    pub fn is_doomed(&self, guid: Guid, index: &GlobalIndex) -> bool {
        self.contains(guid) || index.ancestors(guid).into_iter().any(|a| self.contains(a))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pending identities in scheduling order.
    pub fn iter(&self) -> impl Iterator<Item = (Guid, &DeletionReason)> {
        self.order
            .iter()
            .filter_map(|g| self.reasons.get(g).map(|r| (*g, r)))
    }

    /// Add every node owned (transitively) by a scheduled node. Returns the
    /// number of nodes added.
    pub fn expand_cascade(&mut self, index: &GlobalIndex) -> usize {
        let roots: Vec<Guid> = self
            .iter()
            .filter(|(_, r)| matches!(r, DeletionReason::Scheduled { .. }))
            .map(|(g, _)| g)
            .collect();

        let mut added = 0;
        for root in roots {
            let mut queue: VecDeque<Guid> = index.owned_children(root).iter().copied().collect();
            while let Some(child) = queue.pop_front() {
                if self.insert(child, DeletionReason::Cascade { root }) {
                    added += 1;
                    queue.extend(index.owned_children(child).iter().copied());
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mendgraph_model::Node;

    fn g(n: u128) -> Guid {
        Guid::from_u128(n)
    }

    fn index_of(edges: &[(u128, &[u128])]) -> GlobalIndex {
        let mut idx = GlobalIndex::new();
        for (owner, children) in edges {
            let mut n = Node::new("CmObject", g(*owner), None);
            let kids: Vec<Guid> = children.iter().map(|c| g(*c)).collect();
            n.set_references("Things", &kids, true);
            idx.record(&n);
        }
        idx
    }

    #[test]
    fn cascade_reaches_grandchildren_once() {
        let idx = index_of(&[(1, &[2, 3]), (2, &[4]), (4, &[5])]);
        let mut pending = PendingDeletions::new();
        pending.schedule(g(1), "test", "gone");
        pending.schedule(g(4), "test", "also gone");

        assert_eq!(pending.expand_cascade(&idx), 3);
        for n in [2, 3, 5] {
            assert!(pending.contains(g(n)), "{n}");
        }
        assert_eq!(pending.reason(g(5)), Some(&DeletionReason::Cascade { root: g(4) }));
        assert_eq!(pending.expand_cascade(&idx), 0);
    }

    #[test]
    fn first_reason_is_kept() {
        let mut pending = PendingDeletions::new();
        assert!(pending.schedule(g(1), "a", "first"));
        assert!(!pending.schedule(g(1), "b", "second"));
        assert_eq!(pending.reason(g(1)).map(|r| r.describe()).as_deref(), Some("first"));
    }

    #[test]
    fn doomed_looks_through_owners() {
        let idx = index_of(&[(1, &[2]), (2, &[3])]);
        let mut pending = PendingDeletions::new();
        pending.schedule(g(1), "test", "gone");
        assert!(pending.is_doomed(g(3), &idx));
        assert!(!pending.contains(g(3)));
    }

    #[test]
    fn cascade_survives_ownership_cycles() {
        let idx = index_of(&[(1, &[2]), (2, &[1])]);
        let mut pending = PendingDeletions::new();
        pending.schedule(g(1), "test", "gone");
        assert_eq!(pending.expand_cascade(&idx), 1);
    }
}
