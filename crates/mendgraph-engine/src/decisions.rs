//! Cross-fixer hand-offs.
//!
//! Finalize hooks publish here; later finalize hooks and every fix hook
//! read. A fixer that reads another fixer's decisions declares the
//! dependency so pipeline construction can check the order.

use mendgraph_model::Guid;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct Decisions {
    condemned_analyses: HashSet<Guid>,
    surviving_analyses: HashMap<Guid, Vec<Guid>>,
    sense_analysis: HashMap<Guid, Guid>,
    redirects: HashMap<Guid, Guid>,
    claimed: HashSet<(Guid, Guid)>,
    tag_normalizations: BTreeMap<String, String>,
}

impl Decisions {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Analyses
    // ------------------------------------------------------------------

    pub fn condemn_analysis(&mut self, analysis: Guid) {
        self.condemned_analyses.insert(analysis);
    }

    pub fn is_condemned_analysis(&self, analysis: Guid) -> bool {
        self.condemned_analyses.contains(&analysis)
    }

    pub fn set_surviving_analyses(&mut self, entry: Guid, analyses: Vec<Guid>) {
        self.surviving_analyses.insert(entry, analyses);
    }

    pub fn surviving_analyses(&self, entry: Guid) -> &[Guid] {
        self.surviving_analyses
            .get(&entry)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_sense_analysis(&mut self, sense: Guid, analysis: Guid) {
        self.sense_analysis.insert(sense, analysis);
    }

    pub fn sense_analysis(&self, sense: Guid) -> Option<Guid> {
        self.sense_analysis.get(&sense).copied()
    }

    // ------------------------------------------------------------------
    // Redirects and claims
    // ------------------------------------------------------------------

    /// References to `from` are to be rewritten to `to`.
    pub fn redirect(&mut self, from: Guid, to: Guid) {
        self.redirects.insert(from, to);
    }

    pub fn redirect_of(&self, guid: Guid) -> Option<Guid> {
        self.redirects.get(&guid).copied()
    }

    pub fn redirects(&self) -> impl Iterator<Item = (Guid, Guid)> + '_ {
        self.redirects.iter().map(|(a, b)| (*a, *b))
    }

    /// The reference from `holder` to `target` is repaired by a specific
    /// fixer; generic dangling-reference pruning leaves it alone.
    pub fn claim(&mut self, holder: Guid, target: Guid) {
        self.claimed.insert((holder, target));
    }

    pub fn is_claimed(&self, holder: Guid, target: Guid) -> bool {
        self.claimed.contains(&(holder, target))
    }

    // ------------------------------------------------------------------
    // Writing systems
    // ------------------------------------------------------------------

    pub fn record_tag_normalization(&mut self, old: &str, new: &str) {
        self.tag_normalizations
            .insert(old.to_string(), new.to_string());
    }

    pub fn normalized_tag(&self, old: &str) -> Option<&str> {
        self.tag_normalizations.get(old).map(String::as_str)
    }

    pub fn tag_normalizations(&self) -> &BTreeMap<String, String> {
        &self.tag_normalizations
    }
}
