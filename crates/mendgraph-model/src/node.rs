//! Node records (`rt`) and their typed references (`objsur`).

use crate::{DocumentError, Element, Guid, CUSTOM, OBJSUR, RT};

/// A typed reference inside a property element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surrogate {
    /// `None` when the `guid` attribute is missing or malformed; such a
    /// reference can never resolve.
    pub target: Option<Guid>,
    /// `t="o"`: the holder is the target's single legitimate owner.
    pub owning: bool,
}

impl Surrogate {
    pub fn from_element(e: &Element) -> Self {
        Self {
            target: e.attr("guid").and_then(|g| g.parse().ok()),
            owning: e.attr("t") == Some("o"),
        }
    }

    pub fn to_element(target: Guid, owning: bool) -> Element {
        Element::new(OBJSUR)
            .with_attr("guid", target.to_string())
            .with_attr("t", if owning { "o" } else { "r" })
    }
}

/// One node record.
///
/// Identity and class tag are fixed at parse time; everything else is
/// reached through the property accessors so fixers never need to know the
/// serialization layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    guid: Guid,
    class: String,
    element: Element,
}

impl Node {
    /// Build a node from a parsed `rt` element.
    pub fn from_element(element: Element, position: u64) -> Result<Self, DocumentError> {
        let guid = element
            .attr("guid")
            .ok_or(DocumentError::MissingAttribute {
                element: RT,
                attribute: "guid",
                position,
            })?
            .parse()?;
        let class = element
            .attr("class")
            .ok_or(DocumentError::MissingAttribute {
                element: RT,
                attribute: "class",
                position,
            })?
            .to_string();
        Ok(Self {
            guid,
            class,
            element,
        })
    }

    /// Fresh node (tests and synthetic documents).
    pub fn new(class: &str, guid: Guid, owner: Option<Guid>) -> Self {
        let mut element = Element::new(RT)
            .with_attr("class", class)
            .with_attr("guid", guid.to_string());
        if let Some(owner) = owner {
            element.set_attr("ownerguid", owner.to_string());
        }
        Self {
            guid,
            class: class.to_string(),
            element,
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn into_element(self) -> Element {
        self.element
    }

    // ------------------------------------------------------------------
    // Owner
    // ------------------------------------------------------------------

    /// Raw `ownerguid` attribute, possibly malformed.
    pub fn owner_attr(&self) -> Option<&str> {
        self.element.attr("ownerguid")
    }

    /// Parsed owner; `None` when absent or malformed.
    pub fn owner(&self) -> Option<Guid> {
        self.owner_attr().and_then(|g| g.parse().ok())
    }

    pub fn set_owner(&mut self, owner: Guid) {
        self.element.set_attr("ownerguid", owner.to_string());
    }

    pub fn clear_owner(&mut self) -> Option<String> {
        self.element.remove_attr("ownerguid")
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn properties(&self) -> impl Iterator<Item = &Element> {
        self.element.elements()
    }

    pub fn properties_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.element.elements_mut()
    }

    pub fn property(&self, name: &str) -> Option<&Element> {
        self.element.child(name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.element.child_mut(name)
    }

    /// Run `edit` on the property element, appending an empty one first
    /// when the node has none.
    pub fn with_property<R>(&mut self, name: &str, edit: impl FnOnce(&mut Element) -> R) -> R {
        if let Some(property) = self.element.child_mut(name) {
            return edit(property);
        }
        let mut property = Element::new(name);
        let result = edit(&mut property);
        self.element.push_element(property);
        result
    }

    pub fn push_property(&mut self, property: Element) {
        self.element.push_element(property);
    }

    pub fn remove_property(&mut self, name: &str) -> bool {
        !self.element.retain_elements(|p| p.name != name).is_empty()
    }

    /// Keep properties for which `keep` is true; returns the removed elements.
    pub fn retain_properties<F>(&mut self, mut keep: F) -> Vec<Element>
    where
        F: FnMut(&Element) -> bool,
    {
        self.element.retain_elements(|p| keep(p))
    }

    // ------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------

    /// All references as `(property name, surrogate)` in document order.
    pub fn references(&self) -> Vec<(&str, Surrogate)> {
        let mut out = Vec::new();
        for prop in self.element.elements() {
            for sur in prop.elements().filter(|e| e.name == OBJSUR) {
                out.push((prop.name.as_str(), Surrogate::from_element(sur)));
            }
        }
        out
    }

    /// Targets of the references held in one property.
    pub fn reference_targets(&self, property: &str) -> Vec<Guid> {
        self.property(property)
            .map(|p| {
                p.elements()
                    .filter(|e| e.name == OBJSUR)
                    .filter_map(|e| Surrogate::from_element(e).target)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First target of a single-valued reference property.
    pub fn reference_target(&self, property: &str) -> Option<Guid> {
        self.reference_targets(property).into_iter().next()
    }

    /// Targets of every owning reference in the node.
    pub fn owning_targets(&self) -> Vec<Guid> {
        self.references()
            .into_iter()
            .filter(|(_, s)| s.owning)
            .filter_map(|(_, s)| s.target)
            .collect()
    }

    /// Keep references for which `keep(property, surrogate)` is true.
    ///
    /// Property elements left without any child are removed as well, since
    /// empty reference slots must not be serialized. Returns the removed
    /// `(property, surrogate)` pairs.
    pub fn retain_references<F>(&mut self, mut keep: F) -> Vec<(String, Surrogate)>
    where
        F: FnMut(&str, &Surrogate) -> bool,
    {
        let mut removed = Vec::new();
        let mut emptied = Vec::new();
        for (idx, prop) in self.element.elements_mut().enumerate() {
            if !prop.elements().any(|e| e.name == OBJSUR) {
                continue;
            }
            let name = prop.name.clone();
            let dropped = prop.retain_elements(|e| {
                if e.name != OBJSUR {
                    return true;
                }
                keep(&name, &Surrogate::from_element(e))
            });
            if dropped.is_empty() {
                continue;
            }
            for e in &dropped {
                removed.push((name.clone(), Surrogate::from_element(e)));
            }
            if !prop.has_element_children() && prop.text().trim().is_empty() {
                emptied.push(idx);
            }
        }
        if !emptied.is_empty() {
            let mut idx = 0usize;
            self.element.retain_elements(|_| {
                let keep = !emptied.contains(&idx);
                idx += 1;
                keep
            });
        }
        removed
    }

    /// Rewrite reference targets. `rewrite(property, surrogate)` returns the
    /// new target, or `None` to leave the reference alone. Returns the
    /// `(property, old, new)` triples that changed.
    pub fn rewrite_references<F>(&mut self, mut rewrite: F) -> Vec<(String, Guid, Guid)>
    where
        F: FnMut(&str, &Surrogate) -> Option<Guid>,
    {
        let mut changed = Vec::new();
        for prop in self.element.elements_mut() {
            let name = prop.name.clone();
            for sur in prop.elements_mut().filter(|e| e.name == OBJSUR) {
                let current = Surrogate::from_element(sur);
                if let Some(new_target) = rewrite(&name, &current) {
                    if current.target != Some(new_target) {
                        sur.set_attr("guid", new_target.to_string());
                        if let Some(old) = current.target {
                            changed.push((name.clone(), old, new_target));
                        }
                    }
                }
            }
        }
        changed
    }

    /// Replace the whole content of a reference property.
    pub fn set_references(&mut self, property: &str, targets: &[Guid], owning: bool) {
        if targets.is_empty() {
            self.remove_property(property);
            return;
        }
        let items = targets
            .iter()
            .map(|g| Surrogate::to_element(*g, owning))
            .collect();
        self.with_property(property, |p| p.replace_elements(items));
    }

    // ------------------------------------------------------------------
    // Scalars and multilingual alternatives
    // ------------------------------------------------------------------

    /// `val` attribute of a scalar property such as `<HomographNumber val="2"/>`.
    pub fn val(&self, property: &str) -> Option<&str> {
        self.property(property).and_then(|p| p.attr("val"))
    }

    pub fn int_val(&self, property: &str) -> Option<i64> {
        self.val(property).and_then(|v| v.trim().parse().ok())
    }

    pub fn set_val(&mut self, property: &str, value: impl Into<String>) {
        self.with_property(property, |p| p.set_attr("val", value));
    }

    /// `(ws, text)` for every alternative of a multilingual property.
    ///
    /// `AUni` alternatives carry their text directly; `AStr` alternatives
    /// hold `Run` elements whose text is concatenated.
    pub fn alternatives(&self, property: &str) -> Vec<(String, String)> {
        let Some(prop) = self.property(property) else {
            return Vec::new();
        };
        prop.elements()
            .filter_map(|alt| {
                let ws = alt.attr("ws")?;
                Some((ws.to_string(), alt.deep_text()))
            })
            .collect()
    }

    pub fn first_alternative(&self, property: &str) -> Option<(String, String)> {
        self.alternatives(property).into_iter().next()
    }

    /// Overwrite the text of the `AUni` alternative in `ws`.
    pub fn set_alternative_text(&mut self, property: &str, ws: &str, text: &str) -> bool {
        let Some(prop) = self.property_mut(property) else {
            return false;
        };
        match prop.elements_mut().find(|alt| alt.attr("ws") == Some(ws)) {
            Some(alt) => {
                alt.set_text(text);
                true
            }
            None => false,
        }
    }

    /// Text of a plain unicode property: `<Name><Uni>text</Uni></Name>`.
    pub fn uni_text(&self, property: &str) -> Option<String> {
        self.property(property)
            .and_then(|p| p.child("Uni"))
            .map(|u| u.text())
    }

    // ------------------------------------------------------------------
    // Custom field values
    // ------------------------------------------------------------------

    /// Names of the `Custom` value children attached to this node.
    pub fn custom_names(&self) -> Vec<String> {
        self.element
            .elements()
            .filter(|e| e.name == CUSTOM)
            .filter_map(|e| e.attr("name").map(str::to_string))
            .collect()
    }

    pub fn has_custom(&self, name: &str) -> bool {
        self.element
            .elements()
            .any(|e| e.name == CUSTOM && e.attr("name") == Some(name))
    }

    /// Remove `Custom` children for which `keep(name)` is false.
    pub fn retain_customs<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.element
            .retain_elements(|e| e.name != CUSTOM || keep(e.attr("name").unwrap_or("")))
            .into_iter()
            .map(|e| e.attr("name").unwrap_or("").to_string())
            .collect()
    }

    pub fn push_custom_val(&mut self, name: &str, value: &str) {
        self.element.push_element(
            Element::new(CUSTOM)
                .with_attr("name", name)
                .with_attr("val", value),
        );
    }

    /// Mutable visit over every element of the node (the `rt` element first).
    pub fn visit_elements_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        self.element.visit_mut(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(n: u128) -> Guid {
        Guid::from_u128(n)
    }

    fn entry() -> Node {
        let mut n = Node::new("LexEntry", g(1), None);
        n.set_references("Senses", &[g(2), g(3)], true);
        n.set_references("MorphoSyntaxAnalyses", &[g(4)], true);
        n.set_val("HomographNumber", "0");
        n
    }

    #[test]
    fn with_property_edits_in_place_or_appends() {
        let mut n = entry();
        n.set_val("HomographNumber", "2");
        assert_eq!(n.int_val("HomographNumber"), Some(2));
        assert_eq!(n.properties().filter(|p| p.name == "HomographNumber").count(), 1);

        let len = n.with_property("Pronunciations", |p| p.elements().count());
        assert_eq!(len, 0);
        let names: Vec<_> = n.properties().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["Senses", "MorphoSyntaxAnalyses", "HomographNumber", "Pronunciations"]
        );
    }

    #[test]
    fn references_report_kind_and_property() {
        let n = entry();
        let refs = n.references();
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|(_, s)| s.owning));
        assert_eq!(n.reference_targets("Senses"), vec![g(2), g(3)]);
        assert_eq!(n.owning_targets(), vec![g(2), g(3), g(4)]);
    }

    #[test]
    fn retain_references_drops_emptied_property() {
        let mut n = entry();
        let removed = n.retain_references(|_, s| s.target != Some(g(4)));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, "MorphoSyntaxAnalyses");
        assert!(n.property("MorphoSyntaxAnalyses").is_none());
        assert!(n.property("Senses").is_some());
    }

    #[test]
    fn rewrite_references_reports_changes() {
        let mut n = entry();
        let changed = n.rewrite_references(|_, s| (s.target == Some(g(3))).then_some(g(9)));
        assert_eq!(changed, vec![("Senses".to_string(), g(3), g(9))]);
        assert_eq!(n.reference_targets("Senses"), vec![g(2), g(9)]);
    }

    #[test]
    fn scalar_and_owner_accessors() {
        let mut n = entry();
        assert_eq!(n.int_val("HomographNumber"), Some(0));
        n.set_val("HomographNumber", "2");
        assert_eq!(n.int_val("HomographNumber"), Some(2));
        assert_eq!(n.owner(), None);
        n.set_owner(g(7));
        assert_eq!(n.owner(), Some(g(7)));
        assert!(n.clear_owner().is_some());
    }

    #[test]
    fn custom_values() {
        let mut n = entry();
        n.push_custom_val("Rank", "0");
        n.push_custom_val("Gone", "3");
        assert!(n.has_custom("Rank"));
        let removed = n.retain_customs(|name| name != "Gone");
        assert_eq!(removed, vec!["Gone".to_string()]);
        assert_eq!(n.custom_names(), vec!["Rank".to_string()]);
    }
}
