//! A small owned element tree, used for one node record at a time.
//!
//! Attribute order is preserved so untouched nodes serialize back with the
//! attributes in the order they were read. Whitespace-only text between child
//! elements is not kept; the writer re-emits one element per line.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Content>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push_element(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an attribute in place, or append it when absent.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|(k, _)| k == key)?;
        Some(self.attrs.remove(idx).1)
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    pub fn children(&self) -> &[Content] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }

    pub fn has_element_children(&self) -> bool {
        self.children
            .iter()
            .any(|c| matches!(c, Content::Element(_)))
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    pub fn push_element(&mut self, child: Element) {
        self.children.push(Content::Element(child));
    }

    /// Append text, merging with a directly preceding text child.
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if let Some(Content::Text(prev)) = self.children.last_mut() {
            prev.push_str(&text);
            return;
        }
        self.children.push(Content::Text(text));
    }

    /// Drop whitespace-only text between child elements (indentation).
    /// Text-only elements keep their text verbatim.
    pub fn drop_layout_whitespace(&mut self) {
        if self.has_element_children() {
            self.children.retain(|c| match c {
                Content::Text(t) => !t.trim().is_empty(),
                Content::Element(_) => true,
            });
        }
    }

    /// Keep only the child elements for which `keep` returns true. Text
    /// children are untouched. Returns the removed elements in order.
    pub fn retain_elements<F>(&mut self, mut keep: F) -> Vec<Element>
    where
        F: FnMut(&Element) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            match child {
                Content::Element(e) if !keep(&e) => removed.push(e),
                other => kept.push(other),
            }
        }
        self.children = kept;
        removed
    }

    /// Replace every child element with `replacement` (keeping position of the
    /// first one; appended when there were none).
    pub fn replace_elements(&mut self, replacement: Vec<Element>) {
        let first = self
            .children
            .iter()
            .position(|c| matches!(c, Content::Element(_)))
            .unwrap_or(self.children.len());
        self.children.retain(|c| matches!(c, Content::Text(_)));
        let at = first.min(self.children.len());
        let tail = self.children.split_off(at);
        self.children
            .extend(replacement.into_iter().map(Content::Element));
        self.children.extend(tail);
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Content::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// Concatenated text of this element and every descendant, in document order.
    pub fn deep_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Content::Text(t) => out.push_str(t),
                Content::Element(e) => e.collect_text(out),
            }
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        self.children.push(Content::Text(text.into()));
    }

    /// Depth-first, pre-order visit of this element and all descendants.
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        f(self);
        for child in self.elements_mut() {
            child.visit_mut(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_attr_keeps_position() {
        let mut e = Element::new("rt")
            .with_attr("class", "LexEntry")
            .with_attr("guid", "a");
        e.set_attr("class", "LexSense");
        assert_eq!(e.attrs()[0], ("class".to_string(), "LexSense".to_string()));
        e.set_attr("ownerguid", "b");
        assert_eq!(e.attrs().len(), 3);
        assert_eq!(e.remove_attr("guid").as_deref(), Some("a"));
        assert_eq!(e.attr("guid"), None);
    }

    #[test]
    fn retain_and_replace_elements() {
        let mut e = Element::new("Senses")
            .with_child(Element::new("objsur").with_attr("guid", "1"))
            .with_child(Element::new("objsur").with_attr("guid", "2"));
        let removed = e.retain_elements(|c| c.attr("guid") != Some("1"));
        assert_eq!(removed.len(), 1);
        assert_eq!(e.elements().count(), 1);

        e.replace_elements(vec![
            Element::new("objsur").with_attr("guid", "3"),
            Element::new("objsur").with_attr("guid", "4"),
        ]);
        let guids: Vec<_> = e.elements().filter_map(|c| c.attr("guid")).collect();
        assert_eq!(guids, vec!["3", "4"]);
    }

    #[test]
    fn deep_text_concatenates_runs() {
        let e = Element::new("AStr")
            .with_attr("ws", "en")
            .with_child(Element::new("Run").with_text("ab"))
            .with_child(Element::new("Run").with_text("cd"));
        assert_eq!(e.deep_text(), "abcd");
        assert_eq!(e.text(), "");
    }
}
