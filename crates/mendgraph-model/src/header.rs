//! Document header: the root element and the custom-field schema block.

use crate::classes::is_a;
use crate::{Element, ADDITIONAL_FIELDS};
use serde::{Deserialize, Serialize};

/// Value kind of a declared custom field (`CustomField/@type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomFieldKind {
    Integer,
    GenDate,
    Boolean,
    String,
    MultiString,
    MultiUnicode,
    ReferenceAtomic,
    ReferenceCollection,
    ReferenceSequence,
    OwningAtomic,
    OwningCollection,
    OwningSequence,
    Other(String),
}

impl CustomFieldKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "Integer" => Self::Integer,
            "GenDate" => Self::GenDate,
            "Boolean" => Self::Boolean,
            "String" => Self::String,
            "MultiString" => Self::MultiString,
            "MultiUnicode" => Self::MultiUnicode,
            "ReferenceAtomic" => Self::ReferenceAtomic,
            "ReferenceCollection" => Self::ReferenceCollection,
            "ReferenceSequence" => Self::ReferenceSequence,
            "OwningAtomic" => Self::OwningAtomic,
            "OwningCollection" => Self::OwningCollection,
            "OwningSequence" => Self::OwningSequence,
            other => Self::Other(other.to_string()),
        }
    }

    /// Kinds the rest of the system expects to always be present on a node,
    /// with a neutral default of zero.
    pub fn is_value_typed(&self) -> bool {
        matches!(self, Self::Integer | Self::GenDate)
    }
}

/// One `<CustomField class=".." name=".." type=".."/>` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDecl {
    pub class: String,
    pub name: String,
    pub kind: CustomFieldKind,
}

impl CustomFieldDecl {
    pub fn from_element(e: &Element) -> Option<Self> {
        Some(Self {
            class: e.attr("class")?.to_string(),
            name: e.attr("name")?.to_string(),
            kind: CustomFieldKind::parse(e.attr("type").unwrap_or("")),
        })
    }

    /// Whether a node of `class` carries this field.
    pub fn applies_to(&self, class: &str) -> bool {
        is_a(class, &self.class)
    }
}

/// Everything in the document before the first node record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    /// Root element name and attributes (children are not kept here).
    pub root: Element,
    /// The raw schema block, written back unchanged.
    pub additional_fields: Option<Element>,
    pub custom_fields: Vec<CustomFieldDecl>,
}

impl DocumentHeader {
    pub fn new(root: Element) -> Self {
        Self {
            root,
            additional_fields: None,
            custom_fields: Vec::new(),
        }
    }

    pub fn with_additional_fields(mut self, block: Element) -> Self {
        self.custom_fields = block
            .elements()
            .filter_map(CustomFieldDecl::from_element)
            .collect();
        self.additional_fields = Some(block);
        self
    }

    /// Build a header from declarations (tests and synthetic documents).
    pub fn with_custom_fields(root: Element, decls: Vec<CustomFieldDecl>) -> Self {
        let mut block = Element::new(ADDITIONAL_FIELDS);
        for d in &decls {
            let kind = match &d.kind {
                CustomFieldKind::Other(s) => s.clone(),
                k => format!("{k:?}"),
            };
            block.push_element(
                Element::new("CustomField")
                    .with_attr("class", d.class.as_str())
                    .with_attr("name", d.name.as_str())
                    .with_attr("type", kind),
            );
        }
        Self::new(root).with_additional_fields(block)
    }

    /// Whether a custom value named `name` is declared for nodes of `class`.
    pub fn is_declared(&self, class: &str, name: &str) -> bool {
        self.custom_fields
            .iter()
            .any(|d| d.name == name && d.applies_to(class))
    }

    pub fn fields_for<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a CustomFieldDecl> {
        self.custom_fields.iter().filter(move |d| d.applies_to(class))
    }
}
