//! Mendgraph document model
//!
//! A project document is one root element wrapping an optional block of
//! custom-field declarations and a flat sequence of `rt` node records:
//!
//! ```text
//! <languageproject version="7000072">
//!   <AdditionalFields>
//!     <CustomField class="LexEntry" name="Rank" type="Integer"/>
//!   </AdditionalFields>
//!   <rt class="LexEntry" guid="...">
//!     <Senses><objsur guid="..." t="o"/></Senses>
//!   </rt>
//!   <rt class="LexSense" guid="..." ownerguid="...">...</rt>
//! </languageproject>
//! ```
//!
//! This crate defines the typed view over that grammar and a forward-only
//! reader/writer pair. Nothing here holds more than one node in memory; the
//! repair engine builds its own derived index on top.

pub mod classes;
pub mod dates;
pub mod element;
pub mod error;
pub mod guid;
pub mod header;
pub mod node;
pub mod reader;
pub mod writer;
pub mod wstag;

pub use element::{Content, Element};
pub use error::DocumentError;
pub use guid::Guid;
pub use header::{CustomFieldDecl, CustomFieldKind, DocumentHeader};
pub use node::{Node, Surrogate};
pub use reader::{DocumentReader, Record};
pub use writer::DocumentWriter;

/// Element name of a node record.
pub const RT: &str = "rt";
/// Element name of a reference.
pub const OBJSUR: &str = "objsur";
/// Element name of a custom-field value attached to a node.
pub const CUSTOM: &str = "Custom";
/// Expected root element of a project document.
pub const ROOT_ELEMENT: &str = "languageproject";
/// Element holding custom-field declarations.
pub const ADDITIONAL_FIELDS: &str = "AdditionalFields";
