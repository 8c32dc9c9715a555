//! Forward-only document writer.
//!
//! Layout: XML declaration, one element per line, no indentation. Elements
//! holding only text are written inline (`<Uni>word</Uni>`).

use crate::{Content, DocumentError, DocumentHeader, Element, Node};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

pub struct DocumentWriter<W: Write> {
    writer: Writer<W>,
    root_name: String,
    nodes_written: u64,
}

impl<W: Write> DocumentWriter<W> {
    /// Write the declaration, the root start tag and the custom-field block.
    pub fn new(inner: W, header: &DocumentHeader) -> Result<Self, DocumentError> {
        let mut this = Self {
            writer: Writer::new(inner),
            root_name: header.root.name.clone(),
            nodes_written: 0,
        };
        this.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        this.newline()?;
        this.writer
            .write_event(Event::Start(start_tag(&header.root)))?;
        this.newline()?;
        if let Some(block) = &header.additional_fields {
            this.write_element(block)?;
        }
        Ok(this)
    }

    pub fn write_node(&mut self, node: &Node) -> Result<(), DocumentError> {
        self.nodes_written += 1;
        self.write_element(node.element())
    }

    /// Write a top-level element (pass-through records).
    pub fn write_element(&mut self, element: &Element) -> Result<(), DocumentError> {
        self.write_tree(element)?;
        self.newline()
    }

    pub fn nodes_written(&self) -> u64 {
        self.nodes_written
    }

    /// Close the root element and flush; returns the inner sink.
    pub fn finish(mut self) -> Result<W, DocumentError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(self.root_name.as_str())))?;
        self.newline()?;
        let mut inner = self.writer.into_inner();
        inner.flush()?;
        Ok(inner)
    }

    fn newline(&mut self) -> Result<(), DocumentError> {
        self.writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    fn write_tree(&mut self, element: &Element) -> Result<(), DocumentError> {
        if element.is_empty() {
            self.writer.write_event(Event::Empty(start_tag(element)))?;
            return Ok(());
        }

        self.writer.write_event(Event::Start(start_tag(element)))?;
        if element.has_element_children() {
            self.newline()?;
            for child in element.children() {
                match child {
                    Content::Element(e) => {
                        self.write_tree(e)?;
                        self.newline()?;
                    }
                    Content::Text(t) => {
                        self.writer.write_event(Event::Text(BytesText::new(t)))?;
                    }
                }
            }
        } else {
            let text = element.text();
            self.writer
                .write_event(Event::Text(BytesText::new(&text)))?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
        Ok(())
    }
}

fn start_tag(element: &Element) -> BytesStart<'_> {
    let mut start = BytesStart::new(element.name.as_str());
    for (k, v) in element.attrs() {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    start
}
