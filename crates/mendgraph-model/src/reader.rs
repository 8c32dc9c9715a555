//! Forward-only document reader.
//!
//! The reader parses the root element and the custom-field block eagerly,
//! then hands out one top-level record at a time. Each record is fully
//! materialized (a node is small); the document as a whole never is.

use crate::{
    DocumentError, DocumentHeader, Element, Node, ADDITIONAL_FIELDS, ROOT_ELEMENT, RT,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A top-level item after the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Node(Node),
    /// Any other top-level element; passed through unchanged.
    Other(Element),
}

pub struct DocumentReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    header: DocumentHeader,
    peeked: Option<Record>,
    finished: bool,
}

impl DocumentReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> DocumentReader<R> {
    /// Start reading; fails when the root element is not `languageproject`.
    pub fn new(inner: R) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_reader(inner);
        reader.trim_text(false);
        reader.expand_empty_elements(false);
        let mut buf = Vec::new();

        let (root, root_is_empty) = loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|source| DocumentError::Xml { position, source })?;
            match event {
                Event::Start(e) => break (element_from_start(&e, position)?, false),
                Event::Empty(e) => break (element_from_start(&e, position)?, true),
                Event::Eof => return Err(DocumentError::MissingRoot),
                Event::Text(t) if !is_blank(&t) => return Err(DocumentError::MissingRoot),
                _ => {}
            }
            buf.clear();
        };
        buf.clear();

        if root.name != ROOT_ELEMENT {
            return Err(DocumentError::UnexpectedRoot {
                expected: ROOT_ELEMENT,
                found: root.name,
            });
        }

        let mut this = Self {
            reader,
            buf,
            header: DocumentHeader::new(root),
            peeked: None,
            finished: root_is_empty,
        };

        while let Some((element, position)) = this.next_top_level()? {
            if element.name == ADDITIONAL_FIELDS {
                let header = std::mem::replace(
                    &mut this.header,
                    DocumentHeader::new(Element::new(ROOT_ELEMENT)),
                );
                this.header = header.with_additional_fields(element);
                continue;
            }
            this.peeked = Some(to_record(element, position)?);
            break;
        }

        Ok(this)
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    /// Byte offset of the reader in the underlying stream.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Next node (or pass-through element); `None` after the root closes.
    pub fn next_record(&mut self) -> Result<Option<Record>, DocumentError> {
        if let Some(record) = self.peeked.take() {
            return Ok(Some(record));
        }
        match self.next_top_level()? {
            Some((element, position)) => Ok(Some(to_record(element, position)?)),
            None => Ok(None),
        }
    }

    fn next_top_level(&mut self) -> Result<Option<(Element, u64)>, DocumentError> {
        if self.finished {
            return Ok(None);
        }
        loop {
            let position = self.reader.buffer_position() as u64;
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|source| DocumentError::Xml { position, source })?;
            let outcome = match event {
                Event::Start(e) => {
                    let start = element_from_start(&e, position)?;
                    self.buf.clear();
                    let element = read_subtree(&mut self.reader, &mut self.buf, start)?;
                    Some(Some((element, position)))
                }
                Event::Empty(e) => Some(Some((element_from_start(&e, position)?, position))),
                Event::End(_) => {
                    self.finished = true;
                    Some(None)
                }
                Event::Eof => {
                    return Err(DocumentError::Truncated {
                        element: self.header.root.name.clone(),
                    })
                }
                _ => None,
            };
            self.buf.clear();
            if let Some(result) = outcome {
                return Ok(result);
            }
        }
    }
}

fn to_record(element: Element, position: u64) -> Result<Record, DocumentError> {
    if element.name == RT {
        Ok(Record::Node(Node::from_element(element, position)?))
    } else {
        Ok(Record::Other(element))
    }
}

fn is_blank(t: &quick_xml::events::BytesText<'_>) -> bool {
    t.iter().all(|b| b.is_ascii_whitespace())
}

fn element_from_start(e: &BytesStart<'_>, position: u64) -> Result<Element, DocumentError> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| DocumentError::Xml {
            position,
            source: err.into(),
        })?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|source| DocumentError::Xml { position, source })?
            .into_owned();
        element.set_attr(key, value);
    }
    Ok(element)
}

/// Read events until `start` is closed, returning the completed element.
fn read_subtree<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    start: Element,
) -> Result<Element, DocumentError> {
    let mut stack = vec![start];
    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event_into(buf)
            .map_err(|source| DocumentError::Xml { position, source })?;
        match event {
            Event::Start(e) => stack.push(element_from_start(&e, position)?),
            Event::Empty(e) => {
                let child = element_from_start(&e, position)?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_element(child);
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|source| DocumentError::Xml { position, source })?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(text.into_owned());
                }
            }
            Event::CData(c) => {
                let text = std::str::from_utf8(&c[..])?.to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(text);
                }
            }
            Event::End(_) => {
                let mut done = match stack.pop() {
                    Some(done) => done,
                    None => return Err(DocumentError::MissingRoot),
                };
                done.drop_layout_whitespace();
                match stack.last_mut() {
                    Some(parent) => parent.push_element(done),
                    None => {
                        buf.clear();
                        return Ok(done);
                    }
                }
            }
            Event::Eof => {
                let element = stack
                    .first()
                    .map(|e| e.name.clone())
                    .unwrap_or_default();
                return Err(DocumentError::Truncated { element });
            }
            _ => {}
        }
        buf.clear();
    }
}
