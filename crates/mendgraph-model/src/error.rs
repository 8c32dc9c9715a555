use thiserror::Error;

/// Failures that stop a document from being read or written.
///
/// These are the only hard failures of a repair run: anything that parses as
/// the expected document shape is repaired, never rejected.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("XML write error: {0}")]
    Write(#[from] quick_xml::Error),

    #[error("document is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("unexpected root element `{found}` (expected `{expected}`)")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("document has no root element")]
    MissingRoot,

    #[error("document ended before `</{element}>`")]
    Truncated { element: String },

    #[error("`{element}` element at byte {position} is missing the `{attribute}` attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
        position: u64,
    },

    #[error("invalid guid `{value}`")]
    InvalidGuid { value: String },
}
