//! Document persistence contracts and XML implementations.
//!
//! # Responsibility
//! - Define the load/save contract the session manager depends on.
//! - Keep markup details (tags, attribute names) inside the codec.
//!
//! # Invariants
//! - Wire tag/attribute names are a contract shared with other tooling.
//! - Reads reject malformed input instead of masking it.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod xml_codec;
pub mod xml_file_repo;

pub use xml_codec::{parse_delta, parse_document, render_delta, render_document};
pub use xml_file_repo::{MemoryDocumentRepository, XmlFileRepository};

use crate::model::document::Document;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence-layer error.
#[derive(Debug)]
pub enum RepoError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Input is not well-formed markup.
    Malformed(String),
    /// Top-level element is not a known category tag.
    UnknownCategory(String),
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    InvalidIndex {
        element: String,
        value: String,
    },
    InvalidRpcType {
        element: String,
        value: String,
    },
    /// Delta unit carries a missing or unknown `opertype`.
    InvalidChangeTag {
        element: String,
        value: Option<String>,
    },
    /// Comment text that cannot be written as a markup comment.
    InvalidComment {
        element: String,
        comment: String,
    },
    /// Repository holds no document yet.
    Empty,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at `{}`: {source}", path.display()),
            Self::Malformed(message) => write!(f, "malformed document: {message}"),
            Self::UnknownCategory(tag) => write!(f, "unknown category `{tag}`"),
            Self::MissingAttribute { element, attribute } => {
                write!(f, "element `{element}` is missing attribute `{attribute}`")
            }
            Self::InvalidIndex { element, value } => {
                write!(f, "element `{element}` has invalid EntryIndex `{value}`")
            }
            Self::InvalidRpcType { element, value } => {
                write!(f, "element `{element}` has invalid RpcType `{value}`")
            }
            Self::InvalidChangeTag { element, value } => match value {
                Some(value) => write!(f, "element `{element}` has invalid opertype `{value}`"),
                None => write!(f, "element `{element}` is missing opertype"),
            },
            Self::InvalidComment { element, comment } => write!(
                f,
                "element `{element}` has comment `{comment}` containing `--` or ending with `-`"
            ),
            Self::Empty => write!(f, "repository holds no document"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Repository interface for one persisted schema document.
pub trait DocumentRepository {
    /// Reads and decodes the persisted document.
    fn load(&self) -> RepoResult<Document>;
    /// Encodes and persists `document`, replacing previous content.
    fn save(&self, document: &Document) -> RepoResult<()>;
    /// Human-readable location used in diagnostics.
    fn location(&self) -> String;
}
