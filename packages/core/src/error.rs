//! Error types for registration, encoding, and decoding.
//!
//! Encoding is fail-fast: the first [`EncodeError`] aborts the call.
//! Decoding separates document-level failures ([`DocumentError`], fatal) from
//! per-field failures ([`DecodeError`]), which are collected into a
//! [`DecodeErrors`] list returned alongside the partial graph.

use std::fmt;

use thiserror::Error;

use crate::types::FieldKind;

/// Errors returned by [`Registry`](crate::Registry) construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("type {0:?} is not registered in context {1:?}")]
    UnknownType(String, String),

    #[error("schema is not valid JSON: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Errors returned by [`Object::set`](crate::Object::set).
#[derive(Debug, Error, PartialEq)]
pub enum ObjectError {
    #[error("type {type_name} has no field {field:?}")]
    UnknownField { type_name: String, field: String },

    #[error("field {type_name}.{field} of kind `{kind}` cannot hold {value}")]
    KindMismatch {
        type_name: String,
        field: String,
        kind: FieldKind,
        value: String,
    },
}

/// Errors that abort an encode call.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("type {0} is not registered in any context; cannot serialize: {1}")]
    UnregisteredType(String, String),

    #[error("nothing to encode: no root objects given")]
    NoRoots,

    #[error("identifier field {field} of {type_name} must hold a string, got: {value}")]
    InvalidIdField {
        type_name: String,
        field: String,
        value: String,
    },

    #[error("handle {0} does not belong to this arena")]
    UnknownHandle(usize),

    #[error("unable to convert value to JSON: {0}")]
    Unrepresentable(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that make a document undecodable as a whole.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document has no string @context")]
    MissingContext,

    #[error("unknown document @context: {0}")]
    UnknownContext(String),

    #[error("@graph array not present in root object")]
    MissingGraph,

    #[error("document root must be a JSON object")]
    NotAnObject,

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A field- or node-level decode failure. Never fatal on its own.
///
/// `path` locates the offending value, e.g. `@graph[2].creationInfo`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("{path}: node has no type")]
    MissingType { path: String },

    #[error("{path}: don't have type: {type_iri}")]
    UnknownType { path: String, type_iri: String },

    #[error("{path}: unable to determine reference type for {target} while resolving IRI reference: {id}")]
    UnresolvableReference {
        path: String,
        target: String,
        id: String,
    },

    #[error("{path}: unable to convert {value} to {kind}, dropping")]
    Conversion {
        path: String,
        value: String,
        kind: FieldKind,
    },

    #[error("{path}: {found} is not assignable to {expected}")]
    StructuralMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("{path}: unexpected data: {value}")]
    UnexpectedValue { path: String, value: String },
}

/// All non-fatal errors from one decode call, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeErrors(Vec<DecodeError>);

impl DecodeErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: DecodeError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecodeError> {
        self.0.iter()
    }
}

/// One error per line.
impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeErrors {}

impl IntoIterator for DecodeErrors {
    type Item = DecodeError;
    type IntoIter = std::vec::IntoIter<DecodeError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// --- tests -------------------------------------------------------------------
