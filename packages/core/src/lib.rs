//! Reference-preserving JSON-LD graph codec.
//!
//! This crate turns an in-memory graph of typed objects into a flattened
//! JSON-LD document (`{"@context": ..., "@graph": [...]}`) and back, keeping
//! object identity: an object reachable from several places is written once
//! as a top-level node and referenced by identifier everywhere else, and
//! decoding turns those identifiers back into one shared object.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Type metadata: [`TypeDescriptor`], [`FieldDescriptor`], [`FieldKind`] |
//! | [`object`] | Dynamic instances: [`Object`], [`Value`], [`Handle`] |
//! | [`graph`] | The [`Arena`] that owns every shareable object |
//! | [`registry`] | Contexts, type lookup by IRI, identifier aliases ([`Registry`], [`Schema`]) |
//! | [`analyzer`] | Multiple-reference detection over a root set |
//! | [`encode`](mod@encode) | Object graph → [`Document`] |
//! | [`decode`](mod@decode) | Document → object graph, two-pass |
//! | [`render`] | Human-readable text rendering of objects and arenas |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use ldgraph::{decode_from_str, encode, FieldDescriptor, FieldKind, Object, Registry, Root, TypeDescriptor};
//!
//! let person = TypeDescriptor::new("Person", "https://example.org/Person")
//!     .with_field(FieldDescriptor::id("id", "spdxId"))
//!     .with_field(FieldDescriptor::new("name", "https://example.org/name", FieldKind::string()))
//!     .build();
//! let mut registry = Registry::new();
//! registry.register_types("https://example.org/context.jsonld", [person.clone()]);
//!
//! let mut arena = ldgraph::Arena::new();
//! let h = arena.insert(Object::new(person).with("name", "Ada").unwrap());
//!
//! let doc = encode(&registry, &arena, &[Root::Handle(h)]).unwrap();
//! let json = serde_json::to_string(&doc).unwrap();
//! let decoded = decode_from_str(&registry, &json).unwrap();
//! assert!(decoded.is_complete());
//! ```

pub mod analyzer;
pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod graph;
pub mod object;
pub mod registry;
pub mod render;
pub mod types;

pub use analyzer::{ref_count, ReferenceAnalyzer, Root};
pub use decode::{decode_from_map, decode_from_reader, decode_from_str, decode_from_value, Decoded};
pub use document::Document;
pub use encode::{encode, encode_canonical, encode_to_string, encode_to_writer};
pub use error::{DecodeError, DecodeErrors, DocumentError, EncodeError, ObjectError, RegistryError};
pub use graph::Arena;
pub use object::{Handle, Object, Value};
pub use registry::{Context, ContextSchema, Registry, Schema, TypeEntry};
pub use types::{is_blank_node_id, FieldDescriptor, FieldKind, RefTarget, ScalarKind, TypeDescriptor};
