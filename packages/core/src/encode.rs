//! Encode path: object graph → flattened document.
//!
//! The [`GraphBuilder`] walks the graph depth-first from each root. A
//! reference to an object that occurs once in the root set is inlined; a
//! reference to a shared object is replaced by its identifier, and the
//! object's node is appended to `@graph` the first time it is seen. Shared
//! objects without an identifier get a synthetic one, `_:<Type>-<n>`,
//! numbered per type from 1 within the call.

use std::collections::HashMap;
use std::io::Write;

use serde_json::{Map, Number, Value as JsonValue};

use crate::analyzer::{ReferenceAnalyzer, Root};
use crate::document::Document;
use crate::error::EncodeError;
use crate::graph::Arena;
use crate::object::{Handle, Object, Value};
use crate::registry::{Context, Registry};
use crate::types::{FieldKind, BLANK_NODE_PREFIX, ID_KEYWORD};

/// Encode `roots` and everything reachable from them.
///
/// The document's `@context` is the context of the last root's type.
///
/// # Errors
///
/// Fails on the first problem found: an unregistered type, a non-string
/// identifier, a handle from another arena, or a float JSON cannot carry.
pub fn encode(
    registry: &Registry,
    arena: &Arena,
    roots: &[Root<'_>],
) -> Result<Document, EncodeError> {
    let mut builder = GraphBuilder::new(registry, arena, roots);
    let mut context: Option<&Context> = None;
    for root in roots {
        let ctx = builder.add(*root)?;
        if let Some(prev) = context {
            if prev.url() != ctx.url() {
                tracing::warn!(
                    previous = %prev.url(),
                    current = %ctx.url(),
                    "roots span several contexts; using the last one"
                );
            }
        }
        context = Some(ctx);
    }
    let context = context.ok_or(EncodeError::NoRoots)?;
    let graph = builder.into_graph();
    tracing::debug!(
        roots = roots.len(),
        nodes = graph.len(),
        context = %context.url(),
        "encoded graph"
    );
    Ok(Document {
        context: context.url().to_string(),
        graph,
    })
}

/// Encode and write JSON followed by a newline.
pub fn encode_to_writer<W: Write>(
    mut writer: W,
    registry: &Registry,
    arena: &Arena,
    roots: &[Root<'_>],
) -> Result<(), EncodeError> {
    let doc = encode(registry, arena, roots)?;
    serde_json::to_writer(&mut writer, &doc)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Encode to a JSON string.
pub fn encode_to_string(
    registry: &Registry,
    arena: &Arena,
    roots: &[Root<'_>],
) -> Result<String, EncodeError> {
    let doc = encode(registry, arena, roots)?;
    Ok(serde_json::to_string(&doc)?)
}

/// Encode to RFC 8785 canonical JSON, suitable for byte comparison.
pub fn encode_canonical(
    registry: &Registry,
    arena: &Arena,
    roots: &[Root<'_>],
) -> Result<String, EncodeError> {
    let doc = encode(registry, arena, roots)?;
    Ok(doc.to_canonical_string()?)
}

/// Per-call encode state. Nothing here outlives the call.
pub struct GraphBuilder<'a> {
    registry: &'a Registry,
    arena: &'a Arena,
    analyzer: ReferenceAnalyzer<'a>,
    graph: Vec<JsonValue>,
    ids: HashMap<Handle, String>,
    next_id: HashMap<&'a str, usize>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registry: &'a Registry, arena: &'a Arena, roots: &'a [Root<'a>]) -> Self {
        Self {
            registry,
            arena,
            analyzer: ReferenceAnalyzer::new(arena, roots),
            graph: Vec::new(),
            ids: HashMap::new(),
            next_id: HashMap::new(),
        }
    }

    /// Convert one root. Returns the context of the root's type.
    ///
    /// Shared objects are appended to the graph during traversal; the root
    /// itself is appended afterwards unless it was one of them.
    pub fn add(&mut self, root: Root<'a>) -> Result<&'a Context, EncodeError> {
        let (node, object) = match root {
            Root::Handle(h) => (self.reference(h)?, self.object(h)?),
            Root::Value(object) => (self.struct_node(object, None)?, object),
        };
        if node.is_object() {
            self.graph.push(node);
        }
        self.context_for(object)
    }

    pub fn into_graph(self) -> Vec<JsonValue> {
        self.graph
    }

    fn object(&self, h: Handle) -> Result<&'a Object, EncodeError> {
        self.arena.get(h).ok_or(EncodeError::UnknownHandle(h.index()))
    }

    fn context_for(&self, object: &Object) -> Result<&'a Context, EncodeError> {
        self.registry
            .find_context_for(object.type_name())
            .ok_or_else(|| {
                EncodeError::UnregisteredType(object.type_name().to_string(), describe(object))
            })
    }

    fn to_value(&mut self, value: &'a Value) -> Result<JsonValue, EncodeError> {
        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Int(i) => Ok(JsonValue::from(*i)),
            Value::UInt(u) => Ok(JsonValue::from(*u)),
            Value::Float(x) => Number::from_f64(*x)
                .map(JsonValue::Number)
                .ok_or_else(|| EncodeError::Unrepresentable(x.to_string())),
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            Value::Ref(h) => self.reference(*h),
            Value::Embedded(object) => self.struct_node(object, None),
            Value::List(items) => items
                .iter()
                .map(|item| self.to_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
        }
    }

    /// A shared object becomes its identifier; anything else is inlined.
    fn reference(&mut self, h: Handle) -> Result<JsonValue, EncodeError> {
        let object = self.object(h)?;
        if self.analyzer.is_multiply_referenced(h) {
            self.ensure_identifier(h).map(JsonValue::String)
        } else {
            self.struct_node(object, Some(h))
        }
    }

    /// Build the node form of `object`. `this` is its handle when it lives
    /// in the arena.
    ///
    /// An object whose only populated property is a real identifier comes
    /// back as the bare identifier string (a named individual).
    fn struct_node(
        &mut self,
        object: &'a Object,
        this: Option<Handle>,
    ) -> Result<JsonValue, EncodeError> {
        let ctx = self.context_for(object)?;
        let descriptor = object.descriptor();

        let mut out = Map::new();
        out.insert(
            ctx.type_keyword().to_string(),
            JsonValue::String(descriptor.type_iri().to_string()),
        );

        let mut has_values = false;
        let mut id: Option<String> = None;

        for (field, value) in object.fields() {
            if field.kind == FieldKind::Marker {
                continue;
            }
            if !field.is_required() && value.is_empty() {
                continue;
            }
            let val = if field.is_id() {
                match identifier_value(object, field.name.as_str(), value)? {
                    Some(raw) => {
                        let compact = ctx.compact_id(&descriptor.name, raw).into_owned();
                        id = Some(compact.clone());
                        JsonValue::String(compact)
                    }
                    // Unidentified objects only need an identifier when they
                    // are shared and therefore referenced by it.
                    None => match self.shared(this) {
                        Some(h) => JsonValue::String(self.ensure_identifier(h)?),
                        None => continue,
                    },
                }
            } else {
                has_values = true;
                self.to_value(value)?
            };
            out.insert(field.property().to_string(), val);
        }

        if descriptor.id_field().is_none() {
            if let Some(h) = self.shared(this) {
                out.insert(ID_KEYWORD.to_string(), JsonValue::String(self.ensure_identifier(h)?));
            }
        }

        match id {
            Some(id) if !has_values => Ok(JsonValue::String(id)),
            _ => Ok(JsonValue::Object(out)),
        }
    }

    fn shared(&mut self, this: Option<Handle>) -> Option<Handle> {
        this.filter(|h| self.analyzer.is_multiply_referenced(*h))
    }

    /// The identifier references to `h` use, emitting its node on first use.
    fn ensure_identifier(&mut self, h: Handle) -> Result<String, EncodeError> {
        if let Some(id) = self.ids.get(&h) {
            return Ok(id.clone());
        }
        let object = self.object(h)?;
        let ctx = self.context_for(object)?;

        let raw = match object.descriptor().id_field() {
            Some((index, field)) => identifier_value(object, &field.name, object.value_at(index))?,
            None => None,
        };
        let id = match raw {
            Some(raw) => ctx.compact_id(object.type_name(), raw).into_owned(),
            None => {
                let seq = self.next_id.entry(object.type_name()).or_insert(0);
                *seq += 1;
                let id = format!("{BLANK_NODE_PREFIX}{}-{}", object.type_name(), seq);
                tracing::trace!(%h, id = %id, "minted blank node identifier");
                id
            }
        };
        self.ids.insert(h, id.clone());

        // a named individual is fully described by its identifier
        let node = self.struct_node(object, Some(h))?;
        if node.is_object() {
            self.graph.push(node);
        }
        Ok(id)
    }
}

/// The identifier held by an identifier field: `None` when unset.
fn identifier_value<'v>(
    object: &Object,
    field: &str,
    value: &'v Value,
) -> Result<Option<&'v str>, EncodeError> {
    match value {
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        other => Err(EncodeError::InvalidIdField {
            type_name: object.type_name().to_string(),
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Short description of an object for error messages.
fn describe(object: &Object) -> String {
    let populated: Vec<String> = object
        .fields()
        .filter(|(_, v)| !v.is_empty())
        .map(|(f, v)| format!("{}: {}", f.name, v))
        .collect();
    format!("{} {{ {} }}", object.type_name(), populated.join(", "))
}

// --- tests -------------------------------------------------------------------
