//! Decode path: flattened document → object graph.
//!
//! Decoding runs in two passes over `@graph`. The first allocates a
//! zero-valued object for every identified top-level node, so that the
//! second pass, which fills properties, can resolve references to nodes that
//! appear later in the array. Every identifier maps to exactly one object
//! for the whole call, which is what turns shared references back into
//! shared handles.
//!
//! Only document-level problems are fatal. Field-level problems are
//! collected into [`Decoded::errors`] and decoding carries on.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::error::{DecodeError, DecodeErrors, DocumentError};
use crate::graph::Arena;
use crate::object::{Handle, Object, Value};
use crate::registry::{Context, Registry};
use crate::types::{
    is_blank_node_id, FieldKind, RefTarget, ScalarKind, TypeDescriptor, CONTEXT_KEYWORD,
    GRAPH_KEYWORD, ID_KEYWORD, TYPE_KEYWORD,
};

/// The result of a decode call: the reconstructed graph plus every
/// non-fatal error met along the way.
///
/// A non-empty `errors` list means the graph is partial. Check it.
#[derive(Debug)]
#[must_use = "decode errors are only reported through `errors`"]
pub struct Decoded {
    pub arena: Arena,
    /// One handle per top-level node, in `@graph` order.
    pub roots: Vec<Handle>,
    pub errors: DecodeErrors,
}

impl Decoded {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// The graph, or the aggregated errors if there were any.
    pub fn into_result(self) -> Result<(Arena, Vec<Handle>), DecodeErrors> {
        if self.errors.is_empty() {
            Ok((self.arena, self.roots))
        } else {
            Err(self.errors)
        }
    }

    /// The first top-level object of the given structural type.
    pub fn first_of_type(&self, type_name: &str) -> Option<Handle> {
        self.roots
            .iter()
            .copied()
            .find(|h| self.arena[*h].type_name() == type_name)
    }
}

/// Decode a document that has already been parsed into a JSON map.
///
/// # Errors
///
/// Returns a [`DocumentError`] when `@context` is missing or unknown, or
/// `@graph` is missing or not an array. All other problems are reported in
/// [`Decoded::errors`].
pub fn decode_from_map(
    registry: &Registry,
    document: &Map<String, JsonValue>,
) -> Result<Decoded, DocumentError> {
    let url = document
        .get(CONTEXT_KEYWORD)
        .and_then(JsonValue::as_str)
        .ok_or(DocumentError::MissingContext)?;
    let context = registry
        .context(url)
        .ok_or_else(|| DocumentError::UnknownContext(url.to_string()))?;
    let nodes = document
        .get(GRAPH_KEYWORD)
        .and_then(JsonValue::as_array)
        .ok_or(DocumentError::MissingGraph)?;

    let mut resolver = GraphResolver::new(context);

    // one pass to create all the instances
    for node in nodes {
        if let JsonValue::Object(map) = node {
            resolver.allocate(map);
        }
    }

    // second pass to fill in all refs
    let mut roots = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let path = format!("{GRAPH_KEYWORD}[{i}]");
        if let Some(h) = resolver.resolve_ref(&RefTarget::Any, node, &path) {
            roots.push(h);
        }
    }

    let (arena, errors) = resolver.finish();
    tracing::debug!(
        context = %url,
        nodes = nodes.len(),
        objects = arena.len(),
        errors = errors.len(),
        "decoded graph"
    );
    Ok(Decoded {
        arena,
        roots,
        errors,
    })
}

/// Decode a parsed JSON value, which must be an object.
pub fn decode_from_value(registry: &Registry, document: &JsonValue) -> Result<Decoded, DocumentError> {
    match document {
        JsonValue::Object(map) => decode_from_map(registry, map),
        _ => Err(DocumentError::NotAnObject),
    }
}

pub fn decode_from_str(registry: &Registry, json: &str) -> Result<Decoded, DocumentError> {
    let value: JsonValue = serde_json::from_str(json)?;
    decode_from_value(registry, &value)
}

pub fn decode_from_reader<R: Read>(registry: &Registry, reader: R) -> Result<Decoded, DocumentError> {
    let value: JsonValue = serde_json::from_reader(reader).map_err(|e| {
        if e.is_io() {
            DocumentError::Io(e.into())
        } else {
            DocumentError::Json(e)
        }
    })?;
    decode_from_value(registry, &value)
}

/// Per-call decode state: the arena being built and the identifier table.
struct GraphResolver<'a> {
    context: &'a Context,
    arena: Arena,
    instances: HashMap<String, Handle>,
    /// Instances whose type was guessed from a bare identifier.
    guessed: HashSet<Handle>,
    errors: DecodeErrors,
}

impl<'a> GraphResolver<'a> {
    fn new(context: &'a Context) -> Self {
        Self {
            context,
            arena: Arena::new(),
            instances: HashMap::new(),
            guessed: HashSet::new(),
            errors: DecodeErrors::new(),
        }
    }

    fn finish(self) -> (Arena, DecodeErrors) {
        (self.arena, self.errors)
    }

    /// Pass 1: register an empty instance for an identified node. Problems
    /// are left for pass 2 to report.
    fn allocate(&mut self, node: &Map<String, JsonValue>) {
        let Some(descriptor) = self.node_type(node) else {
            return;
        };
        let descriptor = descriptor.clone();
        let id = node_id(node, &descriptor);
        // a conflicting duplicate is reported when pass 2 reaches it
        if !id.is_empty() && !self.instances.contains_key(id) {
            self.register(id, descriptor);
        }
    }

    fn register(&mut self, id: &str, descriptor: Arc<TypeDescriptor>) -> Handle {
        tracing::trace!(%id, type_name = %descriptor.name, "created instance");
        let h = self.arena.insert(Object::new(descriptor));
        self.instances.insert(id.to_string(), h);
        h
    }

    /// The instance for a node that declares `id` with type `descriptor`.
    ///
    /// A guessed type gives way to the declared one. Any other disagreement
    /// is an error and the existing object is left alone.
    fn declared_instance(
        &mut self,
        id: &str,
        descriptor: Arc<TypeDescriptor>,
        path: &str,
    ) -> Option<Handle> {
        let Some(&h) = self.instances.get(id) else {
            return Some(self.register(id, descriptor));
        };
        let existing = self.arena[h].type_name();
        if existing == descriptor.name {
            return Some(h);
        }
        if self.guessed.remove(&h) {
            tracing::trace!(%id, from = %existing, to = %descriptor.name, "retyping instance");
            self.arena[h] = Object::new(descriptor);
            return Some(h);
        }
        self.errors.push(DecodeError::StructuralMismatch {
            path: path.to_string(),
            expected: existing.to_string(),
            found: descriptor.name.clone(),
        });
        None
    }

    fn node_type(&self, node: &Map<String, JsonValue>) -> Option<&'a Arc<TypeDescriptor>> {
        let iri = node
            .get(TYPE_KEYWORD)
            .or_else(|| node.get(self.context.type_keyword()))
            .and_then(JsonValue::as_str)?;
        self.context.descriptor_for_iri(iri)
    }

    /// Resolve a reference-shaped value (identifier string or node map) to a
    /// handle whose type fits `target`.
    fn resolve_ref(&mut self, target: &RefTarget, incoming: &JsonValue, path: &str) -> Option<Handle> {
        match incoming {
            JsonValue::String(id) => self.resolve_id(target, id, path),
            JsonValue::Object(map) => self.resolve_node(target, map, path),
            other => {
                self.errors.push(DecodeError::UnexpectedValue {
                    path: path.to_string(),
                    value: other.to_string(),
                });
                None
            }
        }
    }

    fn resolve_id(&mut self, target: &RefTarget, id: &str, path: &str) -> Option<Handle> {
        if let Some(&h) = self.instances.get(id) {
            return self.check_assignable(h, target, path);
        }
        // Not a node in this document: a reference to an external or named
        // individual of some type the field accepts.
        let context = self.context;
        let Some(descriptor) = context.find_reference_type(target) else {
            self.errors.push(DecodeError::UnresolvableReference {
                path: path.to_string(),
                target: describe_target(target),
                id: id.to_string(),
            });
            return None;
        };
        tracing::trace!(%id, type_name = %descriptor.name, "resolved bare identifier");
        let h = self.register(id, descriptor.clone());
        self.guessed.insert(h);
        let mut props = Map::new();
        props.insert(ID_KEYWORD.to_string(), JsonValue::String(id.to_string()));
        self.fill(h, &props, path);
        Some(h)
    }

    fn resolve_node(
        &mut self,
        target: &RefTarget,
        node: &Map<String, JsonValue>,
        path: &str,
    ) -> Option<Handle> {
        let descriptor = self.declared_type(node, path)?;
        if !descriptor.is_assignable_to(target) {
            self.errors.push(DecodeError::StructuralMismatch {
                path: path.to_string(),
                expected: describe_target(target),
                found: descriptor.name.clone(),
            });
            return None;
        }
        let id = node_id(node, &descriptor);
        let h = if id.is_empty() {
            self.arena.insert(Object::new(descriptor))
        } else {
            self.declared_instance(id, descriptor, path)?
        };
        self.fill(h, node, path);
        Some(h)
    }

    fn declared_type(&mut self, node: &Map<String, JsonValue>, path: &str) -> Option<Arc<TypeDescriptor>> {
        if let Some(descriptor) = self.node_type(node) {
            return Some(descriptor.clone());
        }
        let declared = node
            .get(TYPE_KEYWORD)
            .or_else(|| node.get(self.context.type_keyword()))
            .and_then(JsonValue::as_str);
        let err = match declared {
            Some(type_iri) => DecodeError::UnknownType {
                path: path.to_string(),
                type_iri: type_iri.to_string(),
            },
            None => DecodeError::MissingType {
                path: path.to_string(),
            },
        };
        self.errors.push(err);
        None
    }

    fn check_assignable(&mut self, h: Handle, target: &RefTarget, path: &str) -> Option<Handle> {
        let descriptor = self.arena[h].descriptor();
        if descriptor.is_assignable_to(target) {
            return Some(h);
        }
        self.errors.push(DecodeError::StructuralMismatch {
            path: path.to_string(),
            expected: describe_target(target),
            found: descriptor.name.clone(),
        });
        None
    }

    /// Pass 2 proper: set the fields of arena object `h` from `node`.
    fn fill(&mut self, h: Handle, node: &Map<String, JsonValue>, path: &str) {
        let descriptor = self.arena[h].descriptor().clone();
        for (index, value) in self.struct_props(&descriptor, node, path) {
            self.arena[h].set_at(index, value);
        }
    }

    /// Decoded field values for a node of type `descriptor`, by field index.
    fn struct_props(
        &mut self,
        descriptor: &TypeDescriptor,
        node: &Map<String, JsonValue>,
        path: &str,
    ) -> Vec<(usize, Value)> {
        let mut out = Vec::new();
        for (index, field) in descriptor.fields.iter().enumerate() {
            if field.kind == FieldKind::Marker {
                continue;
            }
            let incoming = node
                .get(&field.iri)
                .or_else(|| field.compact.as_ref().and_then(|c| node.get(c)))
                .or_else(|| {
                    descriptor
                        .id_property()
                        .filter(|_| field.is_id())
                        .and_then(|p| node.get(p))
                });
            let Some(incoming) = incoming else {
                continue;
            };
            let field_path = format!("{path}.{}", field.property());

            if field.is_id() {
                if let JsonValue::String(id) = incoming {
                    let id = self.context.expand_id(&descriptor.name, id);
                    // blank identifiers are call-local; they are regenerated on output
                    if !is_blank_node_id(&id) {
                        out.push((index, Value::String(id.into_owned())));
                    }
                    continue;
                }
            }

            if let Some(value) = self.convert(&field.kind, incoming, &field_path) {
                out.push((index, value));
            }
        }
        out
    }

    /// Convert `incoming` for a slot of `kind`. `None` leaves the slot at its
    /// zero value; any reason other than absence is recorded as an error.
    fn convert(&mut self, kind: &FieldKind, incoming: &JsonValue, path: &str) -> Option<Value> {
        if incoming.is_null() {
            return None;
        }
        match kind {
            FieldKind::Marker => None,
            FieldKind::Scalar(scalar) => {
                let converted = convert_scalar(*scalar, incoming);
                if converted.is_none() {
                    self.errors.push(DecodeError::Conversion {
                        path: path.to_string(),
                        value: incoming.to_string(),
                        kind: kind.clone(),
                    });
                }
                converted
            }
            FieldKind::List(item) => {
                let single = std::slice::from_ref(incoming);
                let elements = match incoming {
                    JsonValue::Array(elements) => elements.as_slice(),
                    // try mapping a single value to a one-element list
                    _ => single,
                };
                let items = elements
                    .iter()
                    .enumerate()
                    .filter(|(_, el)| !el.is_null())
                    .filter_map(|(i, el)| self.convert(item, el, &format!("{path}[{i}]")))
                    .collect();
                Some(Value::List(items))
            }
            FieldKind::Ref(target) => self.resolve_ref(target, incoming, path).map(Value::Ref),
            FieldKind::Embedded(type_name) => self.embedded(type_name, incoming, path),
        }
    }

    fn embedded(&mut self, type_name: &str, incoming: &JsonValue, path: &str) -> Option<Value> {
        let Some(entry) = self.context.entry(type_name) else {
            self.errors.push(DecodeError::UnknownType {
                path: path.to_string(),
                type_iri: type_name.to_string(),
            });
            return None;
        };
        let descriptor = entry.descriptor().clone();
        let id_only;
        let node = match incoming {
            JsonValue::Object(map) => map,
            // named individuals just need an object with the identifier set
            JsonValue::String(id) => {
                let mut map = Map::new();
                map.insert(ID_KEYWORD.to_string(), JsonValue::String(id.clone()));
                id_only = map;
                &id_only
            }
            other => {
                self.errors.push(DecodeError::StructuralMismatch {
                    path: path.to_string(),
                    expected: type_name.to_string(),
                    found: other.to_string(),
                });
                return None;
            }
        };
        let mut object = Object::new(descriptor.clone());
        for (index, value) in self.struct_props(&descriptor, node, path) {
            object.set_at(index, value);
        }
        Some(Value::Embedded(Box::new(object)))
    }
}

/// The node's identifier: `@id`, or the type's identifier alias property.
fn node_id<'n>(node: &'n Map<String, JsonValue>, descriptor: &TypeDescriptor) -> &'n str {
    node.get(ID_KEYWORD)
        .and_then(JsonValue::as_str)
        .filter(|id| !id.is_empty())
        .or_else(|| {
            descriptor
                .id_property()
                .and_then(|p| node.get(p))
                .and_then(JsonValue::as_str)
        })
        .unwrap_or_default()
}

fn convert_scalar(kind: ScalarKind, incoming: &JsonValue) -> Option<Value> {
    match kind {
        ScalarKind::String => incoming.as_str().map(|s| Value::String(s.to_string())),
        ScalarKind::Bool => incoming.as_bool().map(Value::Bool),
        ScalarKind::Int => incoming
            .as_i64()
            .or_else(|| whole(incoming).filter(|x| *x >= i64::MIN as f64 && *x < i64::MAX as f64).map(|x| x as i64))
            .map(Value::Int),
        ScalarKind::UInt => incoming
            .as_u64()
            .or_else(|| whole(incoming).filter(|x| *x >= 0.0 && *x < u64::MAX as f64).map(|x| x as u64))
            .map(Value::UInt),
        ScalarKind::Float => incoming.as_f64().map(Value::Float),
    }
}

/// A float JSON number with no fractional part, e.g. `3.0`.
fn whole(incoming: &JsonValue) -> Option<f64> {
    incoming
        .as_f64()
        .filter(|x| x.is_finite() && x.fract() == 0.0)
}

fn describe_target(target: &RefTarget) -> String {
    FieldKind::Ref(target.clone()).to_string()
}

// --- tests -------------------------------------------------------------------
