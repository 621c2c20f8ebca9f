//! Structural type metadata: the per-type descriptors the codec queries at
//! runtime.
//!
//! A [`TypeDescriptor`] names a structural type, its full and compact type
//! IRIs, and its ordered [`FieldDescriptor`]s. Each field carries a
//! [`FieldKind`] which classifies it as a scalar, a reference, an embedded
//! struct, a list, or a zero-size marker. Descriptors are produced by a
//! schema (generated bindings or [`Schema`](crate::registry::Schema) files)
//! and are immutable once registered.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The `@id` keyword. A field whose property IRI is `@id` is the identifier field.
pub const ID_KEYWORD: &str = "@id";

/// The `@type` keyword, used unless the context configures an alias.
pub const TYPE_KEYWORD: &str = "@type";

/// The `@context` document key.
pub const CONTEXT_KEYWORD: &str = "@context";

/// The `@graph` document key.
pub const GRAPH_KEYWORD: &str = "@graph";

/// Prefix of call-local synthetic identifiers, e.g. `_:CreationInfo-1`.
pub const BLANK_NODE_PREFIX: &str = "_:";

/// Primitive value kinds a scalar field can hold.
///
/// Serialises as a lowercase string (e.g. `"string"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// Unsigned 64-bit integer.
    UInt,
    /// 64-bit float.
    Float,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => write!(f, "string"),
            ScalarKind::Bool => write!(f, "bool"),
            ScalarKind::Int => write!(f, "int"),
            ScalarKind::UInt => write!(f, "uint"),
            ScalarKind::Float => write!(f, "float"),
        }
    }
}

/// What a reference field may point at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// Any registered type.
    Any,
    /// One concrete structural type (or a type implementing it).
    Type(String),
    /// An abstract interface; satisfied by every type that lists it in
    /// [`TypeDescriptor::implements`].
    Interface(String),
}

/// Structural classification of a field.
///
/// The text form, used in schema files, is:
///
/// | Text | Kind |
/// |------|------|
/// | `string` `bool` `int` `uint` `float` | [`FieldKind::Scalar`] |
/// | `marker` | [`FieldKind::Marker`] |
/// | `any` | reference to any registered type |
/// | `ref T` | reference to concrete type `T` |
/// | `dyn I` | reference to anything implementing interface `I` |
/// | `embed T` | by-value struct of type `T` |
/// | `[k]` | list of kind `k` |
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldKind {
    /// Zero-size metadata placeholder. Never encoded or decoded.
    Marker,
    Scalar(ScalarKind),
    /// Pointer/interface indirection to an arena object. The only kind that
    /// can be shared between several referrers.
    Ref(RefTarget),
    /// By-value struct. Always inlined, never shared.
    Embedded(String),
    List(Box<FieldKind>),
}

impl FieldKind {
    pub fn string() -> Self {
        FieldKind::Scalar(ScalarKind::String)
    }

    pub fn reference(type_name: impl Into<String>) -> Self {
        FieldKind::Ref(RefTarget::Type(type_name.into()))
    }

    pub fn interface(name: impl Into<String>) -> Self {
        FieldKind::Ref(RefTarget::Interface(name.into()))
    }

    pub fn list(item: FieldKind) -> Self {
        FieldKind::List(Box::new(item))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldKind::Scalar(_))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Marker => write!(f, "marker"),
            FieldKind::Scalar(s) => write!(f, "{s}"),
            FieldKind::Ref(RefTarget::Any) => write!(f, "any"),
            FieldKind::Ref(RefTarget::Type(t)) => write!(f, "ref {t}"),
            FieldKind::Ref(RefTarget::Interface(i)) => write!(f, "dyn {i}"),
            FieldKind::Embedded(t) => write!(f, "embed {t}"),
            FieldKind::List(item) => write!(f, "[{item}]"),
        }
    }
}

/// Parses the text form documented on [`FieldKind`].
///
/// Returns `Err` with a descriptive message if the string is not recognised.
impl FromStr for FieldKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated list kind {:?}", s))?;
            return Ok(FieldKind::list(inner.parse()?));
        }
        let named = |prefix: &str| {
            s.strip_prefix(prefix)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        };
        match s {
            "string" => Ok(FieldKind::Scalar(ScalarKind::String)),
            "bool" => Ok(FieldKind::Scalar(ScalarKind::Bool)),
            "int" => Ok(FieldKind::Scalar(ScalarKind::Int)),
            "uint" => Ok(FieldKind::Scalar(ScalarKind::UInt)),
            "float" => Ok(FieldKind::Scalar(ScalarKind::Float)),
            "marker" => Ok(FieldKind::Marker),
            "any" => Ok(FieldKind::Ref(RefTarget::Any)),
            _ => {
                if let Some(t) = named("ref ") {
                    Ok(FieldKind::Ref(RefTarget::Type(t)))
                } else if let Some(i) = named("dyn ") {
                    Ok(FieldKind::Ref(RefTarget::Interface(i)))
                } else if let Some(t) = named("embed ") {
                    Ok(FieldKind::Embedded(t))
                } else {
                    Err(format!(
                        "unknown field kind {:?}; expected one of: string, bool, int, \
                         uint, float, marker, any, ref <Type>, dyn <Interface>, \
                         embed <Type>, [<kind>]",
                        s
                    ))
                }
            }
        }
    }
}

impl TryFrom<String> for FieldKind {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.to_string()
    }
}

/// Metadata for one structural field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, used by [`Object::get`](crate::Object::get) and friends.
    pub name: String,

    /// Full property IRI, or `@id` for the identifier field.
    pub iri: String,

    /// Compact property name, preferred over `iri` on output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact: Option<String>,

    /// Emit the field even when it holds its zero value.
    #[serde(default)]
    pub required: bool,

    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, iri: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            iri: iri.into(),
            compact: None,
            required: false,
            kind,
        }
    }

    /// A string identifier field (`@id`) whose compact property is `compact`.
    pub fn id(name: impl Into<String>, compact: impl Into<String>) -> Self {
        Self::new(name, ID_KEYWORD, FieldKind::string()).with_compact(compact)
    }

    /// A zero-size marker field.
    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(name, "", FieldKind::Marker)
    }

    pub fn with_compact(mut self, compact: impl Into<String>) -> Self {
        self.compact = Some(compact.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_id(&self) -> bool {
        self.iri == ID_KEYWORD
    }

    /// The identifier field is always treated as required.
    pub fn is_required(&self) -> bool {
        self.required || self.is_id()
    }

    /// The property key written on output: the compact form when present.
    pub fn property(&self) -> &str {
        self.compact.as_deref().unwrap_or(&self.iri)
    }
}

/// Metadata for one structural type.
///
/// Build with [`TypeDescriptor::new`] and the `with_*` methods, then register
/// it with [`Registry::register_types`](crate::Registry::register_types).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Structural type name. Unique within a registry; used for synthetic
    /// identifiers (`_:<name>-<n>`).
    pub name: String,

    /// Full type IRI.
    pub iri: String,

    /// Compact type name, preferred over `iri` on output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact: Option<String>,

    /// Property that carries the node identifier when `@id` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_alias: Option<String>,

    /// Interfaces this type satisfies, for `dyn` reference fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iri: iri.into(),
            compact: None,
            id_alias: None,
            implements: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_compact(mut self, compact: impl Into<String>) -> Self {
        self.compact = Some(compact.into());
        self
    }

    pub fn with_id_alias(mut self, property: impl Into<String>) -> Self {
        self.id_alias = Some(property.into());
        self
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Freeze the descriptor so that objects and registries can share it.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The type IRI written on output: the compact form when present.
    pub fn type_iri(&self) -> &str {
        self.compact.as_deref().unwrap_or(&self.iri)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn id_field(&self) -> Option<(usize, &FieldDescriptor)> {
        self.fields.iter().enumerate().find(|(_, f)| f.is_id())
    }

    /// The property to read a node's identifier from when `@id` is absent.
    ///
    /// The identifier field's compact name wins over [`Self::id_alias`].
    pub fn id_property(&self) -> Option<&str> {
        self.id_field()
            .and_then(|(_, f)| f.compact.as_deref())
            .or(self.id_alias.as_deref())
    }

    /// Whether an object of this type may be stored in a field targeting `target`.
    pub fn is_assignable_to(&self, target: &RefTarget) -> bool {
        match target {
            RefTarget::Any => true,
            RefTarget::Type(name) | RefTarget::Interface(name) => {
                &self.name == name || self.implements.iter().any(|i| i == name)
            }
        }
    }

    /// Number of fields that carry data, i.e. excluding markers.
    pub fn value_field_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.kind != FieldKind::Marker)
            .count()
    }
}

/// Whether `value` is a blank-node-shaped identifier, e.g. `_:CreationInfo-1`.
pub fn is_blank_node_id(value: &str) -> bool {
    value.starts_with(BLANK_NODE_PREFIX)
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_kind_text_roundtrip() {
        for text in [
            "string",
            "uint",
            "marker",
            "any",
            "ref CreationInfo",
            "dyn Element",
            "embed Hash",
            "[dyn Agent]",
            "[[float]]",
        ] {
            let kind: FieldKind = text.parse().unwrap();
            assert_eq!(kind.to_string(), text);
        }
    }

    #[test]
    fn field_kind_rejects_unknown() {
        assert!("strnig".parse::<FieldKind>().is_err());
        assert!("ref ".parse::<FieldKind>().is_err());
        assert!("[string".parse::<FieldKind>().is_err());
    }

    #[test]
    fn field_kind_serde_uses_text_form() {
        let json = serde_json::to_string(&FieldKind::list(FieldKind::interface("Tool"))).unwrap();
        assert_eq!(json, r#""[dyn Tool]""#);
        let kind: FieldKind = serde_json::from_str(r#""ref Package""#).unwrap();
        assert_eq!(kind, FieldKind::reference("Package"));
    }

    #[test]
    fn id_property_prefers_compact_id_field() {
        let plain = TypeDescriptor::new("Node", "http://example.org/Node").with_id_alias("nodeId");
        assert_eq!(plain.id_property(), Some("nodeId"));

        let with_field = plain.with_field(FieldDescriptor::id("id", "spdxId"));
        assert_eq!(with_field.id_property(), Some("spdxId"));
        assert!(with_field.fields[0].is_required());
    }

    #[test]
    fn assignability_follows_implements() {
        let pkg = TypeDescriptor::new("Package", "http://example.org/Package")
            .implementing("Element")
            .implementing("Artifact");
        assert!(pkg.is_assignable_to(&RefTarget::Any));
        assert!(pkg.is_assignable_to(&RefTarget::Type("Package".into())));
        assert!(pkg.is_assignable_to(&RefTarget::Interface("Artifact".into())));
        assert!(!pkg.is_assignable_to(&RefTarget::Interface("Agent".into())));
    }

    #[test]
    fn blank_node_detection() {
        assert!(is_blank_node_id("_:CreationInfo-1"));
        assert!(!is_blank_node_id("http://example.org/x"));
        assert!(!is_blank_node_id(""));
    }
}
