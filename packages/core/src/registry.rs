//! The type registry: contexts, their type descriptors, and identifier
//! aliases.
//!
//! A [`Registry`] is populated once at start-up, either programmatically via
//! [`Registry::register_types`] or from a JSON [`Schema`], and is read-only
//! for the rest of the process. Every encode and decode call borrows it
//! immutably, so one registry can serve concurrent calls.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::object::Object;
use crate::types::{RefTarget, TypeDescriptor, TYPE_KEYWORD};

/// A registered type plus its identifier-name aliases.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    descriptor: Arc<TypeDescriptor>,
    iri_to_name: HashMap<String, String>,
    name_to_iri: HashMap<String, String>,
}

impl TypeEntry {
    fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            descriptor,
            iri_to_name: HashMap::new(),
            name_to_iri: HashMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }
}

/// A named bundle of type descriptors, identified by its context URL.
#[derive(Debug, Clone)]
pub struct Context {
    url: String,
    type_alias: Option<String>,
    types: Vec<TypeEntry>,
    by_name: HashMap<String, usize>,
    by_iri: HashMap<String, usize>,
}

impl Context {
    fn new(url: String) -> Self {
        Self {
            url,
            type_alias: None,
            types: Vec::new(),
            by_name: HashMap::new(),
            by_iri: HashMap::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn type_alias(&self) -> Option<&str> {
        self.type_alias.as_deref()
    }

    /// The key that carries a node's type: the alias when configured,
    /// otherwise `@type`.
    pub fn type_keyword(&self) -> &str {
        self.type_alias.as_deref().unwrap_or(TYPE_KEYWORD)
    }

    /// Registered descriptors in registration order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.iter().map(TypeEntry::descriptor)
    }

    pub fn entry(&self, type_name: &str) -> Option<&TypeEntry> {
        self.by_name.get(type_name).map(|&i| &self.types[i])
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.by_name.contains_key(type_name)
    }

    /// Look up a descriptor by its full or compact type IRI.
    pub fn descriptor_for_iri(&self, iri: &str) -> Option<&Arc<TypeDescriptor>> {
        self.by_iri.get(iri).map(|&i| &self.types[i].descriptor)
    }

    /// Replace a full identifier with its compact name, if one is mapped.
    pub fn compact_id<'a>(&self, type_name: &str, id: &'a str) -> Cow<'a, str> {
        match self.entry(type_name).and_then(|e| e.iri_to_name.get(id)) {
            Some(name) => Cow::Owned(name.clone()),
            None => Cow::Borrowed(id),
        }
    }

    /// Replace a compact identifier name with its full identifier, if mapped.
    pub fn expand_id<'a>(&self, type_name: &str, id: &'a str) -> Cow<'a, str> {
        match self.entry(type_name).and_then(|e| e.name_to_iri.get(id)) {
            Some(iri) => Cow::Owned(iri.clone()),
            None => Cow::Borrowed(id),
        }
    }

    /// The concrete type to instantiate for a bare identifier stored in a
    /// field targeting `target`.
    ///
    /// A concrete target resolves to itself. An interface (or `any`) resolves
    /// to the assignable type with the fewest value fields; ties go to the
    /// type registered first.
    pub fn find_reference_type(&self, target: &RefTarget) -> Option<&Arc<TypeDescriptor>> {
        if let RefTarget::Type(name) = target {
            if let Some(entry) = self.entry(name) {
                return Some(&entry.descriptor);
            }
        }
        self.types()
            .filter(|d| d.is_assignable_to(target))
            .min_by_key(|d| d.value_field_count())
    }

    fn register(&mut self, descriptor: Arc<TypeDescriptor>) {
        if self.by_name.contains_key(&descriptor.name) {
            return;
        }
        let index = self.types.len();
        self.by_name.insert(descriptor.name.clone(), index);
        self.by_iri.insert(descriptor.iri.clone(), index);
        if let Some(compact) = &descriptor.compact {
            self.by_iri.insert(compact.clone(), index);
        }
        tracing::trace!(context = %self.url, type_name = %descriptor.name, "registered type");
        self.types.push(TypeEntry::new(descriptor));
    }
}

/// All known contexts.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    contexts: Vec<Context>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a parsed [`Schema`].
    pub fn from_schema(schema: Schema) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for ctx in schema.contexts {
            registry.register_types(&ctx.url, ctx.types.into_iter().map(Arc::new));
            if let Some(alias) = ctx.type_alias {
                registry.set_type_alias(&ctx.url, alias);
            }
            for (type_name, names) in ctx.id_aliases {
                registry.map_identifier_aliases(&ctx.url, &type_name, names)?;
            }
        }
        Ok(registry)
    }

    /// Register types under `context_url`, creating the context if needed.
    ///
    /// Registering a type name that the context already knows is a no-op.
    pub fn register_types(
        &mut self,
        context_url: &str,
        descriptors: impl IntoIterator<Item = Arc<TypeDescriptor>>,
    ) -> &mut Self {
        let ctx = self.context_entry(context_url);
        for d in descriptors {
            ctx.register(d);
        }
        self
    }

    /// Use `alias` instead of `@type` as the type key in `context_url`.
    pub fn set_type_alias(&mut self, context_url: &str, alias: impl Into<String>) -> &mut Self {
        self.context_entry(context_url).type_alias = Some(alias.into());
        self
    }

    /// Register full-identifier → compact-name translations for one type.
    ///
    /// Used when identifier values are drawn from a small named set, such as
    /// enumeration individuals.
    pub fn map_identifier_aliases<I, K, V>(
        &mut self,
        context_url: &str,
        type_name: &str,
        names: I,
    ) -> Result<&mut Self, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let ctx = self.context_entry(context_url);
        let index = *ctx.by_name.get(type_name).ok_or_else(|| {
            RegistryError::UnknownType(type_name.to_string(), context_url.to_string())
        })?;
        let entry = &mut ctx.types[index];
        for (iri, name) in names {
            let (iri, name) = (iri.into(), name.into());
            entry.name_to_iri.insert(name.clone(), iri.clone());
            entry.iri_to_name.insert(iri, name);
        }
        Ok(self)
    }

    pub fn context(&self, url: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.url == url)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    /// The context that owns `type_name`, by linear scan in registration order.
    pub fn find_context_for(&self, type_name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.contains(type_name))
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.find_context_for(type_name)
            .and_then(|c| c.entry(type_name))
            .map(TypeEntry::descriptor)
    }

    /// A zero-valued object of a registered type.
    pub fn instantiate(&self, type_name: &str) -> Option<Object> {
        self.descriptor(type_name).cloned().map(Object::new)
    }

    fn context_entry(&mut self, url: &str) -> &mut Context {
        let index = match self.contexts.iter().position(|c| c.url == url) {
            Some(i) => i,
            None => {
                self.contexts.push(Context::new(url.to_string()));
                self.contexts.len() - 1
            }
        };
        &mut self.contexts[index]
    }
}

/// Serialisable registry description.
///
/// ```json
/// {
///   "contexts": [{
///     "url": "https://example.org/context.jsonld",
///     "type_alias": "type",
///     "types": [{
///       "name": "Tool",
///       "iri": "https://example.org/Tool",
///       "compact": "Tool",
///       "implements": ["Element"],
///       "fields": [
///         { "name": "id", "iri": "@id", "compact": "spdxId", "kind": "string" },
///         { "name": "name", "iri": "https://example.org/name", "compact": "name", "kind": "string" }
///       ]
///     }],
///     "id_aliases": { "Tool": { "https://example.org/Tool/gcc": "gcc" } }
///   }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    pub contexts: Vec<ContextSchema>,
}

/// One context in a [`Schema`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextSchema {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_alias: Option<String>,

    #[serde(default)]
    pub types: Vec<TypeDescriptor>,

    /// Type name → (full identifier → compact name).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub id_aliases: BTreeMap<String, BTreeMap<String, String>>,
}

impl Schema {
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDescriptor, FieldKind};

    const CTX: &str = "https://example.org/context.jsonld";

    fn element() -> Arc<TypeDescriptor> {
        TypeDescriptor::new("Element", "https://example.org/Element")
            .with_compact("Element")
            .implementing("IElement")
            .with_field(FieldDescriptor::id("id", "spdxId"))
            .build()
    }

    fn package() -> Arc<TypeDescriptor> {
        TypeDescriptor::new("Package", "https://example.org/Package")
            .with_compact("software_Package")
            .implementing("IElement")
            .with_field(FieldDescriptor::id("id", "spdxId"))
            .with_field(FieldDescriptor::new("name", "https://example.org/name", FieldKind::string()))
            .build()
    }

    fn registry() -> Registry {
        let mut r = Registry::new();
        r.register_types(CTX, [package(), element()]);
        r
    }

    #[test]
    fn register_is_idempotent() {
        let mut r = registry();
        r.register_types(CTX, [package()]);
        assert_eq!(r.context(CTX).unwrap().types().count(), 2);
    }

    #[test]
    fn lookup_by_full_and_compact_iri() {
        let r = registry();
        let ctx = r.context(CTX).unwrap();
        assert_eq!(ctx.descriptor_for_iri("software_Package").unwrap().name, "Package");
        assert_eq!(ctx.descriptor_for_iri("https://example.org/Package").unwrap().name, "Package");
        assert!(ctx.descriptor_for_iri("Nope").is_none());
        assert_eq!(r.find_context_for("Element").unwrap().url(), CTX);
        assert!(r.find_context_for("Relationship").is_none());
    }

    #[test]
    fn type_keyword_defaults_to_at_type() {
        let mut r = registry();
        assert_eq!(r.context(CTX).unwrap().type_keyword(), "@type");
        r.set_type_alias(CTX, "type");
        assert_eq!(r.context(CTX).unwrap().type_keyword(), "type");
    }

    #[test]
    fn identifier_aliases_both_directions() {
        let mut r = registry();
        r.map_identifier_aliases(CTX, "Element", [("https://example.org/Element/none", "none")])
            .unwrap();
        let ctx = r.context(CTX).unwrap();
        assert_eq!(ctx.compact_id("Element", "https://example.org/Element/none"), "none");
        assert_eq!(ctx.expand_id("Element", "none"), "https://example.org/Element/none");
        assert_eq!(ctx.expand_id("Package", "none"), "none");

        let err = r.map_identifier_aliases(CTX, "Missing", [("a", "b")]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownType(..)));
    }

    #[test]
    fn reference_type_prefers_fewest_fields() {
        let r = registry();
        let ctx = r.context(CTX).unwrap();
        let iface = RefTarget::Interface("IElement".into());
        assert_eq!(ctx.find_reference_type(&iface).unwrap().name, "Element");
        assert_eq!(ctx.find_reference_type(&RefTarget::Any).unwrap().name, "Element");
        let concrete = RefTarget::Type("Package".into());
        assert_eq!(ctx.find_reference_type(&concrete).unwrap().name, "Package");
        assert!(ctx
            .find_reference_type(&RefTarget::Interface("IAgent".into()))
            .is_none());
    }

    #[test]
    fn schema_builds_registry() {
        let json = r#"{
            "contexts": [{
                "url": "https://example.org/context.jsonld",
                "type_alias": "type",
                "types": [{
                    "name": "Tool",
                    "iri": "https://example.org/Tool",
                    "compact": "Tool",
                    "fields": [
                        { "name": "id", "iri": "@id", "compact": "spdxId", "kind": "string" },
                        { "name": "users", "iri": "https://example.org/users", "kind": "[dyn Agent]" }
                    ]
                }],
                "id_aliases": { "Tool": { "https://example.org/Tool/gcc": "gcc" } }
            }]
        }"#;
        let r = Registry::from_schema(Schema::from_json(json).unwrap()).unwrap();
        let ctx = r.context(CTX).unwrap();
        assert_eq!(ctx.type_keyword(), "type");
        assert_eq!(ctx.compact_id("Tool", "https://example.org/Tool/gcc"), "gcc");
        let tool = r.descriptor("Tool").unwrap();
        assert_eq!(tool.fields[1].kind, FieldKind::list(FieldKind::interface("Agent")));
        assert!(r.instantiate("Tool").unwrap().is_empty());
    }
}
