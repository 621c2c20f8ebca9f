//! A small SPDX-shaped model shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ldgraph::{
    encode, Arena, Document, FieldDescriptor, FieldKind, Handle, Registry, Root, TypeDescriptor,
};

pub const SPDX_CONTEXT: &str = "https://spdx.org/rdf/3.0.0/spdx-context.jsonld";
const NS: &str = "https://spdx.org/rdf/3.0.0/terms";

fn prop(name: &str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor::new(name, format!("{NS}/Core/{name}"), kind).with_compact(name)
}

fn class(name: &str, compact: &str) -> TypeDescriptor {
    TypeDescriptor::new(name, format!("{NS}/Core/{name}")).with_compact(compact)
}

/// An element-like class: identifier, name, creation info.
fn element_class(name: &str, compact: &str) -> TypeDescriptor {
    class(name, compact)
        .implementing("IElement")
        .with_field(FieldDescriptor::id("id", "spdxId"))
        .with_field(prop("name", FieldKind::string()))
        .with_field(prop("creationInfo", FieldKind::reference("CreationInfo")))
}

pub struct Spdx {
    pub registry: Registry,
    pub element: Arc<TypeDescriptor>,
    pub creation_info: Arc<TypeDescriptor>,
    pub agent: Arc<TypeDescriptor>,
    pub tool: Arc<TypeDescriptor>,
    pub external_identifier: Arc<TypeDescriptor>,
    pub external_identifier_type: Arc<TypeDescriptor>,
    pub package: Arc<TypeDescriptor>,
    pub ai_package: Arc<TypeDescriptor>,
    pub file: Arc<TypeDescriptor>,
    pub relationship: Arc<TypeDescriptor>,
    pub relationship_type: Arc<TypeDescriptor>,
    pub profile_identifier_type: Arc<TypeDescriptor>,
    pub document: Arc<TypeDescriptor>,
}

impl Spdx {
    pub fn new() -> Self {
        // registered first so bare element references resolve to it
        let element = class("Element", "Element")
            .implementing("IElement")
            .with_field(FieldDescriptor::id("id", "spdxId"))
            .build();
        let creation_info = class("CreationInfo", "CreationInfo")
            .with_field(FieldDescriptor::id("id", "@id"))
            .with_field(prop("comment", FieldKind::string()))
            .with_field(prop("created", FieldKind::string()))
            .with_field(prop("createdBy", FieldKind::list(FieldKind::interface("IAgent"))))
            .with_field(prop("createdUsing", FieldKind::list(FieldKind::interface("ITool"))))
            .with_field(prop("specVersion", FieldKind::string()))
            .build();
        let agent = element_class("SoftwareAgent", "SoftwareAgent")
            .implementing("IAgent")
            .with_field(prop("summary", FieldKind::string()))
            .build();
        let tool = element_class("Tool", "Tool")
            .implementing("ITool")
            .with_field(prop(
                "externalIdentifier",
                FieldKind::list(FieldKind::reference("ExternalIdentifier")),
            ))
            .build();
        let external_identifier = class("ExternalIdentifier", "ExternalIdentifier")
            .with_field(prop(
                "externalIdentifierType",
                FieldKind::reference("ExternalIdentifierType"),
            ))
            .with_field(prop("identifier", FieldKind::string()))
            .build();
        let external_identifier_type = class("ExternalIdentifierType", "ExternalIdentifierType")
            .with_field(FieldDescriptor::id("id", "@id"))
            .build();
        let package = element_class("Package", "software_Package")
            .implementing("IPackage")
            .with_field(prop("packageVersion", FieldKind::string()))
            .build();
        let ai_package = element_class("AIPackage", "ai_AIPackage")
            .implementing("IPackage")
            .with_field(prop("typeOfModel", FieldKind::list(FieldKind::string())))
            .build();
        let file = element_class("File", "software_File").implementing("IFile").build();
        let relationship = class("Relationship", "Relationship")
            .implementing("IElement")
            .with_field(FieldDescriptor::id("id", "spdxId"))
            .with_field(prop("creationInfo", FieldKind::reference("CreationInfo")))
            .with_field(prop("from", FieldKind::interface("IElement")))
            .with_field(prop("relationshipType", FieldKind::reference("RelationshipType")))
            .with_field(prop("to", FieldKind::list(FieldKind::interface("IElement"))))
            .build();
        let relationship_type = class("RelationshipType", "RelationshipType")
            .with_field(FieldDescriptor::id("id", "@id"))
            .build();
        let profile_identifier_type = class("ProfileIdentifierType", "ProfileIdentifierType")
            .with_field(FieldDescriptor::id("id", "@id"))
            .build();
        let document = element_class("SpdxDocument", "SpdxDocument")
            .with_field(prop("element", FieldKind::list(FieldKind::interface("IElement"))))
            .with_field(prop(
                "profileConformance",
                FieldKind::list(FieldKind::reference("ProfileIdentifierType")),
            ))
            .build();

        let mut registry = Registry::new();
        registry
            .register_types(
                SPDX_CONTEXT,
                [
                    element.clone(),
                    creation_info.clone(),
                    agent.clone(),
                    tool.clone(),
                    external_identifier.clone(),
                    external_identifier_type.clone(),
                    package.clone(),
                    ai_package.clone(),
                    file.clone(),
                    relationship.clone(),
                    relationship_type.clone(),
                    profile_identifier_type.clone(),
                    document.clone(),
                ],
            )
            .set_type_alias(SPDX_CONTEXT, "type");
        let individuals = |ty: &str, names: &[&str]| -> Vec<(String, String)> {
            names
                .iter()
                .map(|n| (format!("{NS}/Core/{ty}/{n}"), n.to_string()))
                .collect()
        };
        registry
            .map_identifier_aliases(
                SPDX_CONTEXT,
                "RelationshipType",
                individuals("RelationshipType", &["contains", "dependsOn"]),
            )
            .and_then(|r| {
                r.map_identifier_aliases(
                    SPDX_CONTEXT,
                    "ExternalIdentifierType",
                    individuals("ExternalIdentifierType", &["cpe23"]),
                )
            })
            .and_then(|r| {
                r.map_identifier_aliases(
                    SPDX_CONTEXT,
                    "ProfileIdentifierType",
                    individuals("ProfileIdentifierType", &["software"]),
                )
            })
            .unwrap();

        Self {
            registry,
            element,
            creation_info,
            agent,
            tool,
            external_identifier,
            external_identifier_type,
            package,
            ai_package,
            file,
            relationship,
            relationship_type,
            profile_identifier_type,
            document,
        }
    }

    /// The full identifier of a named individual of `ty`.
    pub fn individual(ty: &str, name: &str) -> String {
        format!("{NS}/Core/{ty}/{name}")
    }
}

pub fn to_pretty(doc: &Document) -> String {
    serde_json::to_string_pretty(doc).unwrap()
}

/// Encode `root`, decode the JSON, find the first decoded node of the same
/// type, and encode that again. Both JSON texts must be identical.
pub fn encode_decode_recode(registry: &Registry, arena: &Arena, root: Handle) -> (Arena, Handle) {
    let json1 = to_pretty(&encode(registry, arena, &[Root::Handle(root)]).unwrap());

    let decoded = ldgraph::decode_from_str(registry, &json1).unwrap();
    assert!(decoded.is_complete(), "decode errors: {}\njson: {json1}", decoded.errors);
    let type_name = arena[root].type_name();
    let got = decoded
        .first_of_type(type_name)
        .unwrap_or_else(|| panic!("did not find {type_name} in graph, json: {json1}"));

    let json2 = to_pretty(&encode(registry, &decoded.arena, &[Root::Handle(got)]).unwrap());
    assert_eq!(json1, json2, "re-encoded document differs");
    (decoded.arena, got)
}
