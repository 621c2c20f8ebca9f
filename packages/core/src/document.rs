//! The flattened wire document: `{ "@context": ..., "@graph": [...] }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A flattened JSON-LD document as produced by [`encode`](crate::encode).
///
/// Serialises with `@context` before `@graph`; node keys are sorted, so the
/// plain serde_json output is already stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Context URL naming the registry context the nodes belong to.
    #[serde(rename = "@context")]
    pub context: String,

    /// Top-level nodes in discovery order.
    #[serde(rename = "@graph")]
    pub graph: Vec<JsonValue>,
}

impl Document {
    /// The document as a nested JSON map.
    pub fn into_map(self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert(crate::types::CONTEXT_KEYWORD.into(), JsonValue::String(self.context));
        map.insert(crate::types::GRAPH_KEYWORD.into(), JsonValue::Array(self.graph));
        map
    }

    /// RFC 8785 canonical JSON text.
    pub fn to_canonical_string(&self) -> Result<String, serde_json::Error> {
        serde_jcs::to_string(self)
    }
}
