use serde::{Deserialize, Serialize};

/// Response shape of the medical-NLP collaborator (spec.md §6:
/// `Medical.detect_entities(text) -> { Entities: [...] }`). Stored
/// verbatim, keyed by `DocumentId`, in `EntityRecord` — normalized into
/// this typed struct rather than kept as an opaque JSON value (spec.md
/// §9 design note).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityResponse {
    #[serde(rename = "Entities")]
    pub entities: Vec<Entity>,
}

/// One detected medical entity (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Type")]
    pub entity_type: String,
    /// Confidence in `[0, 1]` (spec.md §3).
    #[serde(rename = "Score")]
    pub score: f32,
    #[serde(rename = "Attributes", default)]
    pub attributes: Vec<Attribute>,
}

/// One attribute attached to an `Entity` (spec.md §3: ordered list of
/// `{type, text}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "Type")]
    pub attribute_type: String,
    #[serde(rename = "Text")]
    pub text: String,
}
