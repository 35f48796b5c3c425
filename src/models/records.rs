use serde::{Deserialize, Serialize};

/// One flattened row of the summary table (C3, spec.md §4.3). Column
/// order is fixed — `Text, Category, Type, Score, Attributes` — since
/// this struct also drives CSV serialization via field declaration
/// order (the `csv` crate writes headers and fields in struct order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Type")]
    pub entity_type: String,
    #[serde(rename = "Score")]
    pub score: f32,
    /// Pipe-joined `type: text` pairs, or empty when the entity carried
    /// no attributes (spec.md §4.3 flattening rule).
    #[serde(rename = "Attributes")]
    pub attributes: String,
}

/// The four-field clinical summary extracted by the structuring LLM
/// (C4, spec.md §3). `deny_unknown_fields` enforces invariant 4: exactly
/// these four string fields, nothing else accepted from the model's
/// JSON output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuredRecord {
    pub patient: String,
    pub diagnosis: String,
    pub treatment: String,
    pub follow_up: String,
}

/// One document as stored in the vector index (C5, spec.md §4.6): the
/// exact rendered content string alongside retrieval metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDoc {
    pub content: String,
    pub metadata: IndexedDocMetadata,
}

/// Metadata carried alongside an indexed chunk, surfaced back to the
/// agent graph on retrieval (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocMetadata {
    pub source_file: String,
    pub patient_name: String,
}
