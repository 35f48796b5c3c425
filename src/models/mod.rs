//! Core data types shared across every pipeline stage and the agent graph.
//!
//! Grouped by the lifecycle stage that produces them (spec.md §3): `ids`
//! for the join key, `entities` for the OCR/NLP artifacts (C1, C2),
//! `records` for the summarized/structured/indexed forms (C3–C5), and
//! `agent` for the online conversational state (C7–C10).

pub mod agent;
pub mod entities;
pub mod ids;
pub mod records;

pub use agent::{AgentState, ChatTurn, RecentChats};
pub use entities::{Attribute, Entity, EntityResponse};
pub use ids::DocumentId;
pub use records::{IndexedDoc, IndexedDocMetadata, StructuredRecord, SummaryRow};

use std::collections::BTreeMap;

/// `DocumentId → raw text`, produced by C1 (spec.md §3). A `BTreeMap` is
/// used rather than a `HashMap` so that persisted JSON has a stable key
/// order — required for P1 (byte-equal reruns).
pub type RawText = BTreeMap<String, String>;

/// `DocumentId → entity response`, produced by C2 (spec.md §3).
pub type EntityRecord = BTreeMap<String, EntityResponse>;

/// Serialize to pretty-printed JSON with a 4-space indent (spec.md §6),
/// matching the origin system's `json.dump(indent=4)` byte shape.
/// `serde_json::to_string_pretty` defaults to 2 spaces, so every
/// persisted artifact goes through this instead.
pub fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf).expect("JSON serialization always produces valid UTF-8"))
}
