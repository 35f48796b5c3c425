//! Summarizer stage (C3, spec §4.4): `EntityRecord` -> per-document
//! `SummaryTable`, persisted as CSV.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::entities::{Attribute, EntityResponse};
use crate::models::SummaryRow;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Build the summary table for one document: one row per entity, in
/// source order (spec §4.4).
pub fn summarize(response: &EntityResponse) -> Vec<SummaryRow> {
    response
        .entities
        .iter()
        .map(|entity| SummaryRow {
            text: entity.text.clone(),
            category: entity.category.clone(),
            entity_type: entity.entity_type.clone(),
            score: entity.score,
            attributes: flatten_attributes(&entity.attributes).unwrap_or_default(),
        })
        .collect()
}

/// Flatten an ordered attribute list to a pipe-joined `"TYPE: text | ..."`
/// string (spec §4.4). Attributes with an empty type or text are
/// dropped; `None` is returned when nothing survives, which callers
/// render as the null/empty `Attributes` cell.
pub fn flatten_attributes(attributes: &[Attribute]) -> Option<String> {
    let parts: Vec<String> = attributes
        .iter()
        .filter(|a| !a.attribute_type.trim().is_empty() && !a.text.trim().is_empty())
        .map(|a| format!("{}: {}", a.attribute_type, a.text))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

/// Parse a persisted `Attributes` cell back into `{type, text}` pairs
/// (spec §8 P7, §9: "treat Attributes as opaque display text"). Used
/// only by the round-trip property test below; C4's prompt renderer
/// never re-parses the column in production code.
pub fn parse_attributes_cell(cell: &str) -> Vec<Attribute> {
    if cell.trim().is_empty() {
        return Vec::new();
    }
    cell.split('|')
        .filter_map(|segment| {
            let segment = segment.trim();
            let (attr_type, text) = segment.split_once(':')?;
            let attr_type = attr_type.trim();
            let text = text.trim();
            if attr_type.is_empty() || text.is_empty() {
                return None;
            }
            Some(Attribute {
                attribute_type: attr_type.to_string(),
                text: text.to_string(),
            })
        })
        .collect()
}

/// Persist one document's summary table to `<DocumentId>_summary.csv`
/// with the fixed column order `Text, Category, Type, Score,
/// Attributes` (spec §6, §4.4). `doc_id` is the full basename including
/// extension (e.g. `a.png`) — deliberately distinct from the structured
/// file's `<DocumentId_stem>.json`.
pub fn persist(dir: &Path, doc_id: &str, rows: &[SummaryRow]) -> Result<(), SummarizeError> {
    fs::create_dir_all(dir).map_err(|e| SummarizeError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let path = dir.join(format!("{doc_id}_summary.csv"));
    let mut writer = csv::Writer::from_path(&path).map_err(SummarizeError::Csv)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| SummarizeError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(())
}

pub fn load(dir: &Path, doc_id: &str) -> Result<Option<Vec<SummaryRow>>, SummarizeError> {
    let path = dir.join(format!("{doc_id}_summary.csv"));
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(&path).map_err(SummarizeError::Csv)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(Some(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entities::Entity;

    #[test]
    fn flatten_attributes_joins_survivors_with_pipe() {
        let attrs = vec![
            Attribute {
                attribute_type: "ACUITY".into(),
                text: "chronic".into(),
            },
            Attribute {
                attribute_type: "DX_NAME".into(),
                text: "diabetes".into(),
            },
        ];
        assert_eq!(
            flatten_attributes(&attrs).unwrap(),
            "ACUITY: chronic | DX_NAME: diabetes"
        );
    }

    #[test]
    fn flatten_attributes_drops_blank_pairs() {
        let attrs = vec![
            Attribute {
                attribute_type: "".into(),
                text: "chronic".into(),
            },
            Attribute {
                attribute_type: "DX_NAME".into(),
                text: "".into(),
            },
        ];
        assert!(flatten_attributes(&attrs).is_none());
    }

    #[test]
    fn flatten_attributes_empty_list_is_none() {
        assert!(flatten_attributes(&[]).is_none());
    }

    #[test]
    fn summarize_preserves_entity_order() {
        let response = EntityResponse {
            entities: vec![
                Entity {
                    text: "flu".into(),
                    category: "MEDICAL_CONDITION".into(),
                    entity_type: "DX_NAME".into(),
                    score: 0.9,
                    attributes: vec![],
                },
                Entity {
                    text: "ibuprofen".into(),
                    category: "MEDICATION".into(),
                    entity_type: "GENERIC_NAME".into(),
                    score: 0.8,
                    attributes: vec![],
                },
            ],
        };
        let rows = summarize(&response);
        assert_eq!(rows[0].text, "flu");
        assert_eq!(rows[1].text, "ibuprofen");
    }

    #[test]
    fn parse_attributes_cell_round_trips_through_flatten() {
        let attrs = vec![
            Attribute {
                attribute_type: "ACUITY".into(),
                text: "chronic".into(),
            },
            Attribute {
                attribute_type: "DX_NAME".into(),
                text: "diabetes".into(),
            },
        ];
        let flattened = flatten_attributes(&attrs).unwrap();
        let parsed = parse_attributes_cell(&flattened);
        assert_eq!(parsed, attrs);
    }

    #[test]
    fn parse_attributes_cell_handles_empty_string() {
        assert!(parse_attributes_cell("").is_empty());
    }

    #[test]
    fn persist_and_load_round_trip_preserves_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![SummaryRow {
            text: "flu".into(),
            category: "MEDICAL_CONDITION".into(),
            entity_type: "DX_NAME".into(),
            score: 0.9,
            attributes: "ACUITY: chronic".into(),
        }];

        persist(dir.path(), "a.png", &rows).unwrap();

        let csv_text = fs::read_to_string(dir.path().join("a.png_summary.csv")).unwrap();
        assert!(csv_text.starts_with("Text,Category,Type,Score,Attributes"));

        let loaded = load(dir.path(), "a.png").unwrap().unwrap();
        assert_eq!(loaded, rows);
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path(), "missing").unwrap().is_none());
    }
}
