//! Entity stage (C2, spec §4.3): `RawText` -> `EntityRecord`.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{to_pretty_json, EntityRecord, EntityResponse, RawText};
use crate::workset::diff_keyed_map;

#[derive(Error, Debug)]
pub enum EntityError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("medical-NLP collaborator call failed: {0}")]
    CollaboratorCall(String),
}

/// The medical-NLP collaborator, external to the core (spec §1, §6):
/// `Medical.detect_entities`.
pub trait MedicalEntityClient: Send + Sync {
    fn detect_entities(&self, text: &str) -> Result<EntityResponse, EntityError>;
}

/// Restrict `text_data` to `to_process` and call the collaborator per
/// document (spec §4.3). Per-document failures are logged and skipped.
pub fn detect(
    client: &dyn MedicalEntityClient,
    text_data: &RawText,
    to_process: &std::collections::HashSet<String>,
) -> EntityRecord {
    let span = tracing::info_span!("entities::detect", count = to_process.len());
    let _enter = span.enter();

    let mut out = EntityRecord::new();
    for doc_id in to_process {
        let Some(text) = text_data.get(doc_id) else {
            continue;
        };
        match client.detect_entities(text) {
            Ok(response) => {
                out.insert(doc_id.clone(), response);
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc_id, error = %e, "entity detection failed, skipping");
            }
        }
    }
    out
}

/// Diff `text_data`'s keys against the persisted `EntityRecord`, per
/// `crate::workset` (spec §4.1).
pub fn work_set(
    text_data: &RawText,
    existing: &EntityRecord,
) -> crate::workset::WorkSetDiff<String> {
    let text_data: std::collections::HashMap<String, String> =
        text_data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let existing_keys: std::collections::HashSet<String> = existing.keys().cloned().collect();
    let (diff, _) = diff_keyed_map(Some(&text_data), &existing_keys);
    diff
}

/// Merge into the persisted `EntityRecord`; last-write-wins on
/// overlapping keys (spec §4.3).
pub fn merge(existing: &mut EntityRecord, new_entities: EntityRecord) {
    existing.extend(new_entities);
}

pub fn load(path: &Path) -> Result<EntityRecord, EntityError> {
    if !path.exists() {
        return Ok(EntityRecord::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| EntityError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn persist(path: &Path, entities: &EntityRecord) -> Result<(), EntityError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EntityError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = to_pretty_json(entities)?;
    fs::write(path, json).map_err(|e| EntityError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attribute, Entity};
    use std::collections::HashSet;

    struct MockClient;

    impl MedicalEntityClient for MockClient {
        fn detect_entities(&self, text: &str) -> Result<EntityResponse, EntityError> {
            Ok(EntityResponse {
                entities: vec![Entity {
                    text: text.to_string(),
                    category: "MEDICAL_CONDITION".into(),
                    entity_type: "DX_NAME".into(),
                    score: 0.9,
                    attributes: vec![Attribute {
                        attribute_type: "ACUITY".into(),
                        text: "chronic".into(),
                    }],
                }],
            })
        }
    }

    struct FailingClient;

    impl MedicalEntityClient for FailingClient {
        fn detect_entities(&self, _text: &str) -> Result<EntityResponse, EntityError> {
            Err(EntityError::Io {
                path: PathBuf::from("x"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
            })
        }
    }

    #[test]
    fn detect_restricts_to_to_process_and_skips_missing_text() {
        let mut text_data = RawText::new();
        text_data.insert("a.png".into(), "flu symptoms".into());
        text_data.insert("b.png".into(), "headache".into());

        let mut to_process = HashSet::new();
        to_process.insert("a.png".to_string());
        to_process.insert("c.png".to_string()); // absent from text_data

        let result = detect(&MockClient, &text_data, &to_process);
        assert_eq!(result.len(), 1);
        assert!(result.contains_key("a.png"));
    }

    #[test]
    fn detect_skips_failing_documents_without_aborting() {
        let mut text_data = RawText::new();
        text_data.insert("a.png".into(), "text".into());
        let mut to_process = HashSet::new();
        to_process.insert("a.png".to_string());

        let result = detect(&FailingClient, &text_data, &to_process);
        assert!(result.is_empty());
    }

    #[test]
    fn merge_overwrites_overlapping_keys() {
        let mut existing = EntityRecord::new();
        existing.insert(
            "a.png".into(),
            EntityResponse {
                entities: vec![],
            },
        );

        let mut incoming = EntityRecord::new();
        incoming.insert(
            "a.png".into(),
            EntityResponse {
                entities: vec![Entity {
                    text: "new".into(),
                    category: "c".into(),
                    entity_type: "t".into(),
                    score: 1.0,
                    attributes: vec![],
                }],
            },
        );

        merge(&mut existing, incoming);
        assert_eq!(existing["a.png"].entities.len(), 1);
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_entities.json");

        let mut record = EntityRecord::new();
        record.insert(
            "a.png".into(),
            EntityResponse {
                entities: vec![Entity {
                    text: "flu".into(),
                    category: "MEDICAL_CONDITION".into(),
                    entity_type: "DX_NAME".into(),
                    score: 0.87,
                    attributes: vec![],
                }],
            },
        );

        persist(&path, &record).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, record);
    }
}
