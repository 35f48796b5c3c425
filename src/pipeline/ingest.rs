//! Ingestion orchestrator: wires C1-C5 end to end, each transition
//! gated by C6 work-set diffing against persisted artifacts (spec §2
//! data-flow diagram, §4.1).

use std::path::Path;

use thiserror::Error;

use crate::config::AppConfig;
use crate::models::EntityRecord;
use crate::pipeline::entities::{self, EntityError, MedicalEntityClient};
use crate::pipeline::index::{self, EmbeddingClient, IndexError, VectorIndex};
use crate::pipeline::ocr::{self, OcrClient, OcrError};
use crate::pipeline::structure::{self, LlmClient, StructureError};
use crate::pipeline::summarize::{self, SummarizeError};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Entity(#[from] EntityError),
    #[error(transparent)]
    Summarize(#[from] SummarizeError),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Run the full ingestion pipeline once: OCR, entity detection, tabular
/// summarization, LLM structuring, and vector indexing, each stage
/// restricted to its work-set per C6. Per-document failures inside a
/// stage are already logged and skipped by that stage; this function
/// only aborts on collaborator setup or filesystem errors that make an
/// entire stage unusable.
pub fn run(
    config: &AppConfig,
    images_dir: &Path,
    force: bool,
    ocr_client: &dyn OcrClient,
    medical_client: &dyn MedicalEntityClient,
    llm_client: &dyn LlmClient,
    embedder: &dyn EmbeddingClient,
) -> Result<IngestReport, IngestError> {
    let source_images = ocr::list_source_images(images_dir)?;

    let mut raw_text = ocr::load(&config.processed_text_path())?;
    let ocr_to_process: std::collections::HashSet<String> = if force {
        source_images.clone()
    } else {
        let existing_keys: std::collections::HashSet<String> = raw_text.keys().cloned().collect();
        source_images.difference(&existing_keys).cloned().collect()
    };

    let newly_extracted = ocr::extract(ocr_client, images_dir, &ocr_to_process);
    let extracted_count = newly_extracted.len();
    ocr::merge(&mut raw_text, newly_extracted);
    ocr::persist(&config.processed_text_path(), &raw_text)?;

    let mut entity_record = entities::load(&config.processed_entities_path())?;
    let entity_to_process = if force {
        raw_text.keys().cloned().collect()
    } else {
        entities::work_set(&raw_text, &entity_record).to_process
    };
    let new_entities = entities::detect(medical_client, &raw_text, &entity_to_process);
    let entities_detected = new_entities.len();
    entities::merge(&mut entity_record, new_entities);
    entities::persist(&config.processed_entities_path(), &entity_record)?;

    let structure_diff = if force {
        entity_record.keys().cloned().collect()
    } else {
        structuring_work_set(&entity_record, &config.structured_dir())
    };
    let mut structured_count = 0;
    let mut indexed_docs = Vec::new();
    for doc_id in &structure_diff {
        let Some(response) = entity_record.get(doc_id) else {
            continue;
        };
        let rows = summarize::summarize(response);
        summarize::persist(&config.summary_dir(), doc_id, &rows)?;

        match structure::structure_document(llm_client, doc_id, &rows) {
            Ok(record) => {
                let stem = crate::models::DocumentId::new(doc_id.clone());
                structure::persist(&config.structured_dir(), stem.stem(), &record)?;
                indexed_docs.push(index::build_indexed_doc(doc_id, &record));
                structured_count += 1;
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc_id, error = %e, "structuring failed, skipping");
            }
        }
    }

    let indexed_count = indexed_docs.len();
    if !indexed_docs.is_empty() {
        let existing = VectorIndex::load_or_empty(&config.index_dir)?;
        for doc in indexed_docs {
            let texts = [doc.content.clone()];
            let vectors = embedder.embed(&texts)?;
            let embedding = vectors
                .into_iter()
                .next()
                .ok_or_else(|| IndexError::Embedding("embedder returned no vector".into()))?;
            existing.upsert(doc, embedding, &config.index_dir)?;
        }
    }

    Ok(IngestReport {
        images_extracted: extracted_count,
        documents_with_entities: entities_detected,
        documents_structured: structured_count,
        documents_indexed: indexed_count,
    })
}

/// Documents present in the entity record that have no structured
/// record on disk yet (C6 applied to the C3/C4/C5 boundary).
fn structuring_work_set(entity_record: &EntityRecord, structured_dir: &Path) -> Vec<String> {
    entity_record
        .keys()
        .filter(|doc_id| {
            let stem = crate::models::DocumentId::new((*doc_id).clone());
            !structure::load(structured_dir, stem.stem())
                .map(|r| r.is_some())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub images_extracted: usize,
    pub documents_with_entities: usize,
    pub documents_structured: usize,
    pub documents_indexed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityResponse, StructuredRecord};

    struct StubOcr;
    impl OcrClient for StubOcr {
        fn detect_lines(&self, _image_bytes: &[u8]) -> Result<ocr::OcrResponse, OcrError> {
            Ok(ocr::OcrResponse {
                blocks: vec![ocr::OcrBlock {
                    block_type: "LINE".into(),
                    text: Some("Patient has flu".into()),
                }],
            })
        }
    }

    struct StubMedical;
    impl MedicalEntityClient for StubMedical {
        fn detect_entities(&self, _text: &str) -> Result<EntityResponse, EntityError> {
            Ok(EntityResponse {
                entities: vec![Entity {
                    text: "flu".into(),
                    category: "MEDICAL_CONDITION".into(),
                    entity_type: "DX_NAME".into(),
                    score: 0.9,
                    attributes: vec![],
                }],
            })
        }
    }

    struct StubLlm;
    impl LlmClient for StubLlm {
        fn structured_record(&self, _prompt: &str) -> Result<StructuredRecord, StructureError> {
            Ok(StructuredRecord {
                patient: "John Doe".into(),
                diagnosis: "flu".into(),
                treatment: "rest".into(),
                follow_up: "1 week".into(),
            })
        }
    }

    struct StubEmbedder;
    impl EmbeddingClient for StubEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn test_config(dir: &Path) -> AppConfig {
        AppConfig {
            openai_api_key: "sk-test".into(),
            data_dir: dir.to_path_buf(),
            index_dir: dir.join("index"),
            checkpoint_db: dir.join("checkpoints.sqlite3"),
            max_chats: 3,
            openai_base_url: "http://unused".into(),
            chat_model: "unused".into(),
            embedding_model: "unused".into(),
            ocr_endpoint: "http://unused".into(),
            medical_endpoint: "http://unused".into(),
        }
    }

    #[test]
    fn full_pipeline_ingests_one_image_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(config.raw_images_dir()).unwrap();
        std::fs::write(config.raw_images_dir().join("a.png"), b"fake-bytes").unwrap();

        let images_dir = config.raw_images_dir();
        let report = run(&config, &images_dir, false, &StubOcr, &StubMedical, &StubLlm, &StubEmbedder).unwrap();
        assert_eq!(report.images_extracted, 1);
        assert_eq!(report.documents_with_entities, 1);
        assert_eq!(report.documents_structured, 1);
        assert_eq!(report.documents_indexed, 1);

        let index = VectorIndex::load(&config.index_dir).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn rerun_with_no_new_images_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(config.raw_images_dir()).unwrap();
        std::fs::write(config.raw_images_dir().join("a.png"), b"fake-bytes").unwrap();

        let images_dir = config.raw_images_dir();
        run(&config, &images_dir, false, &StubOcr, &StubMedical, &StubLlm, &StubEmbedder).unwrap();
        let report = run(&config, &images_dir, false, &StubOcr, &StubMedical, &StubLlm, &StubEmbedder).unwrap();

        assert_eq!(report.images_extracted, 0);
        assert_eq!(report.documents_with_entities, 0);
        assert_eq!(report.documents_structured, 0);
        assert_eq!(report.documents_indexed, 0);
    }

    #[test]
    fn force_reprocesses_every_stage_even_with_no_new_images() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(config.raw_images_dir()).unwrap();
        std::fs::write(config.raw_images_dir().join("a.png"), b"fake-bytes").unwrap();

        let images_dir = config.raw_images_dir();
        run(&config, &images_dir, false, &StubOcr, &StubMedical, &StubLlm, &StubEmbedder).unwrap();
        let report = run(&config, &images_dir, true, &StubOcr, &StubMedical, &StubLlm, &StubEmbedder).unwrap();

        assert_eq!(report.images_extracted, 1);
        assert_eq!(report.documents_with_entities, 1);
        assert_eq!(report.documents_structured, 1);
    }
}
