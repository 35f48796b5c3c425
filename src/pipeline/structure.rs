//! Structurer stage (C4, spec §4.5): per-document `SummaryTable` ->
//! validated `StructuredRecord`, via the LLM collaborator.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{to_pretty_json, StructuredRecord, SummaryRow};

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("LLM collaborator call failed: {0}")]
    LlmCall(String),
    #[error("structured output violated the record schema: {0}")]
    SchemaViolation(String),
}

/// Retry budget for transient collaborator failures before the
/// DocumentId is skipped (spec §4.5 treats schema violations and
/// exhausted retries the same way: log and continue).
const MAX_LLM_RETRIES: usize = 2;

/// The LLM collaborator, external to the core (spec §1, §6):
/// `LLM.structured(prompt, schema)`. Schema enforcement happens inside
/// the implementation; a schema violation is a failed call.
pub trait LlmClient: Send + Sync {
    fn structured_record(&self, prompt: &str) -> Result<StructuredRecord, StructureError>;
}

const STRUCTURING_INSTRUCTION: &str = "\
Deduplicate repeated facts, correct obvious medical spelling, and \
normalize units. On conflicting values prefer the most specific and \
consistent one. Respond with exactly the fields patient, diagnosis, \
treatment, and follow_up. No extra fields, no commentary.";

/// Render a SummaryTable as a plain-text clinical note, one line per
/// row in table order (spec §4.5):
/// `<Category> (<Type>): <Text>[ | <attributes_summary>]`.
pub fn render_note(rows: &[SummaryRow]) -> String {
    rows.iter()
        .map(|row| {
            if row.attributes.is_empty() {
                format!("{} ({}): {}", row.category, row.entity_type, row.text)
            } else {
                format!(
                    "{} ({}): {} | {}",
                    row.category, row.entity_type, row.text, row.attributes
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(note: &str) -> String {
    format!("{STRUCTURING_INSTRUCTION}\n\nClinical note:\n{note}")
}

/// Validate that a parsed record has no empty field (spec §3 invariant
/// 4: "each field non-empty after C4"). `deny_unknown_fields` on
/// `StructuredRecord` already enforces the field set at deserialize
/// time; this covers the emptiness half of the contract.
pub fn validate(record: &StructuredRecord) -> Result<(), StructureError> {
    let empty_fields: Vec<&str> = [
        ("patient", &record.patient),
        ("diagnosis", &record.diagnosis),
        ("treatment", &record.treatment),
        ("follow_up", &record.follow_up),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if empty_fields.is_empty() {
        Ok(())
    } else {
        Err(StructureError::SchemaViolation(format!(
            "empty field(s): {}",
            empty_fields.join(", ")
        )))
    }
}

/// Structure one document's summary rows into a validated record,
/// retrying transient LLM call failures (not schema violations) up to
/// `MAX_LLM_RETRIES` times.
pub fn structure_document(
    client: &dyn LlmClient,
    doc_id: &str,
    rows: &[SummaryRow],
) -> Result<StructuredRecord, StructureError> {
    let span = tracing::info_span!("structure::structure_document", doc_id = %doc_id);
    let _enter = span.enter();

    let note = render_note(rows);
    let prompt = build_prompt(&note);

    let mut last_error = None;
    for attempt in 0..=MAX_LLM_RETRIES {
        match client.structured_record(&prompt) {
            Ok(record) => match validate(&record) {
                Ok(()) => return Ok(record),
                Err(e) => {
                    tracing::warn!(doc_id = %doc_id, attempt, error = %e, "structured output invalid");
                    return Err(e);
                }
            },
            Err(e) if attempt < MAX_LLM_RETRIES => {
                tracing::warn!(doc_id = %doc_id, attempt, error = %e, "LLM call failed, retrying");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error.unwrap_or_else(|| StructureError::LlmCall("exhausted retries".into())))
}

pub fn load(dir: &Path, doc_stem: &str) -> Result<Option<StructuredRecord>, StructureError> {
    let path = dir.join(format!("{doc_stem}.json"));
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path).map_err(|e| StructureError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Persist to `<doc_stem>.json`; its presence is the idempotence marker
/// consulted by C6 at this stage (spec §4.5).
pub fn persist(dir: &Path, doc_stem: &str, record: &StructuredRecord) -> Result<(), StructureError> {
    fs::create_dir_all(dir).map_err(|e| StructureError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let path = dir.join(format!("{doc_stem}.json"));
    let json = to_pretty_json(record)?;
    fs::write(&path, json).map_err(|e| StructureError::Io { path, source: e })?;
    Ok(())
}
