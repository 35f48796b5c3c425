//! OCR stage (C1, spec §4.2): raw images -> `RawText`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{to_pretty_json, RawText};

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("OCR collaborator call failed: {0}")]
    CollaboratorCall(String),
}

/// The OCR engine, external to the core (spec §1, §6): `OCR.detect_lines`.
pub trait OcrClient: Send + Sync {
    fn detect_lines(&self, image_bytes: &[u8]) -> Result<OcrResponse, OcrError>;
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OcrResponse {
    #[serde(rename = "Blocks")]
    pub blocks: Vec<OcrBlock>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OcrBlock {
    #[serde(rename = "BlockType")]
    pub block_type: String,
    #[serde(rename = "Text", default)]
    pub text: Option<String>,
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// List the basenames of files under `dir` whose extension
/// (case-insensitive) is one of `.png`/`.jpg`/`.jpeg` (spec §4.2).
pub fn list_source_images(dir: &Path) -> Result<HashSet<String>, OcrError> {
    if !dir.exists() {
        return Ok(HashSet::new());
    }

    let mut out = HashSet::new();
    for entry in fs::read_dir(dir).map_err(|e| OcrError::Io {
        path: dir.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| OcrError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                out.insert(name.to_string());
            }
        }
    }
    Ok(out)
}

/// Extract text for each document in `to_process` (spec §4.2): read its
/// image bytes, call the OCR collaborator, join `LINE` blocks in
/// document order with single spaces, trim the result. Per-image
/// failures are logged and skipped; the run does not abort.
pub fn extract(
    client: &dyn OcrClient,
    images_dir: &Path,
    to_process: &HashSet<String>,
) -> RawText {
    let span = tracing::info_span!("ocr::extract", count = to_process.len());
    let _enter = span.enter();

    let mut out = RawText::new();
    for doc_id in to_process {
        let path = images_dir.join(doc_id);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(doc_id = %doc_id, error = %e, "failed to read image, skipping");
                continue;
            }
        };

        let response = match client.detect_lines(&bytes) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(doc_id = %doc_id, error = %e, "OCR call failed, skipping");
                continue;
            }
        };

        let text = join_line_blocks(&response);
        out.insert(doc_id.clone(), text);
    }
    out
}

fn join_line_blocks(response: &OcrResponse) -> String {
    response
        .blocks
        .iter()
        .filter(|b| b.block_type == "LINE")
        .filter_map(|b| b.text.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Merge newly extracted text into the existing `RawText` file.
///
/// New keys only, existing keys untouched: this resolves spec §9's
/// open question in favor of the effective (not the literally stated)
/// semantics, matching invariant 2 (monotonicity).
pub fn merge(existing: &mut RawText, new_text: RawText) {
    for (doc_id, text) in new_text {
        existing.entry(doc_id).or_insert(text);
    }
}

pub fn load(path: &Path) -> Result<RawText, OcrError> {
    if !path.exists() {
        return Ok(RawText::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| OcrError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn persist(path: &Path, raw_text: &RawText) -> Result<(), OcrError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| OcrError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = to_pretty_json(raw_text)?;
    fs::write(path, json).map_err(|e| OcrError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockOcrClient {
        response: OcrResponse,
    }

    impl OcrClient for MockOcrClient {
        fn detect_lines(&self, _image_bytes: &[u8]) -> Result<OcrResponse, OcrError> {
            Ok(self.response.clone())
        }
    }

    struct FailingOcrClient;

    impl OcrClient for FailingOcrClient {
        fn detect_lines(&self, _image_bytes: &[u8]) -> Result<OcrResponse, OcrError> {
            Err(OcrError::Io {
                path: PathBuf::from("boom"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
            })
        }
    }

    #[test]
    fn joins_line_blocks_with_single_spaces() {
        let response = OcrResponse {
            blocks: vec![
                OcrBlock {
                    block_type: "LINE".into(),
                    text: Some("Patient: John Doe".into()),
                },
                OcrBlock {
                    block_type: "WORD".into(),
                    text: Some("Doe".into()),
                },
                OcrBlock {
                    block_type: "LINE".into(),
                    text: Some("Diagnosis: flu".into()),
                },
            ],
        };
        assert_eq!(join_line_blocks(&response), "Patient: John Doe Diagnosis: flu");
    }

    #[test]
    fn extract_skips_unreadable_images_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"fakeimage").unwrap();

        let client = FailingOcrClient;
        let mut to_process = HashSet::new();
        to_process.insert("a.png".to_string());
        to_process.insert("missing.png".to_string());

        let result = extract(&client, dir.path(), &to_process);
        assert!(result.is_empty());
    }

    #[test]
    fn extract_populates_text_for_readable_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"fakeimage").unwrap();

        let client = MockOcrClient {
            response: OcrResponse {
                blocks: vec![OcrBlock {
                    block_type: "LINE".into(),
                    text: Some("hello world".into()),
                }],
            },
        };
        let mut to_process = HashSet::new();
        to_process.insert("a.png".to_string());

        let result = extract(&client, dir.path(), &to_process);
        assert_eq!(result.get("a.png").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn list_source_images_filters_by_extension_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.PNG"), b"x").unwrap();
        fs::write(dir.path().join("b.jpeg"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let listed = list_source_images(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains("a.PNG"));
        assert!(listed.contains("b.jpeg"));
    }

    #[test]
    fn merge_keeps_existing_values_on_overlapping_keys() {
        let mut existing = RawText::new();
        existing.insert("a.png".to_string(), "original".to_string());

        let mut incoming = RawText::new();
        incoming.insert("a.png".to_string(), "overwritten".to_string());
        incoming.insert("b.png".to_string(), "new".to_string());

        merge(&mut existing, incoming);
        assert_eq!(existing.get("a.png").map(String::as_str), Some("original"));
        assert_eq!(existing.get("b.png").map(String::as_str), Some("new"));
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_text.json");

        let mut raw_text = RawText::new();
        raw_text.insert("a.png".to_string(), "hello".to_string());

        persist(&path, &raw_text).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, raw_text);
    }
}
