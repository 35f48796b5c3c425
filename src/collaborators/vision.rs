//! Generic HTTP-backed `OcrClient` and `MedicalEntityClient` (spec §6:
//! `OCR.detect_lines`, `Medical.detect_entities`). Both collaborators
//! speak the exact wire shapes the core already deserializes
//! (`OcrResponse`, `EntityResponse`); these adapters only own the
//! transport.

use std::time::Duration;

use serde::Serialize;

use crate::pipeline::entities::{EntityError, MedicalEntityClient};
use crate::pipeline::ocr::{OcrClient, OcrError, OcrResponse};
use crate::models::EntityResponse;

pub struct HttpOcrClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpOcrClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("failed to build OCR HTTP client"),
        }
    }
}

impl OcrClient for HttpOcrClient {
    fn detect_lines(&self, image_bytes: &[u8]) -> Result<OcrResponse, OcrError> {
        let url = format!("{}/detect-lines", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .map_err(|e| OcrError::CollaboratorCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(OcrError::CollaboratorCall(format!("{status}: {text}")));
        }

        response
            .json()
            .map_err(|e| OcrError::CollaboratorCall(format!("malformed response: {e}")))
    }
}

pub struct HttpMedicalEntityClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct DetectEntitiesRequest<'a> {
    text: &'a str,
}

impl HttpMedicalEntityClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("failed to build medical-NLP HTTP client"),
        }
    }
}

impl MedicalEntityClient for HttpMedicalEntityClient {
    fn detect_entities(&self, text: &str) -> Result<EntityResponse, EntityError> {
        let url = format!("{}/detect-entities", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&DetectEntitiesRequest { text })
            .send()
            .map_err(|e| EntityError::CollaboratorCall(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EntityError::CollaboratorCall(format!("{status}: {body}")));
        }

        response
            .json()
            .map_err(|e| EntityError::CollaboratorCall(format!("malformed response: {e}")))
    }
}
