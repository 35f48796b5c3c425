//! OpenAI-backed `LlmClient`, `AgentLlmClient`, and `EmbeddingClient`
//! (spec §6: `LLM.structured`, `Embed`). One blocking HTTP client
//! reused across all three roles, matching the teacher's
//! one-client-many-trait-impls shape.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agent::graph::{AgentLlmClient, RewriteOutput};
use crate::models::agent::RecentChats;
use crate::models::StructuredRecord;
use crate::pipeline::index::{EmbeddingClient, IndexError};
use crate::pipeline::structure::{LlmClient, StructureError};

const REWRITE_SYSTEM_PROMPT: &str = "\
Rewrite the user's latest question into a standalone question using the \
conversation history for context. Also decide whether answering it \
requires listing, counting, filtering, or comparing multiple documents \
rather than reading a single one. Respond with a single JSON object: \
{\"rephrased_question\": <string>, \"tool_flag\": <bool>}. No commentary.";

const GRADE_SYSTEM_PROMPT: &str = "\
You grade whether a retrieved clinical note is relevant to a question. \
Reply with exactly one word: Yes or No.";

const ANSWER_SYSTEM_PROMPT: &str = "\
Answer the question using only the provided clinical notes. If the notes \
do not contain the answer, say so plainly. Do not invent facts.";

pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    client: reqwest::blocking::Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, chat_model: &str, embedding_model: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build OpenAI HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            chat_model: chat_model.to_string(),
            embedding_model: embedding_model.to_string(),
            client,
        }
    }

    fn chat(&self, system: &str, user: &str) -> Result<String, String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            response_format: None,
        };
        self.send_chat(&url, &body)
    }

    fn chat_json(&self, system: &str, user: &str) -> Result<String, String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            response_format: Some(json!({ "type": "json_object" })),
        };
        self.send_chat(&url, &body)
    }

    fn send_chat(&self, url: &str, body: &ChatRequest) -> Result<String, String> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| format!("OpenAI request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(format!("OpenAI returned {status}: {text}"));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| format!("failed to parse OpenAI response: {e}"))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| "OpenAI returned no choices".to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl LlmClient for OpenAiClient {
    fn structured_record(&self, prompt: &str) -> Result<StructuredRecord, StructureError> {
        let content = self
            .chat_json("Respond with a single JSON object only.", prompt)
            .map_err(StructureError::LlmCall)?;
        serde_json::from_str(&content)
            .map_err(|e| StructureError::SchemaViolation(format!("malformed JSON from LLM: {e}")))
    }
}

impl AgentLlmClient for OpenAiClient {
    fn rewrite_query(&self, user_query: &str, conversation: &RecentChats) -> Result<RewriteOutput, String> {
        let history: String = conversation
            .values()
            .map(|turn| format!("Q: {}\nA: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = if history.is_empty() {
            user_query.to_string()
        } else {
            format!("Conversation so far:\n{history}\n\nLatest question: {user_query}")
        };
        let content = self.chat_json(REWRITE_SYSTEM_PROMPT, &prompt)?;
        let parsed: RewriteResponse = serde_json::from_str(&content)
            .map_err(|e| format!("malformed JSON from query rewriter: {e}"))?;
        Ok(RewriteOutput {
            rephrased_question: parsed.rephrased_question,
            tool_flag: parsed.tool_flag,
        })
    }

    fn grade_relevance(&self, question: &str, document_content: &str) -> Result<bool, String> {
        let prompt = format!("Question: {question}\n\nDocument:\n{document_content}");
        let verdict = self.chat(GRADE_SYSTEM_PROMPT, &prompt)?;
        Ok(verdict.trim().to_lowercase().starts_with("yes"))
    }

    fn generate_answer(&self, question: &str, document_contents: &[String]) -> Result<String, String> {
        let notes = document_contents.join("\n---\n");
        let prompt = format!("Clinical notes:\n{notes}\n\nQuestion: {question}");
        self.chat(ANSWER_SYSTEM_PROMPT, &prompt)
    }
}

#[derive(Deserialize)]
struct RewriteResponse {
    rephrased_question: String,
    tool_flag: bool,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

impl EmbeddingClient for OpenAiClient {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| IndexError::Embedding(format!("OpenAI embeddings request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(IndexError::Embedding(format!("OpenAI returned {status}: {text}")));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| IndexError::Embedding(format!("failed to parse embeddings response: {e}")))?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = OpenAiClient::new("https://api.openai.com/v1/", "sk-x", "gpt-4o-mini", "text-embedding-3-small");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }
}
