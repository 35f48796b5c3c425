//! Explicit, transport-agnostic application state (spec §9 design note:
//! "global mutable state ... becomes an explicit `App` value constructed
//! at startup and threaded into handlers"). Replaces the global
//! embeddings client / graph instance / retriever the source mixed
//! together with a single value built once in `main`.

use std::sync::Arc;

use crate::agent::checkpoint::Checkpointer;
use crate::agent::graph::AgentLlmClient;
use crate::config::AppConfig;
use crate::pipeline::index::{EmbeddingClient, VectorIndex};

/// Everything a request handler or the ingestion CLI needs, built once
/// at startup and shared read-only across concurrent invocations (spec
/// §5: "VectorIndex is opened once at startup ... embeddings and LLM
/// clients are process-wide and expected to be safe for concurrent use").
pub struct AppState {
    pub config: AppConfig,
    pub llm: Arc<dyn AgentLlmClient>,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub index: Arc<VectorIndex>,
    pub checkpointer: Arc<dyn Checkpointer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn AgentLlmClient>,
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<VectorIndex>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self {
            config,
            llm,
            embedder,
            index,
            checkpointer,
        }
    }
}
