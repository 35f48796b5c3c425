use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::agent::graph::{self, GraphCollaborators, DEFAULT_RETRIEVAL_K};
use crate::app_state::AppState;
use crate::http::error::AppError;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub unique_id: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub answer: String,
}

/// `POST /generate` (spec §6): runs one agent-graph invocation for the
/// given thread, serialized per-thread via the checkpointer's lease
/// (spec §4.8, §5).
pub async fn handle(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let span = tracing::info_span!("http::generate", thread_id = %request.unique_id);
    let _enter = span.enter();

    let _lease = state.checkpointer.acquire_lease(&request.unique_id).await;

    let collaborators = GraphCollaborators {
        llm: state.llm.as_ref(),
        embedder: state.embedder.as_ref(),
        index: state.index.as_ref(),
        retrieval_k: DEFAULT_RETRIEVAL_K,
        max_chats: state.config.max_chats,
    };

    let result = graph::run(
        &collaborators,
        &state.checkpointer,
        &request.unique_id,
        request.query,
    )
    .await?;

    Ok(Json(GenerateResponse {
        answer: result.generated_answer.unwrap_or_default(),
    }))
}
