//! Agent graph (C7, spec §4.7): a directed state machine over
//! `AgentState`, modeled as an explicit `NodeId` plus transition
//! function — data, not framework-level decorator magic (spec §9).
//!
//! ```text
//! START -> query_rewriter -> doc_retriever -> doc_grader
//! doc_grader --[proceed_to_generate]--> answer_generation -> END
//! doc_grader --[!proceed_to_generate]--> fallback_agent   -> END
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::agent::checkpoint::{CheckpointError, Checkpointer};
use crate::agent::memory;
use crate::agent::router::{no_relevant_docs, RouteTarget};
use crate::models::agent::AgentState;
use crate::models::ids::ThreadId;
use crate::pipeline::index::{EmbeddingClient, IndexError, VectorIndex};

pub const FALLBACK_MESSAGE: &str =
    "I'm sorry, I don't have enough information in your records to answer that.";

/// Default number of documents retrieved per query (spec §4.7: "default
/// k=1; implementation may expose k as a config option").
pub const DEFAULT_RETRIEVAL_K: usize = 1;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),
    #[error("LLM call failed in node {node}: {message}")]
    LlmFailure { node: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    QueryRewriter,
    DocRetriever,
    DocGrader,
    AnswerGeneration,
    FallbackAgent,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::QueryRewriter => "query_rewriter",
            NodeId::DocRetriever => "doc_retriever",
            NodeId::DocGrader => "doc_grader",
            NodeId::AnswerGeneration => "answer_generation",
            NodeId::FallbackAgent => "fallback_agent",
        }
    }
}

/// The LLM collaborator as consumed by the agent graph (spec §6:
/// `LLM.structured`), split into the three call shapes the graph's
/// nodes need.
pub trait AgentLlmClient: Send + Sync {
    /// Rewrite the user's query given recent conversation memory.
    /// Errors here are handled by `query_rewriter`'s graceful-degrade
    /// path (spec §4.7), never propagated.
    fn rewrite_query(
        &self,
        user_query: &str,
        conversation: &crate::models::agent::RecentChats,
    ) -> Result<RewriteOutput, String>;

    /// Binary relevance grade for one retrieved document.
    fn grade_relevance(&self, question: &str, document_content: &str) -> Result<bool, String>;

    /// Generate an answer grounded only in the given document contents.
    fn generate_answer(&self, question: &str, document_contents: &[String]) -> Result<String, String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutput {
    pub rephrased_question: String,
    pub tool_flag: bool,
}

/// query_rewriter (spec §4.7): initialize transient fields, rewrite the
/// query against memory. Degrades gracefully on LLM failure rather than
/// propagating (the one node where `LLMFailure` does not abort, spec §7).
pub fn query_rewriter(llm: &dyn AgentLlmClient, mut state: AgentState) -> AgentState {
    state.rephrased_question = None;
    state.tool_flag = false;
    state.generated_answer = None;

    match llm.rewrite_query(&state.user_query, &state.conversation) {
        Ok(output) => {
            state.rephrased_question = Some(output.rephrased_question);
            state.tool_flag = output.tool_flag;
        }
        Err(e) => {
            tracing::warn!(error = %e, "query rewriter LLM call failed, degrading gracefully");
            state.rephrased_question = Some(state.user_query.clone());
            state.tool_flag = false;
        }
    }
    state
}

/// doc_retriever (spec §4.7): retrieve the `k` nearest `IndexedDoc`s.
/// An empty result is not an error.
pub fn doc_retriever(
    embedder: &dyn EmbeddingClient,
    index: &VectorIndex,
    k: usize,
    mut state: AgentState,
) -> Result<AgentState, GraphError> {
    let question = state
        .rephrased_question
        .clone()
        .unwrap_or_else(|| state.user_query.clone());

    state.documents = match index.retrieve(embedder, &question, k) {
        Ok(docs) => docs,
        Err(IndexError::IndexAbsent) => Vec::new(),
        Err(e) => return Err(GraphError::from(e)),
    };
    Ok(state)
}

/// doc_grader (spec §4.7): grade each retrieved document Yes/No, retain
/// only Yes, and set `proceed_to_generate`.
pub fn doc_grader(llm: &dyn AgentLlmClient, mut state: AgentState) -> Result<AgentState, GraphError> {
    let question = state
        .rephrased_question
        .clone()
        .unwrap_or_else(|| state.user_query.clone());

    let mut retained = Vec::new();
    for doc in state.documents.into_iter() {
        match llm.grade_relevance(&question, &doc.content) {
            Ok(true) => retained.push(doc),
            Ok(false) => {}
            Err(e) => {
                return Err(GraphError::LlmFailure {
                    node: "doc_grader",
                    message: e,
                })
            }
        }
    }

    state.proceed_to_generate = !retained.is_empty();
    state.documents = retained;
    Ok(state)
}

/// answer_generation (spec §4.7): generate an answer grounded only in
/// the retained documents, then update conversation memory via C10.
pub fn answer_generation(
    llm: &dyn AgentLlmClient,
    max_chats: usize,
    mut state: AgentState,
) -> Result<AgentState, GraphError> {
    let question = state
        .rephrased_question
        .clone()
        .unwrap_or_else(|| state.user_query.clone());
    let contents: Vec<String> = state.documents.iter().map(|d| d.content.clone()).collect();

    let answer = llm
        .generate_answer(&question, &contents)
        .map_err(|message| GraphError::LlmFailure {
            node: "answer_generation",
            message,
        })?;

    state.conversation = memory::update(&state.conversation, &question, &answer, max_chats);
    state.generated_answer = Some(answer);
    Ok(state)
}

/// fallback_agent (spec §4.7): fixed apology message, conversation
/// untouched so failed-to-ground turns never poison future memory.
pub fn fallback_agent(mut state: AgentState) -> AgentState {
    state.generated_answer = Some(FALLBACK_MESSAGE.to_string());
    state
}

/// Collaborators the graph driver needs, bundled so `run` doesn't carry
/// five separate parameters end to end.
pub struct GraphCollaborators<'a> {
    pub llm: &'a dyn AgentLlmClient,
    pub embedder: &'a dyn EmbeddingClient,
    pub index: &'a VectorIndex,
    pub retrieval_k: usize,
    pub max_chats: usize,
}

/// Run the full graph for one invocation: resume from the last
/// checkpoint for `thread_id` if one exists, execute nodes in
/// graph-order, persisting state via `checkpointer` at every node
/// boundary (spec §4.7, §4.8). The per-thread lease must already be
/// held by the caller (spec §5: "C8 enforces this via its checkpoint
/// lock/lease").
pub async fn run(
    collaborators: &GraphCollaborators<'_>,
    checkpointer: &Arc<dyn Checkpointer>,
    thread_id: &ThreadId,
    user_query: String,
) -> Result<AgentState, GraphError> {
    let span = tracing::info_span!("agent::graph::run", thread_id = %thread_id);
    let _enter = span.enter();

    let mut state = checkpointer
        .load(thread_id)?
        .unwrap_or_else(|| AgentState::new(user_query.clone()));
    state.user_query = user_query;

    tracing::info!(node = NodeId::QueryRewriter.as_str(), "entering node");
    state = query_rewriter(collaborators.llm, state);
    checkpointer.save(thread_id, &state)?;

    tracing::info!(node = NodeId::DocRetriever.as_str(), "entering node");
    state = doc_retriever(
        collaborators.embedder,
        collaborators.index,
        collaborators.retrieval_k,
        state,
    )?;
    checkpointer.save(thread_id, &state)?;

    tracing::info!(node = NodeId::DocGrader.as_str(), "entering node");
    state = doc_grader(collaborators.llm, state)?;
    checkpointer.save(thread_id, &state)?;

    state = match no_relevant_docs(&state) {
        RouteTarget::GenerateAnswer => {
            tracing::info!(node = NodeId::AnswerGeneration.as_str(), "entering node");
            answer_generation(collaborators.llm, collaborators.max_chats, state)?
        }
        RouteTarget::Fallback => {
            tracing::info!(node = NodeId::FallbackAgent.as_str(), "entering node");
            fallback_agent(state)
        }
    };
    checkpointer.save(thread_id, &state)?;

    Ok(state)
}
