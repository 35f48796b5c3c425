use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::records::IndexedDoc;

/// One question/answer pair retained in the bounded conversation window
/// (spec.md §3, C10).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// The bounded conversation window, keyed by turn number starting at 1
/// with no gaps (spec.md §3 invariant 3). A `BTreeMap` keeps turns in
/// order under serialization without a separate `Vec` + index pair.
pub type RecentChats = BTreeMap<u32, ChatTurn>;

/// The full state threaded through the agent graph and checkpointed at
/// every node boundary (C7, C8; spec.md §3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub user_query: String,
    pub rephrased_question: Option<String>,
    pub conversation: RecentChats,
    /// Carried through the graph unused by any node (spec.md §9 Open
    /// Questions: retained for wire compatibility, not consulted by
    /// routing).
    pub tool_flag: bool,
    pub documents: Vec<IndexedDoc>,
    pub proceed_to_generate: bool,
    pub generated_answer: Option<String>,
}

impl AgentState {
    /// Start a fresh turn: only `user_query` is known, everything else
    /// is the node graph's output.
    pub fn new(user_query: String) -> Self {
        Self {
            user_query,
            ..Default::default()
        }
    }
}
