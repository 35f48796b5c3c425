//! Router predicates (C9, spec §4.9): conditional edge decisions inside
//! the agent graph. Pure functions of `AgentState`.

use crate::models::agent::AgentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    GenerateAnswer,
    Fallback,
}

/// `no_relevant_docs(state)` (spec §4.9): `GenerateAnswer` iff
/// `proceed_to_generate` is true and `documents` is non-empty;
/// `Fallback` otherwise.
pub fn no_relevant_docs(state: &AgentState) -> RouteTarget {
    if state.proceed_to_generate && !state.documents.is_empty() {
        RouteTarget::GenerateAnswer
    } else {
        RouteTarget::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndexedDoc, IndexedDocMetadata};

    fn doc() -> IndexedDoc {
        IndexedDoc {
            content: "content".into(),
            metadata: IndexedDocMetadata {
                source_file: "a.png".into(),
                patient_name: "John Doe".into(),
            },
        }
    }

    #[test]
    fn routes_to_generate_answer_when_flagged_and_nonempty() {
        let mut state = AgentState::new("q".into());
        state.proceed_to_generate = true;
        state.documents = vec![doc()];
        assert_eq!(no_relevant_docs(&state), RouteTarget::GenerateAnswer);
    }

    #[test]
    fn routes_to_fallback_when_flag_is_false() {
        let mut state = AgentState::new("q".into());
        state.proceed_to_generate = false;
        state.documents = vec![doc()];
        assert_eq!(no_relevant_docs(&state), RouteTarget::Fallback);
    }

    #[test]
    fn routes_to_fallback_when_documents_empty_even_if_flagged() {
        let mut state = AgentState::new("q".into());
        state.proceed_to_generate = true;
        state.documents = vec![];
        assert_eq!(no_relevant_docs(&state), RouteTarget::Fallback);
    }

    #[test]
    fn zero_retrieved_documents_trivially_routes_to_fallback() {
        let state = AgentState::new("q".into());
        assert_eq!(no_relevant_docs(&state), RouteTarget::Fallback);
    }
}
