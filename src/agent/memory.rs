//! Memory window (C10, spec §4.10): bounded rolling recent-turn context.

use crate::models::agent::{ChatTurn, RecentChats};

/// Append a turn and re-window to `max` entries (spec §4.10):
/// 1. append `{question, answer}` (trimmed) in insertion order;
/// 2. truncate to the last `max` entries;
/// 3. reassign keys `1..N` contiguously, oldest=1, newest=N.
///
/// This yields the monotonically-reindexed contiguous mapping required
/// by spec §3 invariant 3.
pub fn update(recent: &RecentChats, question: &str, answer: &str, max: usize) -> RecentChats {
    let mut turns: Vec<ChatTurn> = recent.values().cloned().collect();
    turns.push(ChatTurn {
        question: question.trim().to_string(),
        answer: answer.trim().to_string(),
    });

    let start = turns.len().saturating_sub(max);
    turns
        .into_iter()
        .skip(start)
        .enumerate()
        .map(|(i, turn)| (i as u32 + 1, turn))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(q: &str, a: &str) -> ChatTurn {
        ChatTurn {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn update_on_empty_recent_starts_at_key_one() {
        let recent = RecentChats::new();
        let result = update(&recent, "q1", "a1", 3);
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(&1), Some(&turn("q1", "a1")));
    }

    #[test]
    fn update_appends_at_newest_key() {
        let mut recent = RecentChats::new();
        recent.insert(1, turn("q1", "a1"));
        let result = update(&recent, "q2", "a2", 3);
        assert_eq!(result.len(), 2);
        assert_eq!(result.get(&2), Some(&turn("q2", "a2")));
    }

    #[test]
    fn update_trims_whitespace() {
        let recent = RecentChats::new();
        let result = update(&recent, "  q1  ", "  a1  ", 3);
        assert_eq!(result.get(&1), Some(&turn("q1", "a1")));
    }

    #[test]
    fn update_evicts_oldest_entry_past_max() {
        let mut recent = RecentChats::new();
        recent.insert(1, turn("q1", "a1"));
        recent.insert(2, turn("q2", "a2"));
        recent.insert(3, turn("q3", "a3"));

        let result = update(&recent, "q4", "a4", 3);
        assert_eq!(result.len(), 3);
        assert_eq!(result.keys().cloned().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(result.get(&1), Some(&turn("q2", "a2")));
        assert_eq!(result.get(&3), Some(&turn("q4", "a4")));
    }

    #[test]
    fn keys_are_always_contiguous_from_one() {
        let mut recent = RecentChats::new();
        recent.insert(5, turn("stale-key", "stale-answer"));
        let result = update(&recent, "q", "a", 3);
        assert_eq!(result.keys().cloned().collect::<Vec<_>>(), vec![1, 2]);
    }
}
