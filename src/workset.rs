//! Work-set diffing (C6): the single mechanism by which every ingestion
//! stage is incremental and idempotent. Pure and collaborator-free —
//! no I/O trait to mock here, only `HashSet`/`HashMap` arithmetic.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkSetError {
    #[error("failed to read source set: {0}")]
    SourceRead(String),
}

/// Result of diffing a stage's source key set against its downstream
/// artifact's key set (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSetDiff<K: Eq + Hash> {
    pub to_process: HashSet<K>,
    pub already_processed: HashSet<K>,
}

impl<K> WorkSetDiff<K>
where
    K: Eq + Hash + Clone,
{
    /// `to_process = source \ downstream`, `already_processed = source
    /// ∩ downstream`. A missing downstream artifact is represented by
    /// an empty `downstream` set, per spec.md §4.1 ("Missing downstream
    /// artifact ⇒ D = ∅").
    pub fn compute(source: &HashSet<K>, downstream: &HashSet<K>) -> Self {
        let to_process = source.difference(downstream).cloned().collect();
        let already_processed = source.intersection(downstream).cloned().collect();
        Self {
            to_process,
            already_processed,
        }
    }

    /// Diff is empty when there is nothing left to do.
    pub fn is_empty(&self) -> bool {
        self.to_process.is_empty()
    }
}

/// Diff a stage whose upstream is a JSON map (`DocumentId → value`)
/// rather than a directory listing (C2–C4), returning the work-set
/// diff plus the upstream values restricted to `to_process` (spec.md
/// §4.1: "plus, for stages that consume text, the subset of upstream
/// values keyed by to_process").
///
/// A missing upstream artifact signals "nothing to do" rather than an
/// error: both returned sets are empty and `restricted` is empty.
pub fn diff_keyed_map<K, V>(
    upstream: Option<&HashMap<K, V>>,
    downstream_keys: &HashSet<K>,
) -> (WorkSetDiff<K>, HashMap<K, V>)
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let Some(upstream) = upstream else {
        return (
            WorkSetDiff {
                to_process: HashSet::new(),
                already_processed: HashSet::new(),
            },
            HashMap::new(),
        );
    };

    let source: HashSet<K> = upstream.keys().cloned().collect();
    let diff = WorkSetDiff::compute(&source, downstream_keys);
    let restricted = diff
        .to_process
        .iter()
        .filter_map(|k| upstream.get(k).map(|v| (k.clone(), v.clone())))
        .collect();

    (diff, restricted)
}
