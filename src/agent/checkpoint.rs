//! Conversation store (C8, spec §4.8): a durable checkpointer backing
//! `AgentState`, keyed by `ThreadId`, with at-most-one in-flight
//! invocation per thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db::{self, DatabaseError};
use crate::models::agent::AgentState;
use crate::models::ids::ThreadId;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint store unreachable: {0}")]
    StoreUnreachable(#[from] DatabaseError),
}

/// A durable checkpointer backing `AgentState` (spec §4.8). Implementors
/// must provide atomic snapshot-at-every-node-boundary semantics; the
/// SQLite-backed implementation below satisfies that via `INSERT ... ON
/// CONFLICT DO UPDATE` in a single statement. `acquire_lease` is the
/// mechanism by which at most one graph invocation is mid-flight for a
/// given `ThreadId` (spec §4.8, §5).
#[async_trait]
pub trait Checkpointer: Send + Sync {
    fn load(&self, thread_id: &ThreadId) -> Result<Option<AgentState>, CheckpointError>;
    fn save(&self, thread_id: &ThreadId, state: &AgentState) -> Result<(), CheckpointError>;
    async fn acquire_lease(&self, thread_id: &ThreadId) -> OwnedMutexGuard<()>;
}

/// SQLite-backed `Checkpointer` plus a per-thread async lock ensuring
/// at most one graph invocation is mid-flight for a given `ThreadId`
/// (spec §4.8, §5).
pub struct SqliteCheckpointer {
    conn: StdMutex<rusqlite::Connection>,
    thread_locks: StdMutex<HashMap<ThreadId, Arc<AsyncMutex<()>>>>,
}

impl SqliteCheckpointer {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: StdMutex::new(conn),
            thread_locks: StdMutex::new(HashMap::new()),
        }
    }

}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    fn load(&self, thread_id: &ThreadId) -> Result<Option<AgentState>, CheckpointError> {
        let conn = self.conn.lock().expect("checkpoint connection lock poisoned");
        Ok(db::load_checkpoint(&conn, thread_id)?)
    }

    fn save(&self, thread_id: &ThreadId, state: &AgentState) -> Result<(), CheckpointError> {
        let conn = self.conn.lock().expect("checkpoint connection lock poisoned");
        Ok(db::save_checkpoint(&conn, thread_id, state)?)
    }

    /// Acquire the per-thread lease for the duration of one graph
    /// invocation. Held by the caller (the graph driver) across every
    /// node of a single run.
    async fn acquire_lease(&self, thread_id: &ThreadId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.thread_locks.lock().expect("checkpoint lock poisoned");
            locks
                .entry(thread_id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
