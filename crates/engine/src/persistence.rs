//! Persistence gateway interface and snapshot document (PRD-08).
//!
//! Durable storage is an external collaborator: it accepts full state
//! snapshots and owns its own debounce/batching policy. The engine calls
//! `save_snapshot` after every committed mutation and tolerates the gateway
//! coalescing rapid calls. [`MemoryGateway`] is the in-process
//! implementation used by tests and ephemeral runs; the daemon ships a
//! file-backed adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use chorewheel_core::assignment::AssignmentRecord;
use chorewheel_core::chore::Chore;
use chorewheel_core::error::CoreError;
use chorewheel_core::person::Person;
use chorewheel_core::stats::CompletionEntry;
use chorewheel_core::types::{ChoreId, PersonId};

// ---------------------------------------------------------------------------
// Snapshot document
// ---------------------------------------------------------------------------

/// One assignment record with its key, in snapshot form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub chore_id: ChoreId,
    /// `None` for the shared record of a shared-discipline chore.
    pub person_id: Option<PersonId>,
    pub record: AssignmentRecord,
}

/// Full engine state, as exchanged with the persistence gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoreSnapshot {
    #[serde(default)]
    pub chores: Vec<Chore>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub assignments: Vec<AssignmentEntry>,
    #[serde(default)]
    pub completions: Vec<CompletionEntry>,
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Durable snapshot storage, implemented outside this core.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Load the most recent snapshot, or `None` on first run.
    async fn load_snapshot(&self) -> Result<Option<ChoreSnapshot>, CoreError>;

    /// Persist a snapshot. The gateway may coalesce rapid calls.
    async fn save_snapshot(&self, snapshot: &ChoreSnapshot) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// MemoryGateway
// ---------------------------------------------------------------------------

/// In-memory gateway for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryGateway {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    snapshot: Option<ChoreSnapshot>,
    save_count: u64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently saved snapshot, if any.
    pub async fn last(&self) -> Option<ChoreSnapshot> {
        self.inner.lock().await.snapshot.clone()
    }

    /// Number of completed `save_snapshot` calls.
    pub async fn save_count(&self) -> u64 {
        self.inner.lock().await.save_count
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn load_snapshot(&self) -> Result<Option<ChoreSnapshot>, CoreError> {
        Ok(self.inner.lock().await.snapshot.clone())
    }

    async fn save_snapshot(&self, snapshot: &ChoreSnapshot) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().await;
        inner.snapshot = Some(snapshot.clone());
        inner.save_count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
