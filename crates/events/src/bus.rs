//! In-process event bus backed by a `tokio::sync::broadcast` channel (PRD-04).
//!
//! [`EventBus`] is the publish/subscribe hub for [`ChoreEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the engine and any
//! consumers. Publishing is fire-and-forget: a slow or failing consumer
//! can never reach back into the state machine.

use chrono::{DateTime, Utc};
use chorewheel_core::types::{ChoreId, PersonId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// ChoreEvent
// ---------------------------------------------------------------------------

/// What happened to a chore×person pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoreEventKind {
    Claimed,
    Approved,
    Disapproved,
    Overdue,
    DueWindowOpened,
    ReminderDue,
}

/// A lifecycle event emitted by the chore engine.
///
/// `person_id` is `None` for signals on a shared record that concern the
/// whole group rather than one assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoreEvent {
    pub chore_id: ChoreId,
    pub person_id: Option<PersonId>,
    pub kind: ChoreEventKind,
    pub timestamp: DateTime<Utc>,
}

impl ChoreEvent {
    /// Create an event stamped with the given time.
    pub fn new(
        chore_id: ChoreId,
        person_id: Option<PersonId>,
        kind: ChoreEventKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            chore_id,
            person_id,
            kind,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ChoreEvent`]. When the buffer is
/// full, the oldest un-consumed messages are dropped and slow receivers
/// observe a `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<ChoreEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the engine's own state does not depend on delivery.
    pub fn publish(&self, event: ChoreEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ChoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
