use crate::lifecycle::{ChoreAction, ChoreStatus};
use uuid::Uuid;

/// Error taxonomy for the chore core.
///
/// `NotFound` and `IllegalTransition` are surfaced synchronously to command
/// callers and never retried. `Configuration` degrades the offending
/// recurrence to one-shot behavior at the call site. `Persistence` is logged
/// and retried by the save scheduler; it never blocks the state machine.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Illegal transition: {action} is not valid from {status}")]
    IllegalTransition {
        status: ChoreStatus,
        action: ChoreAction,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl CoreError {
    /// Shorthand for a `NotFound` on a chore id.
    pub fn chore_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "chore", id }
    }

    /// Shorthand for a `NotFound` on a person id.
    pub fn person_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "person",
            id,
        }
    }

    /// Shorthand for a `NotFound` on an assignment record.
    pub fn assignment_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "assignment",
            id,
        }
    }
}
