//! Shared id and timestamp aliases used across the workspace.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Unique id of a chore template.
pub type ChoreId = Uuid;

/// Unique id of a person (assignee or approver).
pub type PersonId = Uuid;

/// UTC timestamp type used for all stored instants.
pub type Timestamp = DateTime<Utc>;
