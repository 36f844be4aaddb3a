//! Assignment records: the mutable per-cycle lifecycle state (PRD-03).
//!
//! Shared disciplines keep one record per chore; independent chores keep one
//! per chore×person. Exactly one due timestamp is authoritative per record
//! at any instant, and the fired-signal markers are monotonic within a
//! cycle; only a cycle reset clears them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::{status_for_due, ChoreStatus};
use crate::types::PersonId;

// ---------------------------------------------------------------------------
// Signal markers
// ---------------------------------------------------------------------------

/// Per-cycle "already fired" markers for sweep signals.
///
/// Persisted with the snapshot so a restart does not re-raise signals that
/// were already sent within the same cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMarkers {
    pub due_window_fired_at: Option<DateTime<Utc>>,
    pub reminder_fired_at: Option<DateTime<Utc>>,
    pub overdue_fired_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Carryover
// ---------------------------------------------------------------------------

/// Mark left on a record that was `Claimed` when its cycle-reset boundary
/// passed. The pending claim survives the boundary; `approve`/`disapprove`
/// resolve it using this mark's due timestamp as the recurrence anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCarryover {
    /// When the reset boundary fired.
    pub boundary: DateTime<Utc>,
    /// The ended cycle's due timestamp.
    pub due_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// AssignmentRecord
// ---------------------------------------------------------------------------

/// Mutable lifecycle state for one chore (or one chore×person pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub status: ChoreStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Who claimed (locks a shared-first record).
    pub claimant: Option<PersonId>,
    /// Assignees that have claimed so far (shared-all accumulation).
    #[serde(default)]
    pub completed_by: BTreeSet<PersonId>,
    #[serde(default)]
    pub signals: SignalMarkers,
    #[serde(default)]
    pub carryover: Option<CycleCarryover>,
}

impl AssignmentRecord {
    /// Fresh record for a chore's first cycle.
    pub fn new(
        due_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        due_window_secs: Option<i64>,
    ) -> Self {
        Self {
            status: status_for_due(due_at, now, due_window_secs),
            due_at,
            claimed_at: None,
            approved_at: None,
            last_completed_at: None,
            claimant: None,
            completed_by: BTreeSet::new(),
            signals: SignalMarkers::default(),
            carryover: None,
        }
    }

    /// Drop claim metadata (claimant, claim timestamp, accumulated claims).
    ///
    /// Signal markers are deliberately left alone; they are cleared only by
    /// [`AssignmentRecord::begin_cycle`].
    pub fn clear_claim(&mut self) {
        self.claimed_at = None;
        self.claimant = None;
        self.completed_by.clear();
    }

    /// Start a new cycle: clear claim/approval state and fired markers, set
    /// the next due timestamp, and recompute the passive status.
    pub fn begin_cycle(
        &mut self,
        due_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        due_window_secs: Option<i64>,
    ) {
        self.clear_claim();
        self.approved_at = None;
        self.signals = SignalMarkers::default();
        self.carryover = None;
        self.due_at = due_at;
        self.status = status_for_due(due_at, now, due_window_secs);
    }

    /// Whether this record's cycle is finished (approved and waiting for the
    /// reset orchestrator to re-arm it).
    pub fn is_resolved(&self) -> bool {
        self.status == ChoreStatus::Approved
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ts(s: &str) -> DateTime<Utc> {
        format!("{s}Z").parse().expect("valid timestamp")
    }

    #[test]
    fn new_record_before_due_is_pending() {
        let record = AssignmentRecord::new(
            Some(ts("2026-01-05T09:00:00")),
            ts("2026-01-05T07:00:00"),
            None,
        );
        assert_eq!(record.status, ChoreStatus::Pending);
        assert!(record.claimed_at.is_none());
    }

    #[test]
    fn new_record_inside_window_is_due() {
        let record = AssignmentRecord::new(
            Some(ts("2026-01-05T09:00:00")),
            ts("2026-01-05T08:30:00"),
            Some(3600),
        );
        assert_eq!(record.status, ChoreStatus::Due);
    }

    #[test]
    fn clear_claim_keeps_markers() {
        let mut record = AssignmentRecord::new(
            Some(ts("2026-01-05T09:00:00")),
            ts("2026-01-05T07:00:00"),
            None,
        );
        record.claimant = Some(Uuid::new_v4());
        record.claimed_at = Some(ts("2026-01-05T08:00:00"));
        record.signals.reminder_fired_at = Some(ts("2026-01-05T08:00:00"));

        record.clear_claim();

        assert!(record.claimant.is_none());
        assert!(record.claimed_at.is_none());
        assert!(record.completed_by.is_empty());
        // Markers are monotonic within a cycle.
        assert!(record.signals.reminder_fired_at.is_some());
    }

    #[test]
    fn begin_cycle_clears_everything() {
        let mut record = AssignmentRecord::new(
            Some(ts("2026-01-05T09:00:00")),
            ts("2026-01-05T07:00:00"),
            None,
        );
        record.approved_at = Some(ts("2026-01-05T10:00:00"));
        record.signals.overdue_fired_at = Some(ts("2026-01-05T09:00:01"));
        record.carryover = Some(CycleCarryover {
            boundary: ts("2026-01-06T00:00:00"),
            due_at: ts("2026-01-05T09:00:00"),
        });

        let next_due = ts("2026-01-06T09:00:00");
        record.begin_cycle(Some(next_due), ts("2026-01-06T00:00:05"), None);

        assert_eq!(record.status, ChoreStatus::Pending);
        assert_eq!(record.due_at, Some(next_due));
        assert!(record.approved_at.is_none());
        assert_eq!(record.signals, SignalMarkers::default());
        assert!(record.carryover.is_none());
    }
}
