//! Chore lifecycle state machine (PRD-02).
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the engine and any future tooling. It defines the per-record status
//! enum, the actions that drive it, and the legal-transition table the
//! engine consults before mutating a record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of one assignment record.
///
/// `Approved` is terminal for the cycle; every other status can still move.
/// `Overdue` overrides `Pending`/`Due` once the due timestamp passes without
/// an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoreStatus {
    /// Not yet claimed and not inside the due window.
    Pending,
    /// Inside the due window, not yet claimed.
    Due,
    /// Completion reported, awaiting approval.
    Claimed,
    /// Approved; terminal until the next cycle reset.
    Approved,
    /// Due timestamp passed without approval.
    Overdue,
}

impl std::fmt::Display for ChoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Due => "due",
            Self::Claimed => "claimed",
            Self::Approved => "approved",
            Self::Overdue => "overdue",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Actions that drive the state machine.
///
/// `PromoteOverdue` and `CycleReset` are system-internal (sweep and reset
/// orchestrator); the rest arrive through the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoreAction {
    Claim,
    Approve,
    Disapprove,
    SetDueDate,
    SkipToNextDue,
    PromoteOverdue,
    CycleReset,
}

impl std::fmt::Display for ChoreAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Claim => "claim",
            Self::Approve => "approve",
            Self::Disapprove => "disapprove",
            Self::SetDueDate => "set_due_date",
            Self::SkipToNextDue => "skip_to_next_due_date",
            Self::PromoteOverdue => "promote_overdue",
            Self::CycleReset => "cycle_reset",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Returns the set of statuses from which `action` may legally be applied.
pub fn valid_sources(action: ChoreAction) -> &'static [ChoreStatus] {
    use ChoreStatus::*;
    match action {
        // Claiming a late chore is allowed.
        ChoreAction::Claim => &[Pending, Due, Overdue],
        ChoreAction::Approve => &[Claimed],
        ChoreAction::Disapprove => &[Claimed],
        // Administrative re-scheduling is allowed from any non-terminal state.
        ChoreAction::SetDueDate => &[Pending, Due, Claimed, Overdue],
        ChoreAction::SkipToNextDue => &[Pending, Due, Claimed, Overdue],
        // The sweep never promotes a record that is already awaiting approval.
        ChoreAction::PromoteOverdue => &[Pending, Due],
        // A claimed record survives the reset boundary untouched.
        ChoreAction::CycleReset => &[Pending, Due, Approved, Overdue],
    }
}

/// Check whether `action` may be applied from `status`.
pub fn can_apply(status: ChoreStatus, action: ChoreAction) -> bool {
    valid_sources(action).contains(&status)
}

/// Validate an action against the current status, returning a descriptive
/// error for illegal ones.
pub fn validate_action(status: ChoreStatus, action: ChoreAction) -> Result<(), CoreError> {
    if can_apply(status, action) {
        Ok(())
    } else {
        Err(CoreError::IllegalTransition { status, action })
    }
}

// ---------------------------------------------------------------------------
// Status recomputation
// ---------------------------------------------------------------------------

/// Recompute a record's passive status from its due timestamp.
///
/// Used after disapproval, manual re-scheduling, and cycle resets, anywhere
/// the status must be derived from due-vs-now rather than from an action.
/// A record with no due timestamp is simply `Pending`.
pub fn status_for_due(
    due_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    due_window_secs: Option<i64>,
) -> ChoreStatus {
    let Some(due) = due_at else {
        return ChoreStatus::Pending;
    };
    if now >= due {
        return ChoreStatus::Overdue;
    }
    if let Some(secs) = due_window_secs {
        if now >= due - Duration::seconds(secs) {
            return ChoreStatus::Due;
        }
    }
    ChoreStatus::Pending
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        format!("{s}Z").parse().expect("valid timestamp")
    }

    // -- claim ----------------------------------------------------------------

    #[test]
    fn claim_from_pending() {
        assert!(can_apply(ChoreStatus::Pending, ChoreAction::Claim));
    }

    #[test]
    fn claim_from_due() {
        assert!(can_apply(ChoreStatus::Due, ChoreAction::Claim));
    }

    #[test]
    fn claim_from_overdue() {
        assert!(can_apply(ChoreStatus::Overdue, ChoreAction::Claim));
    }

    #[test]
    fn claim_from_claimed_invalid() {
        assert!(!can_apply(ChoreStatus::Claimed, ChoreAction::Claim));
    }

    #[test]
    fn claim_from_approved_invalid() {
        assert!(!can_apply(ChoreStatus::Approved, ChoreAction::Claim));
    }

    // -- approve / disapprove -------------------------------------------------

    #[test]
    fn approve_from_claimed() {
        assert!(can_apply(ChoreStatus::Claimed, ChoreAction::Approve));
    }

    #[test]
    fn approve_from_pending_invalid() {
        assert!(!can_apply(ChoreStatus::Pending, ChoreAction::Approve));
    }

    #[test]
    fn approve_from_overdue_invalid() {
        assert!(!can_apply(ChoreStatus::Overdue, ChoreAction::Approve));
    }

    #[test]
    fn disapprove_from_claimed() {
        assert!(can_apply(ChoreStatus::Claimed, ChoreAction::Disapprove));
    }

    #[test]
    fn disapprove_from_due_invalid() {
        assert!(!can_apply(ChoreStatus::Due, ChoreAction::Disapprove));
    }

    // -- administrative re-scheduling -----------------------------------------

    #[test]
    fn set_due_date_from_any_non_approved() {
        for status in [
            ChoreStatus::Pending,
            ChoreStatus::Due,
            ChoreStatus::Claimed,
            ChoreStatus::Overdue,
        ] {
            assert!(can_apply(status, ChoreAction::SetDueDate));
            assert!(can_apply(status, ChoreAction::SkipToNextDue));
        }
    }

    #[test]
    fn set_due_date_from_approved_invalid() {
        assert!(!can_apply(ChoreStatus::Approved, ChoreAction::SetDueDate));
        assert!(!can_apply(ChoreStatus::Approved, ChoreAction::SkipToNextDue));
    }

    // -- system-internal actions ----------------------------------------------

    #[test]
    fn promote_overdue_excludes_claimed() {
        assert!(can_apply(ChoreStatus::Pending, ChoreAction::PromoteOverdue));
        assert!(can_apply(ChoreStatus::Due, ChoreAction::PromoteOverdue));
        assert!(!can_apply(ChoreStatus::Claimed, ChoreAction::PromoteOverdue));
        assert!(!can_apply(ChoreStatus::Approved, ChoreAction::PromoteOverdue));
    }

    #[test]
    fn cycle_reset_excludes_claimed() {
        assert!(!can_apply(ChoreStatus::Claimed, ChoreAction::CycleReset));
        assert!(can_apply(ChoreStatus::Approved, ChoreAction::CycleReset));
        assert!(can_apply(ChoreStatus::Overdue, ChoreAction::CycleReset));
    }

    // -- validate_action ------------------------------------------------------

    #[test]
    fn validate_action_ok() {
        assert!(validate_action(ChoreStatus::Claimed, ChoreAction::Approve).is_ok());
    }

    #[test]
    fn validate_action_err_names_both_sides() {
        let err = validate_action(ChoreStatus::Pending, ChoreAction::Approve).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("approve"));
        assert!(msg.contains("pending"));
    }

    // -- status_for_due -------------------------------------------------------

    #[test]
    fn no_due_is_pending() {
        let now = ts("2026-01-05T09:00:00");
        assert_eq!(status_for_due(None, now, None), ChoreStatus::Pending);
    }

    #[test]
    fn past_due_is_overdue() {
        let due = ts("2026-01-05T09:00:00");
        let now = ts("2026-01-05T09:00:00");
        assert_eq!(status_for_due(Some(due), now, None), ChoreStatus::Overdue);
    }

    #[test]
    fn inside_window_is_due() {
        let due = ts("2026-01-05T09:00:00");
        let now = ts("2026-01-05T08:30:00");
        assert_eq!(
            status_for_due(Some(due), now, Some(3600)),
            ChoreStatus::Due
        );
    }

    #[test]
    fn before_window_is_pending() {
        let due = ts("2026-01-05T09:00:00");
        let now = ts("2026-01-05T07:00:00");
        assert_eq!(
            status_for_due(Some(due), now, Some(3600)),
            ChoreStatus::Pending
        );
    }

    #[test]
    fn no_window_stays_pending_until_due() {
        let due = ts("2026-01-05T09:00:00");
        let now = ts("2026-01-05T08:59:59");
        assert_eq!(status_for_due(Some(due), now, None), ChoreStatus::Pending);
    }
}
