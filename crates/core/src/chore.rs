//! Chore template entity and validation (PRD-03).
//!
//! A chore is configuration: who does it, how often, how it completes, and
//! the lead windows for due-soon and reminder signals. The mutable per-cycle
//! state lives in [`crate::assignment::AssignmentRecord`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::recurrence::{validate_recurrence, Recurrence};
use crate::types::{ChoreId, PersonId};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a chore display name.
const MAX_NAME_LEN: usize = 128;

/// Maximum number of assignees on a single chore.
const MAX_ASSIGNEES: usize = 32;

// ---------------------------------------------------------------------------
// Completion discipline
// ---------------------------------------------------------------------------

/// How a multi-person chore completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionDiscipline {
    /// One record per assignee; each person completes their own instance.
    Independent,
    /// One shared record; the first claimant wins and locks it.
    SharedFirst,
    /// One shared record; every assignee must claim before approval.
    SharedAll,
}

impl CompletionDiscipline {
    /// Whether all assignees share a single assignment record.
    pub fn is_shared(&self) -> bool {
        !matches!(self, Self::Independent)
    }
}

// ---------------------------------------------------------------------------
// Chore
// ---------------------------------------------------------------------------

/// Per-assignee override of the chore-level schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssigneeOverride {
    /// Fixed due timestamp for this assignee's current cycle.
    pub due_at: Option<DateTime<Utc>>,
    /// Recurrence spec replacing the chore-level one for this assignee.
    pub recurrence: Option<Recurrence>,
}

/// A chore template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: ChoreId,
    pub name: String,
    /// Points awarded per approved completion.
    pub points: f64,
    pub recurrence: Recurrence,
    pub discipline: CompletionDiscipline,
    pub assignees: BTreeSet<PersonId>,
    /// Per-assignee due/recurrence overrides (independent chores only).
    #[serde(default)]
    pub overrides: BTreeMap<PersonId, AssigneeOverride>,
    /// Weekdays the chore may fall due on; `None` means every day.
    #[serde(default)]
    pub applicable_days: Option<Vec<Weekday>>,
    /// Lead time before the due timestamp during which the chore is `Due`.
    #[serde(default)]
    pub due_window_secs: Option<i64>,
    /// Lead time before the due timestamp at which a reminder is raised.
    #[serde(default)]
    pub reminder_secs: Option<i64>,
    /// Initial due timestamp for the first cycle.
    #[serde(default)]
    pub first_due_at: Option<DateTime<Utc>>,
}

impl Chore {
    /// The recurrence spec in effect for `person`, honoring overrides.
    pub fn effective_recurrence(&self, person: PersonId) -> &Recurrence {
        self.overrides
            .get(&person)
            .and_then(|o| o.recurrence.as_ref())
            .unwrap_or(&self.recurrence)
    }

    /// The initial due timestamp in effect for `person`, honoring overrides.
    pub fn effective_first_due(&self, person: Option<PersonId>) -> Option<DateTime<Utc>> {
        person
            .and_then(|p| self.overrides.get(&p))
            .and_then(|o| o.due_at)
            .or(self.first_due_at)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a chore template.
///
/// Rules:
/// - Name non-empty, at most `MAX_NAME_LEN` characters.
/// - Points finite and non-negative.
/// - At least one assignee, at most `MAX_ASSIGNEES`.
/// - Overrides may only reference assignees; override recurrences must be
///   well-formed.
/// - An applicable-days filter must be non-empty and free of duplicates.
/// - Due-window and reminder offsets must be positive.
pub fn validate_chore(chore: &Chore) -> Result<(), CoreError> {
    if chore.name.trim().is_empty() {
        return Err(CoreError::Configuration(
            "Chore name must not be empty".to_string(),
        ));
    }
    if chore.name.len() > MAX_NAME_LEN {
        return Err(CoreError::Configuration(format!(
            "Chore name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !chore.points.is_finite() || chore.points < 0.0 {
        return Err(CoreError::Configuration(format!(
            "Chore points must be finite and non-negative, got {}",
            chore.points
        )));
    }
    if chore.assignees.is_empty() {
        return Err(CoreError::Configuration(
            "Chore must have at least one assignee".to_string(),
        ));
    }
    if chore.assignees.len() > MAX_ASSIGNEES {
        return Err(CoreError::Configuration(format!(
            "Chore may have at most {MAX_ASSIGNEES} assignees"
        )));
    }

    validate_recurrence(&chore.recurrence)?;

    for (person, over) in &chore.overrides {
        if !chore.assignees.contains(person) {
            return Err(CoreError::Configuration(format!(
                "Override references non-assignee {person}"
            )));
        }
        if let Some(rec) = &over.recurrence {
            validate_recurrence(rec)?;
        }
    }

    if let Some(days) = &chore.applicable_days {
        if days.is_empty() {
            return Err(CoreError::Configuration(
                "Applicable-days filter must not be empty".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for day in days {
            if !seen.insert(day.num_days_from_monday()) {
                return Err(CoreError::Configuration(format!(
                    "Duplicate applicable day: {day}"
                )));
            }
        }
    }

    for (label, offset) in [
        ("due window", chore.due_window_secs),
        ("reminder", chore.reminder_secs),
    ] {
        if let Some(secs) = offset {
            if secs <= 0 {
                return Err(CoreError::Configuration(format!(
                    "The {label} offset must be positive, got {secs}s"
                )));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
