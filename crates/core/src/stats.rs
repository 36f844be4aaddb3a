//! Completion statistics buckets.
//!
//! Every approval appends one entry per beneficiary. The `cycle_date` is
//! the local calendar day of the cycle the approval belongs to; for a
//! late approval that is the *ended* cycle's day, not the day the approval
//! arrived (see the engine's carryover handling).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChoreId, PersonId};

/// One approved completion, credited to one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub chore_id: ChoreId,
    pub person_id: PersonId,
    pub points: f64,
    pub approved_at: DateTime<Utc>,
    /// Local calendar day of the cycle this completion belongs to.
    pub cycle_date: NaiveDate,
}

/// Sum the points a person earned on a given cycle day.
pub fn points_for_day(entries: &[CompletionEntry], person: PersonId, day: NaiveDate) -> f64 {
    entries
        .iter()
        .filter(|e| e.person_id == person && e.cycle_date == day)
        .map(|e| e.points)
        .sum()
}
