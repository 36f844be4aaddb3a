//! Shared builders for the engine test suites.
#![allow(dead_code)] // not every suite uses every builder

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use chorewheel_core::chore::{Chore, CompletionDiscipline};
use chorewheel_core::person::Person;
use chorewheel_core::recurrence::Recurrence;
use chorewheel_core::types::PersonId;
use chorewheel_engine::ChoreStore;

/// Parse a `YYYY-MM-DDTHH:MM:SS` string as UTC.
pub fn ts(s: &str) -> DateTime<Utc> {
    format!("{s}Z").parse().expect("valid timestamp")
}

pub fn person(name: &str) -> Person {
    Person {
        id: Uuid::new_v4(),
        name: name.to_string(),
    }
}

/// A daily, independent chore worth 5 points, first due at `due`.
pub fn daily_chore(assignees: &[PersonId], due: &str) -> Chore {
    Chore {
        id: Uuid::new_v4(),
        name: "Dishes".to_string(),
        points: 5.0,
        recurrence: Recurrence::Daily,
        discipline: CompletionDiscipline::Independent,
        assignees: assignees.iter().copied().collect(),
        overrides: BTreeMap::new(),
        applicable_days: None,
        due_window_secs: None,
        reminder_secs: None,
        first_due_at: Some(ts(due)),
    }
}

/// An empty store in UTC with the given people registered.
pub fn store_with(persons: &[&Person]) -> ChoreStore {
    let mut store = ChoreStore::new(chrono_tz::UTC);
    for p in persons {
        store.upsert_person((*p).clone()).expect("valid person");
    }
    store
}
