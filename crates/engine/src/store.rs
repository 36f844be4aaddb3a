//! In-memory chore store: the single owner of all chore and assignment
//! state (PRD-05).
//!
//! Every mutation is a synchronous method taking an explicit `now`; the
//! service task is the only caller, which is what makes "first claimant
//! wins" well-defined for shared-first chores. Methods return the events
//! the mutation produced; the service publishes them after committing.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use chorewheel_core::assignment::{AssignmentRecord, CycleCarryover};
use chorewheel_core::chore::{validate_chore, Chore, CompletionDiscipline};
use chorewheel_core::error::CoreError;
use chorewheel_core::lifecycle::{self, status_for_due, ChoreAction, ChoreStatus};
use chorewheel_core::person::{validate_person_name, Person};
use chorewheel_core::recurrence::{align_to_applicable_day, next_due, Recurrence};
use chorewheel_core::stats::CompletionEntry;
use chorewheel_core::types::{ChoreId, PersonId};
use chorewheel_events::{ChoreEvent, ChoreEventKind};

use crate::persistence::{AssignmentEntry, ChoreSnapshot};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Key of one assignment record.
///
/// Shared disciplines use `person_id: None` (one record per chore);
/// independent chores key one record per chore×person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub chore_id: ChoreId,
    pub person_id: Option<PersonId>,
}

// ---------------------------------------------------------------------------
// ChoreStore
// ---------------------------------------------------------------------------

/// The in-memory chore state.
pub struct ChoreStore {
    tz: Tz,
    chores: BTreeMap<ChoreId, Chore>,
    persons: BTreeMap<PersonId, Person>,
    assignments: BTreeMap<AssignmentKey, AssignmentRecord>,
    completions: Vec<CompletionEntry>,
    /// Earliest instant any sweep signal could fire; `None` means no record
    /// has anything pending. Only meaningful while `earliest_dirty` is
    /// false; recomputed lazily on the next sweep after a mutation.
    earliest_signal: Option<DateTime<Utc>>,
    earliest_dirty: bool,
}

impl ChoreStore {
    /// Empty store using `tz` for boundary arithmetic.
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            chores: BTreeMap::new(),
            persons: BTreeMap::new(),
            assignments: BTreeMap::new(),
            completions: Vec::new(),
            earliest_signal: None,
            earliest_dirty: true,
        }
    }

    /// Rebuild a store from a persisted snapshot.
    pub fn from_snapshot(tz: Tz, snapshot: ChoreSnapshot) -> Self {
        let mut store = Self::new(tz);
        store.persons = snapshot.persons.into_iter().map(|p| (p.id, p)).collect();
        store.chores = snapshot.chores.into_iter().map(|c| (c.id, c)).collect();
        store.assignments = snapshot
            .assignments
            .into_iter()
            .map(|e| {
                (
                    AssignmentKey {
                        chore_id: e.chore_id,
                        person_id: e.person_id,
                    },
                    e.record,
                )
            })
            .collect();
        store.completions = snapshot.completions;
        store
    }

    /// Serialize the full state for the persistence gateway.
    pub fn to_snapshot(&self) -> ChoreSnapshot {
        ChoreSnapshot {
            chores: self.chores.values().cloned().collect(),
            persons: self.persons.values().cloned().collect(),
            assignments: self
                .assignments
                .iter()
                .map(|(key, record)| AssignmentEntry {
                    chore_id: key.chore_id,
                    person_id: key.person_id,
                    record: record.clone(),
                })
                .collect(),
            completions: self.completions.clone(),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn chore(&self, id: ChoreId) -> Option<&Chore> {
        self.chores.get(&id)
    }

    pub fn record(&self, chore_id: ChoreId, person_id: Option<PersonId>) -> Option<&AssignmentRecord> {
        self.assignments.get(&AssignmentKey { chore_id, person_id })
    }

    pub fn completions(&self) -> &[CompletionEntry] {
        &self.completions
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    // -- person configuration ------------------------------------------------

    /// Insert or update a person.
    pub fn upsert_person(&mut self, person: Person) -> Result<(), CoreError> {
        validate_person_name(&person.name)?;
        self.persons.insert(person.id, person);
        Ok(())
    }

    /// Remove a person. Refused while they are still assigned to a chore;
    /// edit the chores first.
    pub fn remove_person(&mut self, person_id: PersonId) -> Result<(), CoreError> {
        if !self.persons.contains_key(&person_id) {
            return Err(CoreError::person_not_found(person_id));
        }
        if let Some(chore) = self
            .chores
            .values()
            .find(|c| c.assignees.contains(&person_id))
        {
            return Err(CoreError::Configuration(format!(
                "Person {person_id} is still assigned to chore '{}'",
                chore.name
            )));
        }
        self.persons.remove(&person_id);
        Ok(())
    }

    // -- chore configuration -------------------------------------------------

    /// Insert or update a chore template and reconcile its assignment
    /// records: new assignees gain records, removed assignees lose theirs,
    /// and a discipline change between shared and independent rebuilds the
    /// records from scratch.
    pub fn upsert_chore(&mut self, chore: Chore, now: DateTime<Utc>) -> Result<(), CoreError> {
        validate_chore(&chore)?;
        for person in &chore.assignees {
            if !self.persons.contains_key(person) {
                return Err(CoreError::person_not_found(*person));
            }
        }

        let shared_shape_changed = self
            .chores
            .get(&chore.id)
            .map_or(false, |prior| prior.discipline.is_shared() != chore.discipline.is_shared());
        if shared_shape_changed {
            self.assignments.retain(|key, _| key.chore_id != chore.id);
        }

        if chore.discipline.is_shared() {
            self.reconcile_shared_record(&chore, now);
        } else {
            self.reconcile_independent_records(&chore, now);
        }

        self.chores.insert(chore.id, chore);
        self.mark_dirty();
        Ok(())
    }

    /// Delete a chore; cascades to its assignment records.
    pub fn remove_chore(&mut self, chore_id: ChoreId) -> Result<(), CoreError> {
        if self.chores.remove(&chore_id).is_none() {
            return Err(CoreError::chore_not_found(chore_id));
        }
        self.assignments.retain(|key, _| key.chore_id != chore_id);
        self.mark_dirty();
        Ok(())
    }

    fn reconcile_shared_record(&mut self, chore: &Chore, now: DateTime<Utc>) {
        let key = AssignmentKey {
            chore_id: chore.id,
            person_id: None,
        };
        if let Some(record) = self.assignments.get_mut(&key) {
            // Prune claim state of assignees that were removed.
            record.completed_by.retain(|p| chore.assignees.contains(p));
            if let Some(claimant) = record.claimant {
                if !chore.assignees.contains(&claimant) {
                    record.clear_claim();
                    if record.status == ChoreStatus::Claimed {
                        record.status =
                            status_for_due(record.due_at, now, chore.due_window_secs);
                    }
                }
            }
            // Shrinking a shared-all group can complete the claim set.
            if chore.discipline == CompletionDiscipline::SharedAll
                && record.status != ChoreStatus::Claimed
                && record.status != ChoreStatus::Approved
                && !record.completed_by.is_empty()
                && chore.assignees.iter().all(|a| record.completed_by.contains(a))
            {
                record.status = ChoreStatus::Claimed;
                record.claimed_at = Some(now);
            }
        } else {
            let due = chore
                .effective_first_due(None)
                .or_else(|| scheduled_due(chore, None, now, now, self.tz));
            self.assignments
                .insert(key, AssignmentRecord::new(due, now, chore.due_window_secs));
        }
    }

    fn reconcile_independent_records(&mut self, chore: &Chore, now: DateTime<Utc>) {
        self.assignments.retain(|key, _| {
            key.chore_id != chore.id
                || key.person_id.map_or(false, |p| chore.assignees.contains(&p))
        });
        for person in &chore.assignees {
            let key = AssignmentKey {
                chore_id: chore.id,
                person_id: Some(*person),
            };
            if !self.assignments.contains_key(&key) {
                let due = chore
                    .effective_first_due(Some(*person))
                    .or_else(|| scheduled_due(chore, Some(*person), now, now, self.tz));
                self.assignments
                    .insert(key, AssignmentRecord::new(due, now, chore.due_window_secs));
            }
        }
    }

    // -- lifecycle commands --------------------------------------------------

    /// A person reports the chore complete.
    pub fn claim(
        &mut self,
        chore_id: ChoreId,
        person_id: PersonId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChoreEvent>, CoreError> {
        let chore = self.require_chore(chore_id)?.clone();
        self.require_person(person_id)?;
        if !chore.assignees.contains(&person_id) {
            return Err(CoreError::assignment_not_found(chore_id));
        }

        let key = record_key(&chore, person_id);
        let record = self
            .assignments
            .get_mut(&key)
            .ok_or_else(|| CoreError::assignment_not_found(chore_id))?;
        lifecycle::validate_action(record.status, ChoreAction::Claim)?;

        match chore.discipline {
            CompletionDiscipline::Independent | CompletionDiscipline::SharedFirst => {
                record.status = ChoreStatus::Claimed;
                record.claimant = Some(person_id);
                record.claimed_at = Some(now);
                record.completed_by.insert(person_id);
            }
            CompletionDiscipline::SharedAll => {
                if record.completed_by.contains(&person_id) {
                    return Err(CoreError::IllegalTransition {
                        status: record.status,
                        action: ChoreAction::Claim,
                    });
                }
                record.completed_by.insert(person_id);
                record.claimed_at = Some(now);
                if chore.assignees.iter().all(|a| record.completed_by.contains(a)) {
                    record.status = ChoreStatus::Claimed;
                }
            }
        }

        self.mark_dirty();
        Ok(vec![ChoreEvent::new(
            chore_id,
            Some(person_id),
            ChoreEventKind::Claimed,
            now,
        )])
    }

    /// Approve a claimed completion.
    ///
    /// Credits all beneficiaries (shared chores: every original assignee),
    /// clears claim metadata, and, when the reset boundary has already
    /// passed, performs the deferred cycle advance anchored on the *ended*
    /// cycle's due timestamp, never the post-reset one.
    pub fn approve(
        &mut self,
        chore_id: ChoreId,
        person_id: PersonId,
        actor_id: PersonId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChoreEvent>, CoreError> {
        let chore = self.require_chore(chore_id)?.clone();
        self.require_person(person_id)?;
        self.require_person(actor_id)?;

        let key = record_key(&chore, person_id);
        let record = self
            .assignments
            .get(&key)
            .ok_or_else(|| CoreError::assignment_not_found(chore_id))?;
        lifecycle::validate_action(record.status, ChoreAction::Approve)?;
        if chore.discipline == CompletionDiscipline::SharedFirst
            && record.claimant != Some(person_id)
        {
            return Err(CoreError::IllegalTransition {
                status: record.status,
                action: ChoreAction::Approve,
            });
        }

        // Which cycle does this approval belong to? Compare the claim
        // timestamp against the reset boundary, not against current time.
        let cycle_due = match record.carryover {
            Some(carry) if record.claimed_at.map_or(true, |t| t < carry.boundary) => {
                Some(carry.due_at)
            }
            _ => record.due_at,
        };
        let cycle_date = cycle_due
            .unwrap_or(now)
            .with_timezone(&self.tz)
            .date_naive();
        let had_carryover = record.carryover.is_some();

        let spec = record_spec(&chore, key.person_id);
        let next = if had_carryover {
            let anchor = if spec.anchors_on_completion() {
                now
            } else {
                cycle_due.unwrap_or(now)
            };
            scheduled_due(&chore, key.person_id, anchor, now, self.tz)
        } else {
            None
        };

        let record = self.assignments.get_mut(&key).expect("checked above");
        record.clear_claim();
        record.approved_at = Some(now);
        record.last_completed_at = Some(now);
        record.status = ChoreStatus::Approved;
        if had_carryover {
            match next {
                Some(due) => record.begin_cycle(Some(due), now, chore.due_window_secs),
                // One-shot (or degraded spec): stays approved for good.
                None => record.carryover = None,
            }
        }

        let beneficiaries: Vec<PersonId> = match chore.discipline {
            CompletionDiscipline::Independent => vec![person_id],
            _ => chore.assignees.iter().copied().collect(),
        };
        let mut events = Vec::with_capacity(beneficiaries.len());
        for beneficiary in beneficiaries {
            self.completions.push(CompletionEntry {
                chore_id,
                person_id: beneficiary,
                points: chore.points,
                approved_at: now,
                cycle_date,
            });
            events.push(ChoreEvent::new(
                chore_id,
                Some(beneficiary),
                ChoreEventKind::Approved,
                now,
            ));
        }

        self.mark_dirty();
        Ok(events)
    }

    /// Reject a claimed completion.
    ///
    /// Reverts to `Pending`/`Due`/`Overdue` (recomputed from due-vs-now)
    /// without advancing the recurrence. For a shared-all chore the whole
    /// accumulated claim set is rejected. A record carried over a reset
    /// boundary completes its deferred cycle advance here: the old cycle
    /// can no longer be completed.
    pub fn disapprove(
        &mut self,
        chore_id: ChoreId,
        person_id: PersonId,
        actor_id: PersonId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChoreEvent>, CoreError> {
        let chore = self.require_chore(chore_id)?.clone();
        self.require_person(person_id)?;
        self.require_person(actor_id)?;

        let key = record_key(&chore, person_id);
        let record = self
            .assignments
            .get(&key)
            .ok_or_else(|| CoreError::assignment_not_found(chore_id))?;
        lifecycle::validate_action(record.status, ChoreAction::Disapprove)?;
        if chore.discipline == CompletionDiscipline::SharedFirst
            && record.claimant != Some(person_id)
        {
            return Err(CoreError::IllegalTransition {
                status: record.status,
                action: ChoreAction::Disapprove,
            });
        }

        let carry = record.carryover;
        let next = carry.and_then(|c| {
            let spec = record_spec(&chore, key.person_id);
            let anchor = if spec.anchors_on_completion() {
                record.last_completed_at.unwrap_or(c.due_at)
            } else {
                c.due_at
            };
            scheduled_due(&chore, key.person_id, anchor, now, self.tz)
        });

        let record = self.assignments.get_mut(&key).expect("checked above");
        record.clear_claim();
        if carry.is_some() {
            match next {
                Some(due) => record.begin_cycle(Some(due), now, chore.due_window_secs),
                None => {
                    record.carryover = None;
                    record.status = status_for_due(record.due_at, now, chore.due_window_secs);
                }
            }
        } else {
            record.status = status_for_due(record.due_at, now, chore.due_window_secs);
        }

        self.mark_dirty();
        Ok(vec![ChoreEvent::new(
            chore_id,
            Some(person_id),
            ChoreEventKind::Disapproved,
            now,
        )])
    }

    /// Administratively pin the due timestamp of every non-`Approved`
    /// record of the chore. Claim state and fired markers are untouched.
    pub fn set_due_date(
        &mut self,
        chore_id: ChoreId,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let chore = self.require_chore(chore_id)?.clone();
        let mut applied = false;
        for (_, record) in self
            .assignments
            .iter_mut()
            .filter(|(key, _)| key.chore_id == chore_id)
        {
            if record.status == ChoreStatus::Approved {
                continue;
            }
            record.due_at = Some(due_at);
            if record.status != ChoreStatus::Claimed {
                record.status = status_for_due(Some(due_at), now, chore.due_window_secs);
            }
            applied = true;
        }
        if !applied {
            return Err(CoreError::IllegalTransition {
                status: ChoreStatus::Approved,
                action: ChoreAction::SetDueDate,
            });
        }
        self.mark_dirty();
        Ok(())
    }

    /// Administratively roll every non-`Approved` record of the chore to
    /// its next scheduled occurrence. A one-shot chore is left untouched.
    pub fn skip_to_next_due(
        &mut self,
        chore_id: ChoreId,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let chore = self.require_chore(chore_id)?.clone();
        let tz = self.tz;
        let mut eligible = 0usize;
        for (key, record) in self
            .assignments
            .iter_mut()
            .filter(|(key, _)| key.chore_id == chore_id)
        {
            if record.status == ChoreStatus::Approved {
                continue;
            }
            eligible += 1;
            let anchor = record.due_at.unwrap_or(now);
            if let Some(due) = scheduled_due(&chore, key.person_id, anchor, now, tz) {
                record.due_at = Some(due);
                if record.status != ChoreStatus::Claimed {
                    record.status = status_for_due(Some(due), now, chore.due_window_secs);
                }
            }
        }
        if eligible == 0 {
            return Err(CoreError::IllegalTransition {
                status: ChoreStatus::Approved,
                action: ChoreAction::SkipToNextDue,
            });
        }
        self.mark_dirty();
        Ok(())
    }

    // -- sweep ---------------------------------------------------------------

    /// One overdue/reminder pass over all records.
    ///
    /// Idempotent: fired markers prevent duplicate events within a cycle,
    /// and the cached earliest-signal timestamp lets a tick with nothing
    /// possibly due skip the scan entirely.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<ChoreEvent> {
        if !self.earliest_dirty {
            match self.earliest_signal {
                Some(earliest) if now >= earliest => {}
                _ => return Vec::new(),
            }
        }

        let mut events = Vec::new();
        let chores = &self.chores;
        for (key, record) in self.assignments.iter_mut() {
            if matches!(record.status, ChoreStatus::Approved | ChoreStatus::Claimed) {
                continue;
            }
            let Some(chore) = chores.get(&key.chore_id) else {
                continue;
            };
            let Some(due) = record.due_at else {
                continue;
            };

            // Due window opens: Pending -> Due, once per cycle.
            if let Some(window) = chore.due_window_secs {
                if record.signals.due_window_fired_at.is_none()
                    && now >= due - Duration::seconds(window)
                    && now < due
                {
                    if record.status == ChoreStatus::Pending {
                        record.status = ChoreStatus::Due;
                    }
                    record.signals.due_window_fired_at = Some(now);
                    push_signal(&mut events, chore, key, ChoreEventKind::DueWindowOpened, now);
                }
            }

            // Reminder: raised once per cycle, status unchanged.
            if let Some(reminder) = chore.reminder_secs {
                if record.signals.reminder_fired_at.is_none()
                    && now >= due - Duration::seconds(reminder)
                    && now < due
                {
                    record.signals.reminder_fired_at = Some(now);
                    push_signal(&mut events, chore, key, ChoreEventKind::ReminderDue, now);
                }
            }

            // Overdue promotion. The status change repeats if a manual
            // re-schedule bounced the record back, but the event fires at
            // most once per cycle.
            if now >= due
                && matches!(record.status, ChoreStatus::Pending | ChoreStatus::Due)
            {
                record.status = ChoreStatus::Overdue;
                if record.signals.overdue_fired_at.is_none() {
                    record.signals.overdue_fired_at = Some(now);
                    push_signal(&mut events, chore, key, ChoreEventKind::Overdue, now);
                }
            }
        }

        self.recompute_earliest();
        events
    }

    /// Earliest instant at which any record could produce a sweep signal.
    fn recompute_earliest(&mut self) {
        let mut earliest: Option<DateTime<Utc>> = None;
        for (key, record) in &self.assignments {
            if matches!(record.status, ChoreStatus::Approved | ChoreStatus::Claimed) {
                continue;
            }
            let Some(chore) = self.chores.get(&key.chore_id) else {
                continue;
            };
            let Some(due) = record.due_at else {
                continue;
            };
            let mut consider = |candidate: DateTime<Utc>| {
                earliest = Some(match earliest {
                    Some(e) => e.min(candidate),
                    None => candidate,
                });
            };
            if let Some(window) = chore.due_window_secs {
                if record.signals.due_window_fired_at.is_none() {
                    consider(due - Duration::seconds(window));
                }
            }
            if let Some(reminder) = chore.reminder_secs {
                if record.signals.reminder_fired_at.is_none() {
                    consider(due - Duration::seconds(reminder));
                }
            }
            if record.status != ChoreStatus::Overdue {
                consider(due);
            }
        }
        self.earliest_signal = earliest;
        self.earliest_dirty = false;
    }

    // -- cycle reset ----------------------------------------------------------

    /// Re-arm every record whose cycle has ended: due passed and either
    /// approved or the recurrence advances unconditionally. A `Claimed`
    /// record is left alone and marked for carryover instead; `approve`/
    /// `disapprove` finish the job. Returns the number of re-armed records.
    pub fn cycle_reset(&mut self, now: DateTime<Utc>) -> usize {
        let tz = self.tz;
        let mut armed = 0usize;
        let chores = &self.chores;
        for (key, record) in self.assignments.iter_mut() {
            let Some(chore) = chores.get(&key.chore_id) else {
                continue;
            };
            let Some(due) = record.due_at else {
                continue;
            };
            if due > now {
                continue;
            }

            if record.status == ChoreStatus::Claimed {
                if record.carryover.is_none() {
                    record.carryover = Some(CycleCarryover {
                        boundary: now,
                        due_at: due,
                    });
                    tracing::debug!(
                        chore_id = %key.chore_id,
                        due = %due,
                        "Claim pending at reset boundary, preserving across cycle"
                    );
                }
                continue;
            }

            let spec = record_spec(chore, key.person_id);
            let ended = record.status == ChoreStatus::Approved || spec.advances_unconditionally();
            if !ended || matches!(spec, Recurrence::None) {
                continue;
            }

            let anchor = if spec.anchors_on_completion() {
                record.last_completed_at.unwrap_or(due)
            } else {
                due
            };
            if let Some(next) = scheduled_due(chore, key.person_id, anchor, now, tz) {
                tracing::debug!(
                    chore_id = %key.chore_id,
                    ended_due = %due,
                    next_due = %next,
                    approved = record.status == ChoreStatus::Approved,
                    "Cycle reset"
                );
                record.begin_cycle(Some(next), now, chore.due_window_secs);
                armed += 1;
            }
        }
        if armed > 0 {
            self.mark_dirty();
        }
        armed
    }

    // -- internals -----------------------------------------------------------

    fn require_chore(&self, chore_id: ChoreId) -> Result<&Chore, CoreError> {
        self.chores
            .get(&chore_id)
            .ok_or_else(|| CoreError::chore_not_found(chore_id))
    }

    fn require_person(&self, person_id: PersonId) -> Result<(), CoreError> {
        if self.persons.contains_key(&person_id) {
            Ok(())
        } else {
            Err(CoreError::person_not_found(person_id))
        }
    }

    fn mark_dirty(&mut self) {
        self.earliest_dirty = true;
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Record key for a person acting on a chore.
fn record_key(chore: &Chore, person_id: PersonId) -> AssignmentKey {
    AssignmentKey {
        chore_id: chore.id,
        person_id: if chore.discipline.is_shared() {
            None
        } else {
            Some(person_id)
        },
    }
}

/// The recurrence spec in effect for a record.
fn record_spec<'a>(chore: &'a Chore, person_id: Option<PersonId>) -> &'a Recurrence {
    match person_id {
        Some(person) => chore.effective_recurrence(person),
        None => &chore.recurrence,
    }
}

/// Next scheduled due timestamp for a record, or `None` for one-shot and
/// malformed specs (the latter degrade with a warning instead of failing
/// the sweep/reset path).
fn scheduled_due(
    chore: &Chore,
    person_id: Option<PersonId>,
    anchor: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    let spec = record_spec(chore, person_id);
    if matches!(spec, Recurrence::None) {
        return None;
    }
    let due = match next_due(anchor, spec, tz, now, true) {
        Ok(due) => due,
        Err(err) => {
            tracing::warn!(
                chore_id = %chore.id,
                error = %err,
                "Malformed recurrence spec, treating chore as one-shot"
            );
            return None;
        }
    };
    match &chore.applicable_days {
        Some(days) => match align_to_applicable_day(due, days, tz) {
            Ok(aligned) => Some(aligned),
            Err(err) => {
                tracing::warn!(
                    chore_id = %chore.id,
                    error = %err,
                    "Applicable-days alignment failed, keeping unaligned due date"
                );
                Some(due)
            }
        },
        None => Some(due),
    }
}

/// Emit one signal event per recipient of a record: the record's own person
/// for independent chores, every assignee for shared ones.
fn push_signal(
    events: &mut Vec<ChoreEvent>,
    chore: &Chore,
    key: &AssignmentKey,
    kind: ChoreEventKind,
    now: DateTime<Utc>,
) {
    match key.person_id {
        Some(person) => events.push(ChoreEvent::new(key.chore_id, Some(person), kind, now)),
        None => {
            for person in &chore.assignees {
                events.push(ChoreEvent::new(key.chore_id, Some(*person), kind, now));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn ts(s: &str) -> DateTime<Utc> {
        format!("{s}Z").parse().expect("valid timestamp")
    }

    fn store_with_person() -> (ChoreStore, PersonId) {
        let mut store = ChoreStore::new(chrono_tz::UTC);
        let person = Uuid::new_v4();
        store
            .upsert_person(Person {
                id: person,
                name: "Alex".to_string(),
            })
            .unwrap();
        (store, person)
    }

    fn daily_chore(assignees: &[PersonId], due: &str) -> Chore {
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

    // -- configuration -------------------------------------------------------

    #[test]
    fn upsert_chore_creates_record_per_assignee() {
        let (mut store, person) = store_with_person();
        let other = Uuid::new_v4();
        store
            .upsert_person(Person {
                id: other,
                name: "Kim".to_string(),
            })
            .unwrap();

        let chore = daily_chore(&[person, other], "2026-01-05T09:00:00");
        let now = ts("2026-01-05T07:00:00");
        store.upsert_chore(chore.clone(), now).unwrap();

        assert_eq!(store.assignment_count(), 2);
        assert!(store.record(chore.id, Some(person)).is_some());
        assert!(store.record(chore.id, Some(other)).is_some());
    }

    #[test]
    fn shared_chore_has_single_record() {
        let (mut store, person) = store_with_person();
        let mut chore = daily_chore(&[person], "2026-01-05T09:00:00");
        chore.discipline = CompletionDiscipline::SharedFirst;
        store.upsert_chore(chore.clone(), ts("2026-01-05T07:00:00")).unwrap();

        assert_eq!(store.assignment_count(), 1);
        assert!(store.record(chore.id, None).is_some());
    }

    #[test]
    fn upsert_chore_with_unknown_assignee_rejected() {
        let (mut store, _) = store_with_person();
        let chore = daily_chore(&[Uuid::new_v4()], "2026-01-05T09:00:00");
        let err = store
            .upsert_chore(chore, ts("2026-01-05T07:00:00"))
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "person", .. });
    }

    #[test]
    fn remove_chore_cascades_to_records() {
        let (mut store, person) = store_with_person();
        let chore = daily_chore(&[person], "2026-01-05T09:00:00");
        store.upsert_chore(chore.clone(), ts("2026-01-05T07:00:00")).unwrap();

        store.remove_chore(chore.id).unwrap();
        assert_eq!(store.assignment_count(), 0);
        assert!(store.chore(chore.id).is_none());
    }

    #[test]
    fn remove_assigned_person_refused() {
        let (mut store, person) = store_with_person();
        let chore = daily_chore(&[person], "2026-01-05T09:00:00");
        store.upsert_chore(chore, ts("2026-01-05T07:00:00")).unwrap();

        let err = store.remove_person(person).unwrap_err();
        assert_matches!(err, CoreError::Configuration(_));
    }

    // -- claim guards --------------------------------------------------------

    #[test]
    fn claim_unknown_chore_is_not_found() {
        let (mut store, person) = store_with_person();
        let err = store
            .claim(Uuid::new_v4(), person, ts("2026-01-05T08:00:00"))
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "chore", .. });
    }

    #[test]
    fn claim_by_non_assignee_is_not_found() {
        let (mut store, person) = store_with_person();
        let outsider = Uuid::new_v4();
        store
            .upsert_person(Person {
                id: outsider,
                name: "Sam".to_string(),
            })
            .unwrap();
        let chore = daily_chore(&[person], "2026-01-05T09:00:00");
        store.upsert_chore(chore.clone(), ts("2026-01-05T07:00:00")).unwrap();

        let err = store
            .claim(chore.id, outsider, ts("2026-01-05T08:00:00"))
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "assignment", .. });
    }

    #[test]
    fn double_claim_is_illegal_transition() {
        let (mut store, person) = store_with_person();
        let chore = daily_chore(&[person], "2026-01-05T09:00:00");
        store.upsert_chore(chore.clone(), ts("2026-01-05T07:00:00")).unwrap();

        store.claim(chore.id, person, ts("2026-01-05T08:00:00")).unwrap();
        let err = store
            .claim(chore.id, person, ts("2026-01-05T08:01:00"))
            .unwrap_err();
        assert_matches!(err, CoreError::IllegalTransition { .. });
    }

    #[test]
    fn approve_unclaimed_is_illegal_transition() {
        let (mut store, person) = store_with_person();
        let chore = daily_chore(&[person], "2026-01-05T09:00:00");
        store.upsert_chore(chore.clone(), ts("2026-01-05T07:00:00")).unwrap();

        let err = store
            .approve(chore.id, person, person, ts("2026-01-05T08:00:00"))
            .unwrap_err();
        assert_matches!(err, CoreError::IllegalTransition { .. });
    }

    // -- snapshot ------------------------------------------------------------

    #[test]
    fn snapshot_round_trip_preserves_state() {
        let (mut store, person) = store_with_person();
        let chore = daily_chore(&[person], "2026-01-05T09:00:00");
        store.upsert_chore(chore.clone(), ts("2026-01-05T07:00:00")).unwrap();
        store.claim(chore.id, person, ts("2026-01-05T08:00:00")).unwrap();

        let snapshot = store.to_snapshot();
        let restored = ChoreStore::from_snapshot(chrono_tz::UTC, snapshot);

        let record = restored.record(chore.id, Some(person)).unwrap();
        assert_eq!(record.status, ChoreStatus::Claimed);
        assert_eq!(record.claimed_at, Some(ts("2026-01-05T08:00:00")));
    }
}
