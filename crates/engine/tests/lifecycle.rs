//! Lifecycle tests for the chore store: claim/approve/disapprove flows,
//! completion disciplines, and the administrative re-scheduling commands.

use assert_matches::assert_matches;

use chorewheel_core::chore::CompletionDiscipline;
use chorewheel_core::error::CoreError;
use chorewheel_core::lifecycle::ChoreStatus;
use chorewheel_events::ChoreEventKind;

mod common;
use common::{daily_chore, person, store_with, ts};

// ---------------------------------------------------------------------------
// Test: claim -> disapprove -> claim -> approve round trip
// ---------------------------------------------------------------------------

#[test]
fn round_trip_ends_approved_with_one_advance() {
    let alex = person("Alex");
    let mut store = store_with(&[&alex]);
    let chore = daily_chore(&[alex.id], "2026-01-05T09:00:00");
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    store.claim(chore.id, alex.id, ts("2026-01-05T08:00:00")).unwrap();
    store
        .disapprove(chore.id, alex.id, alex.id, ts("2026-01-05T08:05:00"))
        .unwrap();

    // Back to pending, claim metadata gone.
    let record = store.record(chore.id, Some(alex.id)).unwrap();
    assert_eq!(record.status, ChoreStatus::Pending);
    assert!(record.claimant.is_none());
    assert!(record.claimed_at.is_none());

    store.claim(chore.id, alex.id, ts("2026-01-05T08:10:00")).unwrap();
    let events = store
        .approve(chore.id, alex.id, alex.id, ts("2026-01-05T08:30:00"))
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChoreEventKind::Approved);

    let record = store.record(chore.id, Some(alex.id)).unwrap();
    assert_eq!(record.status, ChoreStatus::Approved);
    assert!(record.claimant.is_none());
    assert!(record.claimed_at.is_none());
    assert_eq!(record.due_at, Some(ts("2026-01-05T09:00:00")));

    // Exactly one completion recorded, and exactly one advance after the
    // day rolls over.
    assert_eq!(store.completions().len(), 1);
    let armed = store.cycle_reset(ts("2026-01-06T00:00:00"));
    assert_eq!(armed, 1);
    let record = store.record(chore.id, Some(alex.id)).unwrap();
    assert_eq!(record.due_at, Some(ts("2026-01-06T09:00:00")));
    assert_eq!(record.status, ChoreStatus::Pending);
}

// ---------------------------------------------------------------------------
// Test: disapprove recomputes status from due-vs-now
// ---------------------------------------------------------------------------

#[test]
fn disapprove_after_due_reverts_to_overdue() {
    let alex = person("Alex");
    let mut store = store_with(&[&alex]);
    let chore = daily_chore(&[alex.id], "2026-01-05T09:00:00");
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    store.claim(chore.id, alex.id, ts("2026-01-05T08:00:00")).unwrap();
    store
        .disapprove(chore.id, alex.id, alex.id, ts("2026-01-05T10:00:00"))
        .unwrap();

    let record = store.record(chore.id, Some(alex.id)).unwrap();
    assert_eq!(record.status, ChoreStatus::Overdue);
    // The recurrence did not advance.
    assert_eq!(record.due_at, Some(ts("2026-01-05T09:00:00")));
}

// ---------------------------------------------------------------------------
// Test: shared-first exclusivity
// ---------------------------------------------------------------------------

#[test]
fn shared_first_locks_to_first_claimant() {
    let alex = person("Alex");
    let kim = person("Kim");
    let sam = person("Sam");
    let mut store = store_with(&[&alex, &kim, &sam]);
    let mut chore = daily_chore(&[alex.id, kim.id, sam.id], "2026-01-05T09:00:00");
    chore.discipline = CompletionDiscipline::SharedFirst;
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    // First claim wins...
    store.claim(chore.id, alex.id, ts("2026-01-05T08:00:00")).unwrap();
    // ...and the second is rejected.
    let err = store
        .claim(chore.id, kim.id, ts("2026-01-05T08:00:01"))
        .unwrap_err();
    assert_matches!(err, CoreError::IllegalTransition { .. });

    let record = store.record(chore.id, None).unwrap();
    assert_eq!(record.status, ChoreStatus::Claimed);
    assert_eq!(record.claimant, Some(alex.id));
}

#[test]
fn shared_first_approval_targets_the_claimant() {
    let alex = person("Alex");
    let kim = person("Kim");
    let mut store = store_with(&[&alex, &kim]);
    let mut chore = daily_chore(&[alex.id, kim.id], "2026-01-05T09:00:00");
    chore.discipline = CompletionDiscipline::SharedFirst;
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    store.claim(chore.id, alex.id, ts("2026-01-05T08:00:00")).unwrap();

    // Approving the non-claimant is rejected.
    let err = store
        .approve(chore.id, kim.id, kim.id, ts("2026-01-05T08:30:00"))
        .unwrap_err();
    assert_matches!(err, CoreError::IllegalTransition { .. });

    // Approving the claimant credits every original assignee.
    let events = store
        .approve(chore.id, alex.id, kim.id, ts("2026-01-05T08:31:00"))
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(store.completions().len(), 2);
    let credited: Vec<_> = store.completions().iter().map(|c| c.person_id).collect();
    assert!(credited.contains(&alex.id));
    assert!(credited.contains(&kim.id));
}

// ---------------------------------------------------------------------------
// Test: shared-all accumulation
// ---------------------------------------------------------------------------

#[test]
fn shared_all_claims_accumulate_until_everyone_claimed() {
    let alex = person("Alex");
    let kim = person("Kim");
    let mut store = store_with(&[&alex, &kim]);
    let mut chore = daily_chore(&[alex.id, kim.id], "2026-01-05T09:00:00");
    chore.discipline = CompletionDiscipline::SharedAll;
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    store.claim(chore.id, alex.id, ts("2026-01-05T07:00:00")).unwrap();
    let record = store.record(chore.id, None).unwrap();
    assert_eq!(record.status, ChoreStatus::Pending);

    // Approving before everyone has claimed is illegal.
    let err = store
        .approve(chore.id, alex.id, alex.id, ts("2026-01-05T07:30:00"))
        .unwrap_err();
    assert_matches!(err, CoreError::IllegalTransition { .. });

    // Duplicate claim by the same person is rejected.
    let err = store
        .claim(chore.id, alex.id, ts("2026-01-05T07:31:00"))
        .unwrap_err();
    assert_matches!(err, CoreError::IllegalTransition { .. });

    store.claim(chore.id, kim.id, ts("2026-01-05T08:00:00")).unwrap();
    let record = store.record(chore.id, None).unwrap();
    assert_eq!(record.status, ChoreStatus::Claimed);

    let events = store
        .approve(chore.id, kim.id, alex.id, ts("2026-01-05T08:30:00"))
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(store.completions().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: manual re-scheduling
// ---------------------------------------------------------------------------

#[test]
fn set_due_date_recomputes_status_but_keeps_claims() {
    let alex = person("Alex");
    let mut store = store_with(&[&alex]);
    let mut chore = daily_chore(&[alex.id], "2026-01-05T09:00:00");
    chore.due_window_secs = Some(3600);
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    // Inside the window of the new due timestamp -> Due.
    store
        .set_due_date(chore.id, ts("2026-01-05T10:30:00"), ts("2026-01-05T10:00:00"))
        .unwrap();
    let record = store.record(chore.id, Some(alex.id)).unwrap();
    assert_eq!(record.status, ChoreStatus::Due);
    assert_eq!(record.due_at, Some(ts("2026-01-05T10:30:00")));

    // A claimed record keeps its claim but takes the new due timestamp.
    store.claim(chore.id, alex.id, ts("2026-01-05T10:05:00")).unwrap();
    store
        .set_due_date(chore.id, ts("2026-01-05T12:00:00"), ts("2026-01-05T10:10:00"))
        .unwrap();
    let record = store.record(chore.id, Some(alex.id)).unwrap();
    assert_eq!(record.status, ChoreStatus::Claimed);
    assert_eq!(record.due_at, Some(ts("2026-01-05T12:00:00")));
    assert_eq!(record.claimant, Some(alex.id));
}

#[test]
fn set_due_date_on_approved_record_is_illegal() {
    let alex = person("Alex");
    let mut store = store_with(&[&alex]);
    let chore = daily_chore(&[alex.id], "2026-01-05T09:00:00");
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    store.claim(chore.id, alex.id, ts("2026-01-05T08:00:00")).unwrap();
    store
        .approve(chore.id, alex.id, alex.id, ts("2026-01-05T08:30:00"))
        .unwrap();

    let err = store
        .set_due_date(chore.id, ts("2026-01-06T09:00:00"), ts("2026-01-05T09:00:00"))
        .unwrap_err();
    assert_matches!(err, CoreError::IllegalTransition { .. });
}

#[test]
fn skip_to_next_due_rolls_one_occurrence() {
    let alex = person("Alex");
    let mut store = store_with(&[&alex]);
    let chore = daily_chore(&[alex.id], "2026-01-05T09:00:00");
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();

    store
        .skip_to_next_due(chore.id, ts("2026-01-05T08:00:00"))
        .unwrap();
    let record = store.record(chore.id, Some(alex.id)).unwrap();
    assert_eq!(record.due_at, Some(ts("2026-01-06T09:00:00")));
    assert_eq!(record.status, ChoreStatus::Pending);
}

// ---------------------------------------------------------------------------
// Test: unknown ids surface as NotFound
// ---------------------------------------------------------------------------

#[test]
fn unknown_person_in_approve_is_not_found() {
    let alex = person("Alex");
    let ghost = person("Ghost");
    let mut store = store_with(&[&alex]);
    let chore = daily_chore(&[alex.id], "2026-01-05T09:00:00");
    store.upsert_chore(chore.clone(), ts("2026-01-05T00:00:00")).unwrap();
    store.claim(chore.id, alex.id, ts("2026-01-05T08:00:00")).unwrap();

    let err = store
        .approve(chore.id, alex.id, ghost.id, ts("2026-01-05T08:30:00"))
        .unwrap_err();
    assert_matches!(err, CoreError::NotFound { entity: "person", .. });
}
