//! Recurrence calculator (PRD-01).
//!
//! Pure next-due-date computation: given a base timestamp, a recurrence
//! spec, and a "must land strictly in the future" flag, produce the next
//! due timestamp. No I/O. Comparisons happen in UTC; day/week/month
//! boundary arithmetic happens in the configured local zone and is
//! converted back.

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hard ceiling on catch-up steps in [`next_due`].
///
/// Reaching it means the spec could not be advanced past "now" in a sane
/// number of applications (e.g. a degenerate month-end anchor); the
/// calculator logs and returns the best-effort result instead of looping.
pub const MAX_RECURRENCE_STEPS: u32 = 1000;

/// Wall-clock time used for all period-end due timestamps.
fn period_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).expect("23:59:59 is a valid time")
}

/// Upper bound on attempts when resolving a local time that falls into a
/// DST gap (shift forward one hour per attempt).
const MAX_GAP_SHIFTS: u32 = 3;

// ---------------------------------------------------------------------------
// Spec types
// ---------------------------------------------------------------------------

/// Unit for custom N-unit intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceUnit {
    Days,
    Weeks,
    Months,
}

/// Recurrence spec of a chore.
///
/// `CustomFromCompletion` steps exactly like `Custom`; the difference is the
/// anchor the caller must supply (the actual completion timestamp, not the
/// previous due timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    /// One-shot; never re-arms.
    None,
    Daily,
    /// Several fixed times of day, every day.
    DailyMulti { times: Vec<NaiveTime> },
    Weekly { weekday: Weekday },
    Biweekly,
    /// A fixed day of month, clamped to month length (31 -> Feb 28/29).
    Monthly { day: u32 },
    Custom { every: u32, unit: RecurrenceUnit },
    CustomFromCompletion { every: u32, unit: RecurrenceUnit },
    EndOfDay,
    /// Weeks run Monday through Sunday.
    EndOfWeek,
    EndOfMonth,
    EndOfQuarter,
    EndOfHalfYear,
    EndOfYear,
}

impl Recurrence {
    /// Whether the cycle-reset orchestrator advances this spec even when the
    /// chore was never approved. Everything except `None` re-arms.
    pub fn advances_unconditionally(&self) -> bool {
        !matches!(self, Recurrence::None)
    }

    /// Whether the next-due anchor is the completion timestamp instead of
    /// the previous due timestamp.
    pub fn anchors_on_completion(&self) -> bool {
        matches!(self, Recurrence::CustomFromCompletion { .. })
    }
}

/// Validate a recurrence spec, returning `CoreError::Configuration` for
/// malformed ones. Callers in the sweep/reset path degrade a rejected spec
/// to one-shot behavior rather than crashing.
pub fn validate_recurrence(spec: &Recurrence) -> Result<(), CoreError> {
    match spec {
        Recurrence::DailyMulti { times } if times.is_empty() => Err(CoreError::Configuration(
            "daily_multi requires at least one time of day".to_string(),
        )),
        Recurrence::Monthly { day } if *day < 1 || *day > 31 => Err(CoreError::Configuration(
            format!("monthly day must be in 1..=31, got {day}"),
        )),
        Recurrence::Custom { every, .. } | Recurrence::CustomFromCompletion { every, .. }
            if *every == 0 =>
        {
            Err(CoreError::Configuration(
                "custom interval must be at least 1".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// next_due
// ---------------------------------------------------------------------------

/// Compute the next due timestamp after `base` for `spec`.
///
/// Applies one recurrence step to `base`; while `require_strictly_future`
/// is set and the result is not after `now`, applies another. Guarded by
/// [`MAX_RECURRENCE_STEPS`]; a stalled step (no forward movement) is forced
/// ahead by one whole calendar day before re-testing.
///
/// `Recurrence::None` returns `base` unchanged: one-shot chores never
/// re-arm, regardless of the future flag.
pub fn next_due(
    base: DateTime<Utc>,
    spec: &Recurrence,
    tz: Tz,
    now: DateTime<Utc>,
    require_strictly_future: bool,
) -> Result<DateTime<Utc>, CoreError> {
    validate_recurrence(spec)?;

    if matches!(spec, Recurrence::None) {
        return Ok(base);
    }

    let mut result = step(base, spec, tz);
    if require_strictly_future {
        let mut steps = 1u32;
        while result <= now {
            if steps >= MAX_RECURRENCE_STEPS {
                tracing::warn!(
                    steps,
                    base = %base,
                    result = %result,
                    "Recurrence step ceiling reached, returning best-effort due date"
                );
                break;
            }
            let mut next = step(result, spec, tz);
            if next <= result {
                // Stalled (identical or regressing timestamp): force a whole
                // day of progress, not a sub-day nudge.
                next = add_local_days(result, 1, tz);
            }
            debug_assert!(next > result, "recurrence step must advance");
            result = next;
            steps += 1;
        }
    }
    Ok(result)
}

/// Advance `due` to the first weekday allowed by an applicable-days filter,
/// preserving the wall-clock time. At most six whole days of movement.
pub fn align_to_applicable_day(
    due: DateTime<Utc>,
    days: &[Weekday],
    tz: Tz,
) -> Result<DateTime<Utc>, CoreError> {
    if days.is_empty() {
        return Err(CoreError::Configuration(
            "applicable-days filter must not be empty".to_string(),
        ));
    }
    let mut current = due;
    for _ in 0..7 {
        let weekday = current.with_timezone(&tz).weekday();
        if days.contains(&weekday) {
            return Ok(current);
        }
        current = add_local_days(current, 1, tz);
    }
    // Unreachable with a non-empty filter; seven shifts cover the week.
    Ok(current)
}

// ---------------------------------------------------------------------------
// Single step
// ---------------------------------------------------------------------------

/// Apply exactly one recurrence step to `current`.
///
/// Self-locating variants (`DailyMulti`, `Weekly`, `Monthly`, the period
/// ends) advance to their next occurrence strictly after `current`;
/// fixed-delta variants add their interval.
fn step(current: DateTime<Utc>, spec: &Recurrence, tz: Tz) -> DateTime<Utc> {
    match spec {
        Recurrence::None => current,
        Recurrence::Daily => add_local_days(current, 1, tz),
        Recurrence::DailyMulti { times } => next_time_slot(current, times, tz),
        Recurrence::Weekly { weekday } => next_weekday(current, *weekday, tz),
        Recurrence::Biweekly => add_local_days(current, 14, tz),
        Recurrence::Monthly { day } => next_day_of_month(current, *day, tz),
        Recurrence::Custom { every, unit }
        | Recurrence::CustomFromCompletion { every, unit } => match unit {
            RecurrenceUnit::Days => add_local_days(current, u64::from(*every), tz),
            RecurrenceUnit::Weeks => add_local_days(current, 7 * u64::from(*every), tz),
            RecurrenceUnit::Months => add_local_months(current, *every, tz),
        },
        Recurrence::EndOfDay => next_period_end(current, tz, |date| date),
        Recurrence::EndOfWeek => next_period_end(current, tz, week_end_date),
        Recurrence::EndOfMonth => next_period_end(current, tz, month_end_date),
        Recurrence::EndOfQuarter => next_period_end(current, tz, quarter_end_date),
        Recurrence::EndOfHalfYear => next_period_end(current, tz, half_year_end_date),
        Recurrence::EndOfYear => next_period_end(current, tz, year_end_date),
    }
}

/// Earliest configured time-of-day strictly after `current`, rolling to the
/// first slot on the next local day once today's slots have all passed.
fn next_time_slot(current: DateTime<Utc>, times: &[NaiveTime], tz: Tz) -> DateTime<Utc> {
    let local = to_local(current, tz);
    let today = local.date();

    if let Some(slot) = times
        .iter()
        .copied()
        .filter(|t| today.and_time(*t) > local)
        .min()
    {
        return resolve_local(today.and_time(slot), tz);
    }

    let first = times.iter().copied().min().expect("validated non-empty");
    let tomorrow = today
        .checked_add_days(Days::new(1))
        .expect("date within supported range");
    resolve_local(tomorrow.and_time(first), tz)
}

/// Next occurrence of `weekday` strictly after `current`, keeping the
/// wall-clock time. A base already on that weekday moves a full week.
fn next_weekday(current: DateTime<Utc>, weekday: Weekday, tz: Tz) -> DateTime<Utc> {
    let local = to_local(current, tz);
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - local.weekday().num_days_from_monday() as i64)
        % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    add_local_days(current, ahead as u64, tz)
}

/// Next occurrence of `day`-of-month strictly after `current`, clamped to
/// the target month's length and keeping the wall-clock time.
fn next_day_of_month(current: DateTime<Utc>, day: u32, tz: Tz) -> DateTime<Utc> {
    let local = to_local(current, tz);
    let time = local.time();
    let mut first_of_month = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)
        .expect("first of month is always valid");

    loop {
        let candidate = clamp_to_month(first_of_month, day).and_time(time);
        if candidate > local {
            return resolve_local(candidate, tz);
        }
        first_of_month = first_of_month
            .checked_add_months(Months::new(1))
            .expect("date within supported range");
    }
}

/// End (23:59:59 local) of the period containing `current`, or of the next
/// period when the containing period's end is not strictly after `current`.
fn next_period_end(
    current: DateTime<Utc>,
    tz: Tz,
    end_date_of: fn(NaiveDate) -> NaiveDate,
) -> DateTime<Utc> {
    let local = to_local(current, tz);
    let mut probe = local.date();
    loop {
        let candidate = end_date_of(probe).and_time(period_end_time());
        if candidate > local {
            return resolve_local(candidate, tz);
        }
        // Step past the period that just ended and probe again.
        probe = end_date_of(probe)
            .checked_add_days(Days::new(1))
            .expect("date within supported range");
    }
}

// ---------------------------------------------------------------------------
// Period end dates
// ---------------------------------------------------------------------------

fn week_end_date(date: NaiveDate) -> NaiveDate {
    let to_sunday = 6 - date.weekday().num_days_from_monday() as u64;
    date.checked_add_days(Days::new(to_sunday))
        .expect("date within supported range")
}

fn month_end_date(date: NaiveDate) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("first of month is always valid");
    first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .expect("date within supported range")
}

fn quarter_end_date(date: NaiveDate) -> NaiveDate {
    let end_month = ((date.month0() / 3) + 1) * 3;
    month_end_date(
        NaiveDate::from_ymd_opt(date.year(), end_month, 1).expect("quarter month is valid"),
    )
}

fn half_year_end_date(date: NaiveDate) -> NaiveDate {
    let end_month = if date.month() <= 6 { 6 } else { 12 };
    month_end_date(
        NaiveDate::from_ymd_opt(date.year(), end_month, 1).expect("half-year month is valid"),
    )
}

fn year_end_date(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 12, 31).expect("december 31 is always valid")
}

// ---------------------------------------------------------------------------
// Local-zone helpers
// ---------------------------------------------------------------------------

fn to_local(ts: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    ts.with_timezone(&tz).naive_local()
}

/// Resolve a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) take the earlier mapping; nonexistent
/// times (DST spring-forward gap) are shifted forward an hour at a time.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let mut candidate = naive;
    for _ in 0..=MAX_GAP_SHIFTS {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earlier, _) => return earlier.with_timezone(&Utc),
            LocalResult::None => {
                candidate += Duration::hours(1);
            }
        }
    }
    // A gap wider than MAX_GAP_SHIFTS hours does not occur in the tz
    // database; fall back to interpreting the wall-clock time as UTC.
    Utc.from_utc_datetime(&naive)
}

/// Add `n` whole calendar days in the local zone, preserving wall-clock time.
fn add_local_days(ts: DateTime<Utc>, n: u64, tz: Tz) -> DateTime<Utc> {
    let local = to_local(ts, tz);
    let shifted = local
        .checked_add_days(Days::new(n))
        .expect("date within supported range");
    resolve_local(shifted, tz)
}

/// Add `n` calendar months in the local zone, clamping the day to the
/// target month's length and preserving wall-clock time.
fn add_local_months(ts: DateTime<Utc>, n: u32, tz: Tz) -> DateTime<Utc> {
    let local = to_local(ts, tz);
    let shifted = local
        .checked_add_months(Months::new(n))
        .expect("date within supported range");
    resolve_local(shifted, tz)
}

fn clamp_to_month(first_of_month: NaiveDate, day: u32) -> NaiveDate {
    let last = month_end_date(first_of_month);
    let clamped = day.min(last.day());
    NaiveDate::from_ymd_opt(first_of_month.year(), first_of_month.month(), clamped)
        .expect("clamped day is always valid")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
