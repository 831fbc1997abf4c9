//! Review-date generation.
//!
//! Pure function of (familiarity, difficulty, start, end) — no I/O, no
//! state. The store calls this once at schedule creation and persists
//! the result; nothing ever regenerates dates afterwards.

use chrono::{Duration, NaiveDate};

/// Hard cap on dates per schedule, including the start date.
pub const MAX_REVIEWS: usize = 100;

/// Intervals past this many days are runaway — stop generating.
const MAX_INTERVAL_DAYS: i64 = 1000;

/// Easiness factor: the per-step growth rate of the review interval.
/// Floored at 1.5 so low self-ratings can't produce degenerately short
/// intervals.
pub fn easiness_factor(familiarity: u8, difficulty: u8) -> f64 {
    ((familiarity as f64 + difficulty as f64) / 2.0).max(1.5)
}

/// Generate the review dates for one topic.
///
/// The first date is always `start`. Each following date is
/// `start + interval` days, where the interval is the running product
/// of EF with rounding applied at every step — not a clean exponential,
/// because `round()` feeds back into the next multiplication. Rounding
/// is `f64::round`: nearest integer day, ties away from zero (so
/// EF 1.5 × 1 → 2). Pinned by the golden test below.
///
/// Generation stops at the first date past `end` (intervals only grow,
/// so the first overshoot ends the whole sequence), at 100 dates, or
/// when an interval exceeds 1000 days.
///
/// Callers validate `familiarity`/`difficulty` ∈ 1..=5 and
/// `end > start`; with `end <= start` this returns just `[start]`.
pub fn review_dates(
    familiarity: u8,
    difficulty: u8,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let ef = easiness_factor(familiarity, difficulty);

    let mut dates = vec![start];
    let mut interval: i64 = 1;

    for _ in 1..MAX_REVIEWS {
        let next = (ef * interval as f64).round() as i64;
        if next > MAX_INTERVAL_DAYS {
            break;
        }
        interval = next;

        // checked_add: near NaiveDate::MAX the candidate can overflow
        // the calendar before it overshoots `end`.
        let candidate = match start.checked_add_signed(Duration::days(next)) {
            Some(date) => date,
            None => break,
        };
        if candidate > end {
            break;
        }
        dates.push(candidate);
    }

    dates
}

// ── Tests ──────────────────────────────────────────────────────
