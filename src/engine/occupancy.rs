use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::model::*;

use super::hours::{civil_date, window_for};

// ── Occupancy classification ─────────────────────────────────────

/// Minutes of `window` covered by active reservations that start on `day`.
///
/// A reservation counts only toward the civil date of its start instant, so
/// a slot crossing midnight adds nothing to the following day.
pub fn reserved_minutes(window: &Span, day: NaiveDate, tz: Tz, reservations: &[Reservation]) -> i64 {
    reservations
        .iter()
        .filter(|r| r.is_active())
        .filter(|r| civil_date(tz, r.span.start) == Some(day))
        .map(|r| r.span.clamp_to(window).duration_minutes())
        .sum()
}

/// Tri-state label for one civil date.
///
/// Closed and degenerate windows are `Free`. Exactly filling the window is `Full`.
pub fn classify_day(
    window: Option<Span>,
    day: NaiveDate,
    tz: Tz,
    reservations: &[Reservation],
) -> DayOccupancy {
    let Some(window) = window.filter(|w| !w.is_empty()) else {
        return DayOccupancy::Free;
    };
    let available = window.duration_minutes();
    let reserved = reserved_minutes(&window, day, tz, reservations);

    if reserved <= 0 {
        DayOccupancy::Free
    } else if available > 0 && reserved >= available {
        DayOccupancy::Full
    } else {
        DayOccupancy::Partial
    }
}

/// `classify_day` with the window looked up from `settings`.
pub fn classify_date(settings: &Settings, day: NaiveDate, reservations: &[Reservation]) -> DayOccupancy {
    let tz = settings.timezone;
    let window = window_for(&settings.opening_hours_by_day, tz, day);
    classify_day(window, day, tz, reservations)
}

/// Classify every civil date from `range.start`'s date through `range.end`'s date inclusive.
pub fn occupancy_by_date(
    settings: &Settings,
    reservations: &[Reservation],
    range: &Span,
) -> BTreeMap<NaiveDate, DayOccupancy> {
    let tz = settings.timezone;
    let (Some(first), Some(last)) = (civil_date(tz, range.start), civil_date(tz, range.end)) else {
        return BTreeMap::new();
    };
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| (d, classify_date(settings, d, reservations)))
        .collect()
}
