use chrono::{NaiveDate, NaiveTime, TimeZone};
use ulid::Ulid;

use super::*;
use crate::model::*;

const H: Ms = HOUR_MS; // 1 hour in ms
const M: Ms = MINUTE_MS; // 1 minute in ms

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Monday 2026-10-19 00:00 UTC.
fn monday() -> Ms {
    chrono::Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap().timestamp_millis()
}

fn monday_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn booking(start: Ms, end: Ms) -> Reservation {
    Reservation {
        id: Ulid::new(),
        workstation_id: WorkstationId::A,
        first_name: "Eva".into(),
        last_name: "Horvath".into(),
        span: Span::new(start, end),
        created_at: 0,
        status: ReservationStatus::Active,
    }
}

fn weekday_settings(open: NaiveTime, close: NaiveTime, limits: BookingLimits) -> Settings {
    let mut hours = OpeningHours::new();
    for d in 1..=5 {
        hours.set(d, OpeningRule::new(open, close));
    }
    Settings::new(hours, limits, chrono_tz::UTC)
}

fn limits(min: i64, max: i64, horizon: u32) -> BookingLimits {
    BookingLimits {
        min_slot_minutes: min,
        max_slot_minutes: max,
        booking_horizon_days: horizon,
        max_capacity: 1,
    }
}

// ── Interval properties ──────────────────────────────────

#[test]
fn overlap_is_symmetric() {
    let mut spans = Vec::new();
    for s in 0..5 {
        for e in 0..5 {
            spans.push(Span::new(s * 10, e * 10));
        }
    }
    for a in &spans {
        for b in &spans {
            assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
        }
        assert_eq!(a.overlaps(a), a.duration_ms() > 0, "{a:?}");
    }
}

#[test]
fn touching_spans_do_not_overlap() {
    assert!(!Span::new(0, 10).overlaps(&Span::new(10, 20)));
}

// ── Occupancy properties ─────────────────────────────────

#[test]
fn exact_fill_nine_to_five_is_full() {
    let settings = weekday_settings(hm(9, 0), hm(17, 0), BookingLimits::default());
    let d = monday();
    let rs = [booking(d + 9 * H, d + 17 * H)];
    assert_eq!(classify_date(&settings, monday_date(), &rs), DayOccupancy::Full);
}

#[test]
fn adding_reservations_never_lowers_occupancy() {
    let settings = weekday_settings(hm(9, 0), hm(17, 0), BookingLimits::default());
    let d = monday();
    let candidates = [
        booking(d + 7 * H, d + 8 * H), // before opening, contributes nothing
        booking(d + 10 * H, d + 10 * H + 45 * M),
        booking(d + 12 * H, d + 14 * H),
        booking(d + 9 * H, d + 10 * H),
        booking(d + 14 * H, d + 18 * H),
        booking(d + 10 * H + 45 * M, d + 12 * H),
    ];

    let mut rows = Vec::new();
    let mut last = classify_date(&settings, monday_date(), &rows);
    assert_eq!(last, DayOccupancy::Free);
    for r in candidates {
        rows.push(r);
        let now = classify_date(&settings, monday_date(), &rows);
        assert!(now >= last, "{last:?} -> {now:?} after {} rows", rows.len());
        last = now;
    }
    assert_eq!(last, DayOccupancy::Full);
}

#[test]
fn classification_is_idempotent() {
    let settings = weekday_settings(hm(9, 0), hm(17, 0), BookingLimits::default());
    let d = monday();
    let rs = [booking(d + 10 * H, d + 11 * H)];
    let first = classify_date(&settings, monday_date(), &rs);
    let second = classify_date(&settings, monday_date(), &rs);
    assert_eq!(first, second);
    assert_eq!(first, DayOccupancy::Partial);
}

#[test]
fn disabled_day_is_free_despite_reservations() {
    let settings = Settings::new(
        OpeningHours::new().with_rule(1, OpeningRule::closed(hm(9, 0), hm(17, 0))),
        BookingLimits::default(),
        chrono_tz::UTC,
    );
    let d = monday();
    let rs = [booking(d + 9 * H, d + 17 * H)];
    assert_eq!(classify_date(&settings, monday_date(), &rs), DayOccupancy::Free);
}

// ── Snapshot ─────────────────────────────────────────────

#[test]
fn snapshot_back_to_back_boundary() {
    let d = monday();
    let first = booking(d + 9 * H, d + 10 * H);
    let second = booking(d + 10 * H, d + 11 * H);
    let rows = [first.clone(), second.clone()];

    let at_half_past = snapshot(d + 9 * H + 30 * M, &rows);
    assert_eq!(at_half_past.current, Some(first));
    assert_eq!(at_half_past.next, Some(second.clone()));

    let at_ten = snapshot(d + 10 * H, &rows);
    assert_eq!(at_ten.current, Some(second));
    assert!(at_ten.next.is_none());
}

// ── Validator ────────────────────────────────────────────

#[test]
fn short_proposal_rejected_regardless_of_hours() {
    let settings = weekday_settings(hm(8, 0), hm(16, 0), limits(30, 240, 7));
    let d = monday();
    // Sunday 03:00, closed day and outside any hours, still reports duration first.
    let sunday = d - DAY_MS;
    let r = validate(&Span::new(sunday + 3 * H, sunday + 3 * H + 20 * M), &settings, sunday);
    assert_eq!(r, Err(Rejection::TooShort { min_minutes: 30 }));
}

#[test]
fn proposal_crossing_close_rejected() {
    let settings = weekday_settings(hm(8, 0), hm(16, 0), limits(30, 240, 7));
    let d = monday();
    let r = validate(&Span::new(d + 15 * H + 30 * M, d + 16 * H + 30 * M), &settings, d);
    assert_eq!(
        r,
        Err(Rejection::OutsideOpeningHours {
            open: hm(8, 0),
            close: hm(16, 0)
        })
    );
}

#[test]
fn horizon_boundary() {
    let settings = weekday_settings(hm(8, 0), hm(16, 0), limits(30, 240, 7));
    let now = monday() + 10 * H;

    // Exactly seven days later: the boundary itself is allowed.
    let on_edge = Span::new(now + 7 * DAY_MS, now + 7 * DAY_MS + H);
    assert_eq!(validate(&on_edge, &settings, now), Ok(()));

    // Earlier the same day is well inside.
    let morning = Span::new(now + 7 * DAY_MS - 2 * H, now + 7 * DAY_MS - H);
    assert_eq!(validate(&morning, &settings, now), Ok(()));

    // Eight days later is out.
    let beyond = Span::new(now + 8 * DAY_MS, now + 8 * DAY_MS + H);
    assert_eq!(
        validate(&beyond, &settings, now),
        Err(Rejection::BeyondHorizon { horizon_days: 7 })
    );

    // The boundary is an instant, not a day: one minute past is out.
    let just_after = Span::new(now + 7 * DAY_MS + M, now + 7 * DAY_MS + H);
    assert_eq!(
        validate(&just_after, &settings, now),
        Err(Rejection::BeyondHorizon { horizon_days: 7 })
    );
}

#[test]
fn horizon_checked_before_closed_day() {
    let settings = weekday_settings(hm(8, 0), hm(16, 0), limits(30, 240, 7));
    let now = monday();
    // Two Sundays ahead: both beyond the horizon and closed.
    let far_sunday = monday() + 13 * DAY_MS;
    let r = validate(&Span::new(far_sunday + 9 * H, far_sunday + 10 * H), &settings, now);
    assert_eq!(r, Err(Rejection::BeyondHorizon { horizon_days: 7 }));
}

#[test]
fn zero_horizon_allows_past_and_present_only() {
    let settings = weekday_settings(hm(8, 0), hm(16, 0), limits(30, 240, 0));
    let now = monday() + 9 * H;
    assert_eq!(validate(&Span::new(now, now + H), &settings, now), Ok(()));
    assert_eq!(
        validate(&Span::new(now + M, now + H), &settings, now),
        Err(Rejection::BeyondHorizon { horizon_days: 0 })
    );
}
