use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;

use crate::limits::{FALLBACK_CLOSE, FALLBACK_OPEN};
use crate::model::*;

// ── Civil time ───────────────────────────────────────────────────

/// 0 = Sunday … 6 = Saturday.
pub fn weekday_key(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Local civil date of an instant in `tz`.
pub fn civil_date(tz: Tz, t: Ms) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(t).single().map(|dt| dt.date_naive())
}

/// Combine a civil date with a time of day in `tz`.
///
/// Ambiguous local times (clocks falling back) resolve to the earlier instant.
/// Local times inside a spring-forward gap are shifted one hour later.
pub fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<Ms> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
        .map(|dt| dt.timestamp_millis())
}

/// `t` plus whole calendar days in `tz`, keeping the local time of day.
pub fn add_local_days(tz: Tz, t: Ms, days: u32) -> Ms {
    tz.timestamp_millis_opt(t)
        .single()
        .and_then(|dt| dt.checked_add_days(Days::new(u64::from(days))))
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| t.saturating_add(i64::from(days) * DAY_MS))
}

// ── Opening hours policy ─────────────────────────────────────────

/// Enabled rule for the weekday of `date`, if any.
pub fn rule_for_date(hours: &OpeningHours, date: NaiveDate) -> Option<&OpeningRule> {
    hours.rule_for(weekday_key(date)).filter(|r| r.enabled)
}

/// The `[open, close)` window on `date`, or `None` when the day is closed.
///
/// A rule with `close <= open` yields an empty span rather than `None`;
/// downstream it has zero bookable minutes.
pub fn window_for(hours: &OpeningHours, tz: Tz, date: NaiveDate) -> Option<Span> {
    let rule = rule_for_date(hours, date)?;
    let open = local_instant(tz, date, rule.open)?;
    let close = local_instant(tz, date, rule.close)?;
    Some(Span::new(open, close))
}

pub fn earliest_open(hours: &OpeningHours) -> Option<NaiveTime> {
    hours.enabled_rules().map(|r| r.open).min()
}

pub fn latest_close(hours: &OpeningHours) -> Option<NaiveTime> {
    hours.enabled_rules().map(|r| r.close).max()
}

fn fallback_time((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

/// Time-of-day range to lay out a calendar grid. Display only.
pub fn display_window(settings: Option<&Settings>) -> (NaiveTime, NaiveTime) {
    let hours = settings.map(|s| &s.opening_hours_by_day);
    let open = hours
        .and_then(earliest_open)
        .unwrap_or_else(|| fallback_time(FALLBACK_OPEN));
    let close = hours
        .and_then(latest_close)
        .unwrap_or_else(|| fallback_time(FALLBACK_CLOSE));
    (open, close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Bratislava;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc_ms(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Ms {
        chrono::Utc
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn weekday_keys_start_on_sunday() {
        assert_eq!(weekday_key(date(2026, 10, 18)), 0); // Sunday
        assert_eq!(weekday_key(date(2026, 10, 19)), 1);
        assert_eq!(weekday_key(date(2026, 10, 24)), 6);
    }

    #[test]
    fn window_for_enabled_day() {
        let hours = OpeningHours::new().with_rule(1, OpeningRule::new(hm(8, 0), hm(16, 0)));
        let w = window_for(&hours, chrono_tz::UTC, date(2026, 10, 19)).unwrap();
        assert_eq!(w, Span::new(utc_ms(2026, 10, 19, 8, 0), utc_ms(2026, 10, 19, 16, 0)));
        assert_eq!(w.duration_minutes(), 480);
    }

    #[test]
    fn window_for_disabled_or_missing_day_is_closed() {
        let hours = OpeningHours::new().with_rule(1, OpeningRule::closed(hm(8, 0), hm(16, 0)));
        assert!(window_for(&hours, chrono_tz::UTC, date(2026, 10, 19)).is_none());
        assert!(window_for(&hours, chrono_tz::UTC, date(2026, 10, 20)).is_none());
    }

    #[test]
    fn degenerate_rule_gives_empty_window() {
        let hours = OpeningHours::new().with_rule(1, OpeningRule::new(hm(16, 0), hm(8, 0)));
        let w = window_for(&hours, chrono_tz::UTC, date(2026, 10, 19)).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.duration_minutes(), 0);
    }

    #[test]
    fn window_in_local_zone() {
        // CEST is UTC+2 until the last Sunday of October.
        let hours = OpeningHours::uniform(hm(8, 0), hm(16, 0));
        let w = window_for(&hours, Bratislava, date(2026, 10, 19)).unwrap();
        assert_eq!(w.start, utc_ms(2026, 10, 19, 6, 0));
        assert_eq!(w.end, utc_ms(2026, 10, 19, 14, 0));
        // After the switch to CET (UTC+1).
        let w = window_for(&hours, Bratislava, date(2026, 10, 26)).unwrap();
        assert_eq!(w.start, utc_ms(2026, 10, 26, 7, 0));
        assert_eq!(w.end, utc_ms(2026, 10, 26, 15, 0));
    }

    #[test]
    fn fall_back_day_window_spans_extra_hour() {
        let hours = OpeningHours::uniform(hm(1, 0), hm(4, 0));
        let w = window_for(&hours, Bratislava, date(2026, 10, 25)).unwrap();
        assert_eq!(w.start, utc_ms(2026, 10, 24, 23, 0));
        assert_eq!(w.end, utc_ms(2026, 10, 25, 3, 0));
        assert_eq!(w.duration_minutes(), 240);
    }

    #[test]
    fn ambiguous_local_time_takes_earliest() {
        let t = local_instant(Bratislava, date(2026, 10, 25), hm(2, 30)).unwrap();
        assert_eq!(t, utc_ms(2026, 10, 25, 0, 30));
    }

    #[test]
    fn gap_local_time_shifts_forward() {
        // 02:30 does not exist on 2026-03-29; 03:30 CEST is 01:30 UTC.
        let t = local_instant(Bratislava, date(2026, 3, 29), hm(2, 30)).unwrap();
        assert_eq!(t, utc_ms(2026, 3, 29, 1, 30));
    }

    #[test]
    fn civil_date_uses_zone() {
        let late_utc = utc_ms(2026, 10, 19, 23, 30);
        assert_eq!(civil_date(chrono_tz::UTC, late_utc), Some(date(2026, 10, 19)));
        assert_eq!(civil_date(Bratislava, late_utc), Some(date(2026, 10, 20)));
    }

    #[test]
    fn add_local_days_keeps_wall_clock_across_dst() {
        let before = utc_ms(2026, 10, 20, 8, 0); // 10:00 CEST
        let later = add_local_days(Bratislava, before, 7);
        // 10:00 CET is 09:00 UTC: 7 days plus one hour of elapsed time.
        assert_eq!(later, utc_ms(2026, 10, 27, 9, 0));
        assert_eq!(add_local_days(chrono_tz::UTC, before, 0), before);
    }

    #[test]
    fn earliest_and_latest_among_enabled_days() {
        let hours = OpeningHours::new()
            .with_rule(1, OpeningRule::new(hm(8, 0), hm(16, 0)))
            .with_rule(2, OpeningRule::new(hm(9, 30), hm(20, 0)))
            .with_rule(3, OpeningRule::closed(hm(6, 0), hm(23, 0)));
        assert_eq!(earliest_open(&hours), Some(hm(8, 0)));
        assert_eq!(latest_close(&hours), Some(hm(20, 0)));
    }

    #[test]
    fn display_window_falls_back() {
        assert_eq!(display_window(None), (hm(7, 0), hm(21, 0)));
        let all_closed = Settings::new(
            OpeningHours::new().with_rule(0, OpeningRule::closed(hm(6, 0), hm(23, 0))),
            BookingLimits::default(),
            chrono_tz::UTC,
        );
        assert_eq!(display_window(Some(&all_closed)), (hm(7, 0), hm(21, 0)));
        let open = Settings::new(
            OpeningHours::uniform(hm(8, 0), hm(18, 0)),
            BookingLimits::default(),
            chrono_tz::UTC,
        );
        assert_eq!(display_window(Some(&open)), (hm(8, 0), hm(18, 0)));
    }
}
