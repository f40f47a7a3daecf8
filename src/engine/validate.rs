use std::fmt;

use chrono::NaiveTime;

use crate::model::*;

use super::hours::{add_local_days, civil_date, local_instant, rule_for_date};

/// Why a proposed slot was turned down before reaching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooShort { min_minutes: i64 },
    TooLong { max_minutes: i64 },
    BeyondHorizon { horizon_days: u32 },
    DayClosed,
    OutsideOpeningHours { open: NaiveTime, close: NaiveTime },
}

impl Rejection {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::TooShort { .. } => "too_short",
            Rejection::TooLong { .. } => "too_long",
            Rejection::BeyondHorizon { .. } => "beyond_horizon",
            Rejection::DayClosed => "day_closed",
            Rejection::OutsideOpeningHours { .. } => "outside_opening_hours",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooShort { min_minutes } => {
                write!(f, "Minimum reservation is {min_minutes} minutes.")
            }
            Rejection::TooLong { max_minutes } => {
                write!(f, "Maximum reservation is {max_minutes} minutes.")
            }
            Rejection::BeyondHorizon { horizon_days } => {
                write!(f, "Bookings are limited to {horizon_days} days in advance.")
            }
            Rejection::DayClosed => write!(f, "This day is closed."),
            Rejection::OutsideOpeningHours { open, close } => write!(
                f,
                "Reservations must be within opening hours ({}-{}).",
                open.format("%H:%M"),
                close.format("%H:%M")
            ),
        }
    }
}

/// Client-side admissibility check. First failing check wins:
/// duration bounds, booking horizon, closed weekday, opening hours.
///
/// Never looks at other reservations; double-booking is the store's call.
pub fn validate(proposal: &Span, settings: &Settings, now: Ms) -> Result<(), Rejection> {
    let limits = &settings.limits;
    let tz = settings.timezone;

    let minutes = duration_minutes(proposal.start, proposal.end);
    if minutes < limits.min_slot_minutes {
        return Err(Rejection::TooShort {
            min_minutes: limits.min_slot_minutes,
        });
    }
    if minutes > limits.max_slot_minutes {
        return Err(Rejection::TooLong {
            max_minutes: limits.max_slot_minutes,
        });
    }

    let horizon = add_local_days(tz, now, limits.booking_horizon_days);
    if proposal.start > horizon {
        return Err(Rejection::BeyondHorizon {
            horizon_days: limits.booking_horizon_days,
        });
    }

    let Some(date) = civil_date(tz, proposal.start) else {
        return Err(Rejection::DayClosed);
    };
    let Some(rule) = rule_for_date(&settings.opening_hours_by_day, date) else {
        return Err(Rejection::DayClosed);
    };

    let outside = Rejection::OutsideOpeningHours {
        open: rule.open,
        close: rule.close,
    };
    let (Some(open), Some(close)) = (
        local_instant(tz, date, rule.open),
        local_instant(tz, date, rule.close),
    ) else {
        return Err(outside);
    };
    if proposal.start < open || proposal.end > close {
        return Err(outside);
    }

    Ok(())
}
