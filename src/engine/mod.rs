//! Scheduling math: opening-hours windows, day occupancy, "now / next"
//! snapshots and client-side admissibility checks.
//!
//! Everything here is a synchronous pure function of (settings, reservation
//! rows, reference instant). I/O, refresh scheduling and the authoritative
//! conflict check live in `dashboard`, `calendar` and `store`.

mod error;
mod hours;
mod occupancy;
mod snapshot;
mod validate;
#[cfg(test)]
mod tests;

pub use error::EngineError;
pub use hours::{
    add_local_days, civil_date, display_window, earliest_open, latest_close, local_instant,
    rule_for_date, weekday_key, window_for,
};
pub use occupancy::{classify_date, classify_day, occupancy_by_date, reserved_minutes};
pub use snapshot::{Snapshot, card_state, card_states, snapshot};
pub use validate::{Rejection, validate};

use crate::model::Ms;

/// Wall clock as unix ms. A clock before the epoch reads as 0.
pub fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or_default()
}
