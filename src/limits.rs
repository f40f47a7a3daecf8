use std::time::Duration;

use crate::model::{DAY_MS, Ms};

/// Display window used when no enabled day (or no settings at all) is available.
pub const FALLBACK_OPEN: (u32, u32) = (7, 0);
pub const FALLBACK_CLOSE: (u32, u32) = (21, 0);

/// Dashboard fetch window relative to now: `[now - LOOKBACK, now + LOOKAHEAD)`.
pub const DASHBOARD_LOOKBACK_MS: Ms = DAY_MS;
pub const DASHBOARD_LOOKAHEAD_MS: Ms = 14 * DAY_MS;

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(45);

pub const MAX_NAME_LEN: usize = 128;

/// Widest range a calendar view may load or classify in one go.
pub const MAX_QUERY_WINDOW_MS: Ms = 366 * DAY_MS;

/// Reservations per workstation held by the in-memory store.
pub const MAX_RESERVATIONS_PER_WORKSTATION: usize = 100_000;
