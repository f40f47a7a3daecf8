use std::collections::BTreeMap;

use crate::model::*;

use super::hours::civil_date;
use super::occupancy::classify_date;

/// What is happening on a workstation at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub current: Option<Reservation>,
    pub next: Option<Reservation>,
}

/// `current`: earliest-starting active reservation with `start <= now < end`.
/// `next`: earliest active reservation with `start > now`.
///
/// Linear scan; input order does not matter. Ties on start break on id.
pub fn snapshot(now: Ms, reservations: &[Reservation]) -> Snapshot {
    let active = || reservations.iter().filter(|r| r.is_active());
    let current = active()
        .filter(|r| r.span.contains_instant(now))
        .min_by_key(|r| (r.span.start, r.id))
        .cloned();
    let next = active()
        .filter(|r| r.span.start > now)
        .min_by_key(|r| (r.span.start, r.id))
        .cloned();
    Snapshot { current, next }
}

/// Dashboard card for one workstation. `reservations` may contain rows for
/// other workstations; they are skipped. Without settings the day reads `Free`.
pub fn card_state(
    settings: Option<&Settings>,
    workstation_id: WorkstationId,
    now: Ms,
    reservations: &[Reservation],
) -> CardState {
    let own: Vec<Reservation> = reservations
        .iter()
        .filter(|r| r.workstation_id == workstation_id)
        .cloned()
        .collect();
    let Snapshot { current, next } = snapshot(now, &own);
    let day = settings
        .and_then(|s| civil_date(s.timezone, now).map(|today| classify_date(s, today, &own)))
        .unwrap_or_default();
    CardState { current, next, day }
}

pub fn card_states(
    settings: Option<&Settings>,
    now: Ms,
    reservations: &[Reservation],
) -> BTreeMap<WorkstationId, CardState> {
    WORKSTATIONS
        .iter()
        .map(|ws| (ws.id, card_state(settings, ws.id, now, reservations)))
        .collect()
}
