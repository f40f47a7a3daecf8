use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::engine::{EngineError, now_ms};
use crate::limits::*;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::ports::{ReservationCommitter, ReservationStore};

/// All reservation rows of one workstation, sorted by `span.start`.
#[derive(Debug, Clone)]
pub struct WorkstationState {
    pub id: WorkstationId,
    pub reservations: Vec<Reservation>,
}

pub type SharedWorkstationState = Arc<RwLock<WorkstationState>>;

impl WorkstationState {
    pub fn new(id: WorkstationId) -> Self {
        Self {
            id,
            reservations: Vec::new(),
        }
    }

    /// Insert maintaining sort order by span.start.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .partition_point(|r| r.span.start <= reservation.span.start);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove(&mut self, id: Ulid) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == id)
    }

    /// Rows whose span overlaps `window`, cancelled ones included.
    /// Binary search skips everything starting at or after `window.end`.
    pub fn overlapping(&self, window: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < window.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > window.start)
    }

    /// Any active row overlapping `span` is a conflict.
    pub fn check_no_conflict(&self, span: &Span) -> Result<(), EngineError> {
        match self
            .overlapping(span)
            .find(|r| r.is_active() && r.span.overlaps(span))
        {
            Some(existing) => Err(EngineError::CommitRejected(format!(
                "Time slot conflicts with an existing reservation ({}).",
                existing.id
            ))),
            None => Ok(()),
        }
    }
}

fn check_name(label: &str, name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::CommitRejected(format!("{label} is required.")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("name too long"));
    }
    Ok(())
}

/// In-process reservation table: the authoritative side of booking.
///
/// Commits are serialized per workstation by the write lock, so the
/// conflict check and the insert happen atomically.
pub struct InMemoryStore {
    workstations: DashMap<WorkstationId, SharedWorkstationState>,
    /// Reverse lookup: reservation id → workstation
    reservation_to_workstation: DashMap<Ulid, WorkstationId>,
    notify: Arc<NotifyHub>,
}

impl InMemoryStore {
    pub fn new(notify: Arc<NotifyHub>) -> Self {
        let workstations = DashMap::new();
        for ws in WORKSTATIONS {
            workstations.insert(ws.id, Arc::new(RwLock::new(WorkstationState::new(ws.id))));
        }
        Self {
            workstations,
            reservation_to_workstation: DashMap::new(),
            notify,
        }
    }

    pub fn notify(&self) -> &Arc<NotifyHub> {
        &self.notify
    }

    fn workstation(&self, id: WorkstationId) -> SharedWorkstationState {
        match self.workstations.get(&id) {
            Some(entry) => entry.value().clone(),
            None => self
                .workstations
                .entry(id)
                .or_insert_with(|| Arc::new(RwLock::new(WorkstationState::new(id))))
                .clone(),
        }
    }

    pub async fn get(&self, id: Ulid) -> Option<Reservation> {
        let ws = self.reservation_to_workstation.get(&id).map(|e| *e.value())?;
        let state = self.workstation(ws);
        let guard = state.read().await;
        guard.reservations.iter().find(|r| r.id == id).cloned()
    }

    /// Load previously persisted rows. Active rows that would overlap an
    /// already loaded active row are skipped. Returns how many were loaded.
    pub async fn restore(&self, rows: Vec<Reservation>) -> usize {
        let mut loaded = 0;
        for row in rows {
            if row.span.is_empty() || self.reservation_to_workstation.contains_key(&row.id) {
                warn!("skipping malformed or duplicate reservation {}", row.id);
                continue;
            }
            let state = self.workstation(row.workstation_id);
            let mut guard = state.write().await;
            if row.is_active()
                && let Err(e) = guard.check_no_conflict(&row.span)
            {
                warn!("skipping reservation {}: {e}", row.id);
                continue;
            }
            self.reservation_to_workstation.insert(row.id, row.workstation_id);
            guard.insert(row);
            loaded += 1;
        }
        loaded
    }

    /// Logical removal: the row stays, flagged `CANCELLED`.
    pub async fn cancel(&self, id: Ulid) -> Result<Reservation, EngineError> {
        let ws = self
            .reservation_to_workstation
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))?;
        let state = self.workstation(ws);
        let mut guard = state.write().await;
        let row = guard.get_mut(id).ok_or(EngineError::NotFound(id))?;
        row.status = ReservationStatus::Cancelled;
        let cancelled = row.clone();
        drop(guard);

        debug!("cancelled reservation {id} on {ws}");
        self.notify.send(&ChangeNotice {
            reservation_id: id,
            workstation_id: ws,
            kind: ChangeKind::Cancelled,
        });
        Ok(cancelled)
    }

    /// Administrative physical delete.
    pub async fn delete(&self, id: Ulid) -> Result<Reservation, EngineError> {
        let ws = self
            .reservation_to_workstation
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::NotFound(id))?;
        let state = self.workstation(ws);
        let mut guard = state.write().await;
        let removed = guard.remove(id).ok_or(EngineError::NotFound(id))?;
        drop(guard);
        self.reservation_to_workstation.remove(&id);

        debug!("deleted reservation {id} on {ws}");
        self.notify.send(&ChangeNotice {
            reservation_id: id,
            workstation_id: ws,
            kind: ChangeKind::Deleted,
        });
        Ok(removed)
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn list(&self, query: ReservationQuery) -> Result<Vec<Reservation>, EngineError> {
        let targets: Vec<WorkstationId> = match query.workstation_id {
            Some(ws) => vec![ws],
            None => WORKSTATIONS.iter().map(|w| w.id).collect(),
        };
        let mut out = Vec::new();
        for ws in targets {
            let state = self.workstation(ws);
            let guard = state.read().await;
            out.extend(
                guard
                    .overlapping(&query.window)
                    .filter(|r| query.matches(r))
                    .cloned(),
            );
        }
        out.sort_by_key(|r| (r.span.start, r.id));
        Ok(out)
    }
}

#[async_trait]
impl ReservationCommitter for InMemoryStore {
    async fn commit(&self, request: NewReservation) -> Result<Ulid, EngineError> {
        check_name("First name", &request.first_name)?;
        check_name("Last name", &request.last_name)?;
        if request.span.is_empty() {
            return Err(EngineError::CommitRejected(
                "End time must be after start time.".into(),
            ));
        }

        let state = self.workstation(request.workstation_id);
        let mut guard = state.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_WORKSTATION {
            return Err(EngineError::LimitExceeded("too many reservations on workstation"));
        }
        guard.check_no_conflict(&request.span)?;

        let id = Ulid::new();
        let ws = request.workstation_id;
        guard.insert(Reservation {
            id,
            workstation_id: ws,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            span: request.span,
            created_at: now_ms(),
            status: ReservationStatus::Active,
        });
        self.reservation_to_workstation.insert(id, ws);
        drop(guard);

        debug!("committed reservation {id} on {ws}");
        self.notify.send(&ChangeNotice {
            reservation_id: id,
            workstation_id: ws,
            kind: ChangeKind::Created,
        });
        Ok(id)
    }
}
