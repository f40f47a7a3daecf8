use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::dashboard::Generations;
use crate::engine::{EngineError, display_window, occupancy_by_date, validate};
use crate::limits::*;
use crate::model::*;
use crate::ports::{ReservationCommitter, ReservationStore};

/// Loaded state of one workstation's calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarView {
    /// Range the rows below were fetched for.
    pub range: Option<Span>,
    pub reservations: Vec<Reservation>,
    /// Empty when settings are unavailable.
    pub occupancy: BTreeMap<NaiveDate, DayOccupancy>,
    pub error: Option<String>,
    pub generation: u64,
    /// Reload that raised `error`; only a reload at least this new clears it.
    error_generation: u64,
}

/// Detailed calendar for a single workstation: loads the visible range,
/// labels its days and submits booking proposals.
pub struct WorkstationCalendar<S> {
    workstation: &'static Workstation,
    store: Arc<S>,
    settings: Option<Settings>,
    range: RwLock<Span>,
    view: RwLock<CalendarView>,
    generations: Generations,
}

fn check_range(range: &Span) -> Result<(), EngineError> {
    if range.duration_ms() > MAX_QUERY_WINDOW_MS {
        return Err(EngineError::LimitExceeded("visible range longer than a year"));
    }
    Ok(())
}

impl<S> WorkstationCalendar<S>
where
    S: ReservationStore + ReservationCommitter + 'static,
{
    pub fn new(
        workstation_id: WorkstationId,
        store: Arc<S>,
        settings: Option<Settings>,
        range: Span,
    ) -> Result<Self, EngineError> {
        check_range(&range)?;
        Ok(Self {
            workstation: workstation(workstation_id),
            store,
            settings,
            range: RwLock::new(range),
            view: RwLock::new(CalendarView::default()),
            generations: Generations::default(),
        })
    }

    pub fn workstation(&self) -> &'static Workstation {
        self.workstation
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Hour span the calendar grid shows.
    pub fn display_window(&self) -> (NaiveTime, NaiveTime) {
        display_window(self.settings.as_ref())
    }

    pub async fn view(&self) -> CalendarView {
        self.view.read().await.clone()
    }

    pub async fn dismiss_error(&self) {
        self.view.write().await.error = None;
    }

    /// Move the visible range and reload it.
    pub async fn set_range(&self, range: Span) -> Result<bool, EngineError> {
        check_range(&range)?;
        *self.range.write().await = range;
        self.reload().await
    }

    /// Fetch active rows for the current range and relabel its days.
    ///
    /// Returns `Ok(false)` when a newer reload was applied first.
    pub async fn reload(&self) -> Result<bool, EngineError> {
        let generation = self.generations.begin();
        let range = *self.range.read().await;
        let started = Instant::now();
        metrics::counter!(crate::observability::REFRESHES_TOTAL, "view" => "calendar").increment(1);

        let query = ReservationQuery::for_workstation(self.workstation.id, range);
        let rows = match self.store.list(query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{} calendar reload failed: {e}", self.workstation.id);
                metrics::counter!(crate::observability::REFRESH_FAILURES_TOTAL, "view" => "calendar")
                    .increment(1);
                let mut view = self.view.write().await;
                if generation > view.generation && generation > view.error_generation {
                    view.error = Some(e.to_string());
                    view.error_generation = generation;
                }
                return Err(e);
            }
        };

        let occupancy = match &self.settings {
            Some(settings) => occupancy_by_date(settings, &rows, &range),
            None => BTreeMap::new(),
        };

        let mut view = self.view.write().await;
        if generation < view.generation {
            debug!("discarding stale {} calendar reload {generation}", self.workstation.id);
            metrics::counter!(crate::observability::STALE_REFRESHES_TOTAL).increment(1);
            return Ok(false);
        }
        view.range = Some(range);
        view.reservations = rows;
        view.occupancy = occupancy;
        if generation >= view.error_generation {
            view.error = None;
        }
        view.generation = generation;
        drop(view);

        metrics::histogram!(crate::observability::REFRESH_DURATION_SECONDS, "view" => "calendar")
            .record(started.elapsed().as_secs_f64());
        Ok(true)
    }

    /// Details of a loaded reservation.
    pub async fn details(&self, id: Ulid) -> Result<Reservation, EngineError> {
        self.view
            .read()
            .await
            .reservations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// Validate a proposal locally, then hand it to the committer.
    ///
    /// A local rejection never reaches the committer. A committer refusal is
    /// surfaced verbatim. On success the range is reloaded.
    pub async fn submit(
        &self,
        proposal: Span,
        first_name: &str,
        last_name: &str,
        now: Ms,
    ) -> Result<Ulid, EngineError> {
        if let Some(settings) = &self.settings
            && let Err(reason) = validate(&proposal, settings, now)
        {
            debug!("{} proposal rejected locally: {reason}", self.workstation.id);
            metrics::counter!(crate::observability::VALIDATION_REJECTIONS_TOTAL, "reason" => reason.label())
                .increment(1);
            return Err(reason.into());
        }

        let request = NewReservation {
            workstation_id: self.workstation.id,
            span: proposal,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        let id = match self.store.commit(request).await {
            Ok(id) => id,
            Err(e) => {
                warn!("{} commit refused: {e}", self.workstation.id);
                metrics::counter!(crate::observability::COMMITS_TOTAL, "status" => e.label()).increment(1);
                return Err(e);
            }
        };
        metrics::counter!(crate::observability::COMMITS_TOTAL, "status" => "ok").increment(1);
        info!("{} reservation {id} created", self.workstation.id);

        // The commit stands even if the follow-up reload fails.
        let _ = self.reload().await;
        Ok(id)
    }

    /// Reload on every change notice for this workstation until `shutdown`
    /// resolves.
    pub async fn run(
        self: Arc<Self>,
        mut changes: broadcast::Receiver<ChangeNotice>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                msg = changes.recv() => match msg {
                    Ok(notice) if notice.workstation_id != self.workstation.id => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => debug!("change feed lagged by {missed}"),
                    Err(RecvError::Closed) => {
                        info!("{} change feed closed", self.workstation.id);
                        break;
                    }
                },
                _ = &mut shutdown => break,
            }
            let this = self.clone();
            tokio::spawn(async move {
                let _ = this.reload().await;
            });
        }
    }
}
