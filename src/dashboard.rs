use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::engine::{EngineError, card_states, now_ms};
use crate::limits::*;
use crate::model::*;
use crate::ports::ReservationStore;

/// Hands out refresh sequence numbers. A result is applied only when no
/// later-started refresh has been applied already.
#[derive(Debug, Default)]
pub(crate) struct Generations {
    next: AtomicU64,
}

impl Generations {
    pub(crate) fn begin(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub cards: BTreeMap<WorkstationId, CardState>,
    /// Transient, dismissible notice from the last failed fetch.
    pub error: Option<String>,
    /// Reference instant the cards were derived at.
    pub refreshed_at: Option<Ms>,
    pub generation: u64,
    /// Refresh that raised `error`; only a refresh at least this new clears it.
    error_generation: u64,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            cards: WORKSTATIONS
                .iter()
                .map(|ws| (ws.id, CardState::default()))
                .collect(),
            error: None,
            refreshed_at: None,
            generation: 0,
            error_generation: 0,
        }
    }
}

/// `[now - 1 day, now + 14 days)`.
pub fn fetch_window(now: Ms) -> Span {
    Span::new(
        now.saturating_sub(DASHBOARD_LOOKBACK_MS),
        now.saturating_add(DASHBOARD_LOOKAHEAD_MS),
    )
}

/// At-a-glance status for every workstation.
pub struct Dashboard<S> {
    store: Arc<S>,
    settings: Option<Settings>,
    view: RwLock<DashboardView>,
    generations: Generations,
}

impl<S: ReservationStore + 'static> Dashboard<S> {
    pub fn new(store: Arc<S>, settings: Option<Settings>) -> Self {
        Self {
            store,
            settings,
            view: RwLock::new(DashboardView::default()),
            generations: Generations::default(),
        }
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub async fn view(&self) -> DashboardView {
        self.view.read().await.clone()
    }

    pub async fn dismiss_error(&self) {
        self.view.write().await.error = None;
    }

    /// Fetch active rows around `now` and rederive every card.
    ///
    /// Returns `Ok(false)` when the result was discarded as stale. On fetch
    /// failure the previous cards stay and the error notice is set.
    pub async fn refresh_at(&self, now: Ms) -> Result<bool, EngineError> {
        let generation = self.generations.begin();
        let started = Instant::now();
        metrics::counter!(crate::observability::REFRESHES_TOTAL, "view" => "dashboard").increment(1);

        let rows = match self.store.list(ReservationQuery::active(fetch_window(now))).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("dashboard refresh {generation} failed: {e}");
                metrics::counter!(crate::observability::REFRESH_FAILURES_TOTAL, "view" => "dashboard")
                    .increment(1);
                let mut view = self.view.write().await;
                if generation > view.generation && generation > view.error_generation {
                    view.error = Some(e.to_string());
                    view.error_generation = generation;
                }
                return Err(e);
            }
        };

        let cards = card_states(self.settings.as_ref(), now, &rows);

        let mut view = self.view.write().await;
        if generation < view.generation {
            debug!("discarding stale dashboard refresh {generation} (have {})", view.generation);
            metrics::counter!(crate::observability::STALE_REFRESHES_TOTAL).increment(1);
            return Ok(false);
        }
        view.cards = cards;
        if generation >= view.error_generation {
            view.error = None;
        }
        view.refreshed_at = Some(now);
        view.generation = generation;
        drop(view);

        metrics::histogram!(crate::observability::REFRESH_DURATION_SECONDS, "view" => "dashboard")
            .record(started.elapsed().as_secs_f64());
        Ok(true)
    }

    /// Refresh on every tick of `period` and on every change notice until
    /// `shutdown` resolves. Each refresh runs as its own task; overlapping
    /// refreshes are settled by generation.
    pub async fn run(
        self: Arc<Self>,
        mut changes: broadcast::Receiver<ChangeNotice>,
        period: Duration,
        shutdown: impl Future<Output = ()>,
    ) {
        let mut ticker = tokio::time::interval(period);
        let mut feed_open = true;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                msg = changes.recv(), if feed_open => match msg {
                    Ok(notice) => debug!("change on {}: {:?}", notice.workstation_id, notice.kind),
                    Err(RecvError::Lagged(missed)) => debug!("change feed lagged by {missed}"),
                    Err(RecvError::Closed) => {
                        info!("change feed closed, falling back to periodic refresh");
                        feed_open = false;
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    info!("dashboard refresh loop stopped");
                    break;
                }
            }

            let this = self.clone();
            tokio::spawn(async move {
                // Failures are already logged and surfaced in the view.
                let _ = this.refresh_at(now_ms()).await;
            });
        }
    }
}
