//! Collaborators the scheduling core reads from or hands off to.
//!
//! None of these are implemented by the pure engine. `store::InMemoryStore`,
//! `notify::NotifyHub` and `config::FileConfigProvider` are the in-process
//! implementations used by the binary and tests.

use async_trait::async_trait;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::*;

/// Source of the global booking policy. Failure means `ConfigUnavailable`.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    async fn load_settings(&self) -> Result<Settings, EngineError>;
}

/// Read side of the reservation table.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Rows overlapping `query.window` (half-open), ordered by start ascending.
    async fn list(&self, query: ReservationQuery) -> Result<Vec<Reservation>, EngineError>;
}

/// Authoritative create. This is where double-booking is refused.
#[async_trait]
pub trait ReservationCommitter: Send + Sync {
    async fn commit(&self, request: NewReservation) -> Result<Ulid, EngineError>;
}

/// Out-of-band "data may have changed" signal.
pub trait ChangeNotifier: Send + Sync {
    /// `None` subscribes to every workstation.
    fn subscribe(&self, workstation_id: Option<WorkstationId>) -> broadcast::Receiver<ChangeNotice>;
}
