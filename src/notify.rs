use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{ChangeNotice, WorkstationId};
use crate::ports::ChangeNotifier;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for reservation change notices.
///
/// Every notice goes to the workstation's channel and to the firehose
/// channel that dashboard-wide subscribers listen on.
pub struct NotifyHub {
    channels: DashMap<WorkstationId, broadcast::Sender<ChangeNotice>>,
    all: broadcast::Sender<ChangeNotice>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            all: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, notice: &ChangeNotice) {
        if let Some(sender) = self.channels.get(&notice.workstation_id) {
            let _ = sender.send(notice.clone());
        }
        let _ = self.all.send(notice.clone());
    }
}

impl ChangeNotifier for NotifyHub {
    /// Subscribe to notices. Creates the per-workstation channel if needed.
    fn subscribe(&self, workstation_id: Option<WorkstationId>) -> broadcast::Receiver<ChangeNotice> {
        match workstation_id {
            None => self.all.subscribe(),
            Some(ws) => self
                .channels
                .entry(ws)
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe(),
        }
    }
}
