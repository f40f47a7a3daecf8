use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use workslot::config::{FileConfigProvider, resolve_settings};
use workslot::dashboard::Dashboard;
use workslot::limits::DEFAULT_REFRESH_PERIOD;
use workslot::model::{Reservation, WORKSTATIONS};
use workslot::notify::NotifyHub;
use workslot::ports::ChangeNotifier;
use workslot::store::InMemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("WORKSLOT_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    workslot::observability::init(metrics_port)?;

    let settings_path =
        std::env::var("WORKSLOT_SETTINGS").unwrap_or_else(|_| "./settings.json".into());
    let seed_path = std::env::var("WORKSLOT_RESERVATIONS").ok();
    let refresh_period = std::env::var("WORKSLOT_REFRESH_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REFRESH_PERIOD);

    let settings = resolve_settings(&FileConfigProvider::new(&settings_path)).await;

    let hub = Arc::new(NotifyHub::new());
    let store = Arc::new(InMemoryStore::new(hub.clone()));
    if let Some(path) = &seed_path {
        let raw = tokio::fs::read_to_string(path).await?;
        let rows: Vec<Reservation> = serde_json::from_str(&raw)?;
        let total = rows.len();
        let loaded = store.restore(rows).await;
        info!("seeded {loaded}/{total} reservations from {path}");
    }

    info!("workslot started");
    info!("  settings: {settings_path} ({})", if settings.is_some() { "loaded" } else { "fallback" });
    info!("  refresh: every {}s", refresh_period.as_secs());
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let dashboard = Arc::new(Dashboard::new(store.clone(), settings));
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let refresher = tokio::spawn(dashboard.clone().run(
        hub.subscribe(None),
        refresh_period,
        async move {
            let _ = stop_rx.changed().await;
        },
    ));

    // Print the board whenever it changes.
    let printer = {
        let dashboard = dashboard.clone();
        let mut stop_rx = stop_tx.subscribe();
        tokio::spawn(async move {
            let mut shown = 0;
            let mut last_error = None;
            let mut poll = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = poll.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                let view = dashboard.view().await;
                if view.error != last_error {
                    if let Some(error) = &view.error {
                        tracing::warn!("dashboard: {error}");
                    }
                    last_error = view.error.clone();
                }
                if view.generation == shown {
                    continue;
                }
                shown = view.generation;
                for ws in &WORKSTATIONS {
                    let Some(card) = view.cards.get(&ws.id) else { continue };
                    let now = card
                        .current
                        .as_ref()
                        .map_or("available".to_string(), |r| format!("reserved by {}", r.holder()));
                    let next = card.next.as_ref().map_or("-".to_string(), |r| r.holder());
                    info!("{:<16} {now:<32} next: {next:<24} today: {}", ws.name, card.day.as_str());
                }
            }
        })
    };

    // Graceful shutdown on SIGTERM/ctrl-c
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("shutdown signal received, stopping refresh loop");
    let _ = stop_tx.send(true);
    let _ = refresher.await;
    let _ = printer.await;

    info!("workslot stopped");
    Ok(())
}
