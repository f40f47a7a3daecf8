use std::net::SocketAddr;

// ── Refresh metrics ─────────────────────────────────────────────

/// Counter: dashboard/calendar refreshes attempted. Labels: view.
pub const REFRESHES_TOTAL: &str = "workslot_refreshes_total";

/// Counter: refreshes whose fetch failed. Labels: view.
pub const REFRESH_FAILURES_TOTAL: &str = "workslot_refresh_failures_total";

/// Counter: refresh results dropped because a newer one was already applied.
pub const STALE_REFRESHES_TOTAL: &str = "workslot_stale_refreshes_total";

/// Histogram: refresh latency (fetch + derive) in seconds. Labels: view.
pub const REFRESH_DURATION_SECONDS: &str = "workslot_refresh_duration_seconds";

// ── Booking metrics ─────────────────────────────────────────────

/// Counter: proposals blocked locally. Labels: reason.
pub const VALIDATION_REJECTIONS_TOTAL: &str = "workslot_validation_rejections_total";

/// Counter: commit attempts. Labels: status.
pub const COMMITS_TOTAL: &str = "workslot_commits_total";

/// Counter: settings loads that fell back to defaults.
pub const CONFIG_FALLBACKS_TOTAL: &str = "workslot_config_fallbacks_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
