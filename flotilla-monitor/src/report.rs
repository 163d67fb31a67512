use std::time::Duration;

use flotilla_sync::FleetView;
use jiff::SignedDuration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Log a fleet summary every `every` until cancelled.
pub async fn run_report(
    view: FleetView,
    every: Duration,
    stale_after: SignedDuration,
    cancel: CancellationToken,
) {
    info!(interval_secs = every.as_secs(), "Fleet report started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick is immediate, nothing to report yet
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Fleet report shutting down");
                break;
            }
            _ = interval.tick() => report(&view, stale_after),
        }
    }
}

fn report(view: &FleetView, stale_after: SignedDuration) {
    let connection = view.connection();
    let stats = view.stats();
    let counters = view.counters();

    info!(
        connection = %connection.state,
        total = stats.total,
        active = stats.active,
        inactive = stats.inactive,
        allowed = stats.allowed,
        restricted = stats.restricted,
        drone_updates = counters.drone_updates,
        path_updates = counters.path_updates,
        malformed = counters.malformed,
        last_sync = ?view.last_message_at(),
        "Fleet report"
    );

    let stale = view.stale(stale_after);
    if !stale.is_empty() {
        let ids: Vec<&str> = stale.iter().map(|d| d.id.as_str()).collect();
        warn!(count = stale.len(), ?ids, "Drones have gone quiet");
    }
}
