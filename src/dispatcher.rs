//! Top-level event sources: the wall-clock-aligned ticker and the
//! reload/refresh signals.

use crate::app::App;
use chrono::Local;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::sleep;

/// Run the 1-second status ticker. Each cycle collects stats, pushes
/// content and resizes the floating bar, then sleeps until the next
/// whole second so the clock never drifts.
pub async fn run_ticker(app: Arc<App>) {
    loop {
        app.tick().await;
        sleep_until_next_second().await;
    }
}

/// Handle SIGHUP (full config + theme reload) and SIGUSR1 (cheap
/// volume/brightness refresh).
pub async fn run_signals(app: Arc<App>) -> std::io::Result<()> {
    let mut reload = signal(SignalKind::hangup())?;
    let mut refresh = signal(SignalKind::user_defined1())?;

    loop {
        tokio::select! {
            _ = reload.recv() => app.reload().await,
            _ = refresh.recv() => {
                info!("refresh signal received");
                app.refresh_volatile().await;
            }
        }
    }
}

/// Sleep for the time remaining until the next wall-clock second
/// boundary, not a fixed interval.
async fn sleep_until_next_second() {
    let nanos = Local::now().timestamp_subsec_nanos() as u64;
    let remaining = 1_000_000_000u64.saturating_sub(nanos).max(1);
    sleep(Duration::from_nanos(remaining)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_sleep_lands_near_second_boundary() {
        let start = Instant::now();
        sleep_until_next_second().await;

        assert!(start.elapsed() <= Duration::from_millis(1100));
        // Generous tolerance for scheduler latency.
        assert!(Local::now().timestamp_subsec_nanos() < 250_000_000);
    }
}
