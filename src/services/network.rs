//! Network throughput (rx/tx) from the interface counters.
//!
//! Deltas are computed against the previous tick. Each side refreshes on
//! its own randomized 1-2 tick cadence, carried over from the original
//! setup so the two numbers do not flicker in lockstep.

use super::{Stat, StatStyle};
use crate::config::Theme;
use crate::functions::formatting::format_bytes;
use chrono::Utc;
use log::warn;
use sysinfo::Networks;

/// Counter state between ticks.
#[derive(Default)]
pub struct NetState {
    rx_old: u64,
    tx_old: u64,
    rx_update_ticks: i32,
    tx_update_ticks: i32,
}

/// Check that the configured interface exists.
pub fn is_valid_device(networks: &Networks, interface: &str) -> bool {
    if networks.iter().any(|(name, _)| name.as_str() == interface) {
        return true;
    }
    warn!(
        "Network device '{}' is not valid; please recheck the config file",
        interface
    );
    false
}

/// Collect rx/tx throughput for one tick. A side whose cadence has not
/// elapsed yet produces no update and keeps its previous stat.
pub fn collect(
    theme: &Theme,
    networks: &mut Networks,
    state: &mut NetState,
    interface: &str,
) -> (Option<Stat>, Option<Stat>) {
    networks.refresh_list();

    let Some((_, data)) = networks.iter().find(|(name, _)| name.as_str() == interface) else {
        return (None, None);
    };

    let rx_now = data.total_received();
    let tx_now = data.total_transmitted();
    let rx_delta = rx_now.saturating_sub(state.rx_old);
    let tx_delta = tx_now.saturating_sub(state.tx_old);
    state.rx_old = rx_now;
    state.tx_old = tx_now;

    let mut rx = None;
    let mut tx = None;

    state.rx_update_ticks -= 1;
    if state.rx_update_ticks <= 0 {
        rx = Some(Stat::new(
            theme,
            StatStyle::Default,
            theme.icon("rx"),
            format_bytes(rx_delta),
        ));
        state.rx_update_ticks = jitter_ticks();
    }

    state.tx_update_ticks -= 1;
    if state.tx_update_ticks <= 0 {
        tx = Some(Stat::new(
            theme,
            StatStyle::Default,
            theme.icon("tx"),
            format_bytes(tx_delta),
        ));
        state.tx_update_ticks = jitter_ticks();
    }

    (rx, tx)
}

/// 1 or 2 ticks, from the clock's sub-second noise.
fn jitter_ticks() -> i32 {
    (Utc::now().timestamp_subsec_nanos() & 1) as i32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_ticks_in_range() {
        for _ in 0..32 {
            let t = jitter_ticks();
            assert!(t == 1 || t == 2);
        }
    }
}
