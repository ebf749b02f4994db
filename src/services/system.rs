//! CPU load and memory usage via sysinfo.

use super::{Stat, StatStyle, progress_bar};
use crate::config::Theme;
use sysinfo::System;

/// Memory pressure as used/total percent, rendered as a progress bar.
pub fn collect_ram(theme: &Theme, sys: &mut System) -> Option<Stat> {
    sys.refresh_memory();

    let total = sys.total_memory();
    if total == 0 {
        return None;
    }
    let ram = (sys.used_memory() * 100 / total) as i32;

    Some(Stat::new(
        theme,
        StatStyle::Default,
        theme.icon("ram"),
        progress_bar(theme, ram),
    ))
}

/// One-minute load average normalized by core count, as a percent.
pub fn collect_cpu(theme: &Theme, cores: usize) -> Option<Stat> {
    let load = System::load_average().one;
    if load < 0.0 {
        // Unsupported platform sentinel.
        return None;
    }
    let cpu = (load * 100.0 / cores.max(1) as f64) as i32;

    Some(Stat::new(
        theme,
        StatStyle::Default,
        theme.icon("cpu"),
        progress_bar(theme, cpu),
    ))
}
