//! Stat collection services.
//!
//! Each collector produces a [`Stat`] for one metric key, or `None` when
//! the metric is unavailable this cycle. Absent keys are simply omitted
//! from rendering; a structural failure (missing sysfs path, invalid
//! device) keeps the key absent until the next reload.
//!
//! Collection runs outside the core lock: the [`Collector`] builds a list
//! of updates from a cloned [`Theme`], and the bar manager applies them
//! to its snapshot under the lock.

pub mod battery;
pub mod brightness;
pub mod network;
pub mod system;
pub mod volume;

use crate::config::Theme;
use chrono::Local;
use log::info;
use std::collections::HashMap;
use sysinfo::{Networks, System};

/// Display order of the status bar, left to right.
pub const KEYS: [&str; 8] = [
    "clock",
    "rx",
    "tx",
    "volume",
    "battery",
    "brightness",
    "cpu",
    "ram",
];

/// How a stat is rendered: regular key/value coloring, or the urgent
/// color for states that should stand out (muted sink, low battery).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatStyle {
    Default,
    Urgent,
}

/// One collected metric, ready for the formatter.
#[derive(Clone, Debug)]
pub struct Stat {
    pub icon: String,
    pub value: String,
    pub style: StatStyle,
    pub formatted: String,
    /// Character length used by the floating-bar width heuristic.
    pub length: i32,
}

impl Stat {
    pub fn new(theme: &Theme, style: StatStyle, icon: String, value: String) -> Self {
        let formatted = render(theme, style, &icon, &value);
        let length = value.chars().count() as i32 + 2;
        Stat {
            icon,
            value,
            style,
            formatted,
            length,
        }
    }
}

/// The most recently collected set of stats, keyed by metric name.
pub type Snapshot = HashMap<&'static str, Stat>;

/// A batch of snapshot changes: `Some` replaces the stat, `None` drops it.
pub type StatUpdates = Vec<(&'static str, Option<Stat>)>;

/// Apply a batch of collector updates to a snapshot.
pub fn apply_updates(snapshot: &mut Snapshot, updates: StatUpdates) {
    for (key, update) in updates {
        match update {
            Some(stat) => {
                snapshot.insert(key, stat);
            }
            None => {
                snapshot.remove(key);
            }
        }
    }
}

/// Render a stat with the theme's dzen color escapes.
fn render(theme: &Theme, style: StatStyle, icon: &str, value: &str) -> String {
    let colors = &theme.colors;
    match style {
        StatStyle::Default => format!(
            "^fg({}){} ^fg({}){}",
            colors.key, icon, colors.value, value
        ),
        StatStyle::Urgent => format!("^fg({}){} {}", colors.urgent, icon, value),
    }
}

/// Re-render every present stat with the current theme, preserving the
/// collected values. Used after a theme reload.
pub fn update_formatting(snapshot: &mut Snapshot, theme: &Theme) {
    for key in KEYS {
        if let Some(stat) = snapshot.get(key) {
            let stat = Stat::new(theme, stat.style, stat.icon.clone(), stat.value.clone());
            snapshot.insert(key, stat);
        }
    }
}

/// Draw a three-icon progress bar from the configured glyph set.
pub fn progress_bar(theme: &Theme, value: i32) -> String {
    let (left, middle, right) = match value {
        v if v < 10 => ("bar-left-0", "bar-middle-0", "bar-right-0"),
        v if v < 20 => ("bar-left-1", "bar-middle-0", "bar-right-0"),
        v if v < 30 => ("bar-left-2", "bar-middle-0", "bar-right-0"),
        v if v < 40 => ("bar-left-3", "bar-middle-0", "bar-right-0"),
        v if v < 50 => ("bar-left-3", "bar-middle-1", "bar-right-0"),
        v if v < 60 => ("bar-left-3", "bar-middle-2", "bar-right-0"),
        v if v < 70 => ("bar-left-3", "bar-middle-3", "bar-right-0"),
        v if v < 80 => ("bar-left-3", "bar-middle-4", "bar-right-0"),
        v if v < 90 => ("bar-left-3", "bar-middle-4", "bar-right-1"),
        v if v < 100 => ("bar-left-3", "bar-middle-4", "bar-right-2"),
        _ => ("bar-left-3", "bar-middle-4", "bar-right-3"),
    };
    format!(
        "{}{}{}",
        theme.icon(left),
        theme.icon(middle),
        theme.icon(right)
    )
}

/// Collect the wall clock, HH:MM:SS.
fn collect_clock(theme: &Theme) -> Option<Stat> {
    let now = Local::now().format("%H:%M:%S").to_string();
    Some(Stat::new(theme, StatStyle::Default, theme.icon("clock"), now))
}

/// Owns the sysinfo handles and the per-device validity flags.
/// Lives behind its own lock; only the collection tasks touch it.
pub struct Collector {
    sys: System,
    networks: Networks,
    net: network::NetState,
    sound_device: String,
    network_interface: String,
    valid_sound: bool,
    valid_net: bool,
    cores: usize,
}

impl Collector {
    pub fn new(sound_device: &str, network_interface: &str) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        let cores = sys.cpus().len().max(1);

        let mut collector = Collector {
            sys,
            networks: Networks::new_with_refreshed_list(),
            net: network::NetState::default(),
            sound_device: sound_device.to_string(),
            network_interface: network_interface.to_string(),
            valid_sound: false,
            valid_net: false,
            cores,
        };
        collector.revalidate_devices();
        collector
    }

    /// Re-check the configured devices. Called at startup and on reload;
    /// an invalid device keeps its keys out of the snapshot until the
    /// next reload.
    pub fn revalidate_devices(&mut self) {
        self.valid_net = network::is_valid_device(&self.networks, &self.network_interface);
        self.valid_sound = volume::is_valid_device(&self.sound_device);
    }

    /// Point the collector at possibly-new devices after a config reload.
    pub fn reconfigure(&mut self, sound_device: &str, network_interface: &str) {
        self.sound_device = sound_device.to_string();
        self.network_interface = network_interface.to_string();
        self.revalidate_devices();
        info!(
            "collector reconfigured: sound device '{}', network interface '{}'",
            self.sound_device, self.network_interface
        );
    }

    /// Collect every metric. Invalid devices contribute no update at all
    /// so their keys stay in whatever state validation left them.
    pub async fn collect_all(&mut self, theme: &Theme) -> StatUpdates {
        let mut updates = StatUpdates::new();

        if self.valid_sound {
            updates.push(("volume", volume::collect(theme, &self.sound_device).await));
        } else {
            updates.push(("volume", None));
        }

        updates.push(("clock", collect_clock(theme)));
        updates.push(("ram", system::collect_ram(theme, &mut self.sys)));
        updates.push(("cpu", system::collect_cpu(theme, self.cores)));

        if self.valid_net {
            let (rx, tx) = network::collect(
                theme,
                &mut self.networks,
                &mut self.net,
                &self.network_interface,
            );
            if let Some(rx) = rx {
                updates.push(("rx", Some(rx)));
            }
            if let Some(tx) = tx {
                updates.push(("tx", Some(tx)));
            }
        } else {
            updates.push(("rx", None));
            updates.push(("tx", None));
        }

        updates.push(("battery", battery::collect(theme).await));
        updates.push(("brightness", brightness::collect(theme)));

        updates
    }

    /// Cheap re-collection of the two user-togglable metrics, used by the
    /// refresh signal.
    pub async fn collect_volatile(&mut self, theme: &Theme) -> StatUpdates {
        let mut updates = StatUpdates::new();
        if self.valid_sound {
            updates.push(("volume", volume::collect(theme, &self.sound_device).await));
        }
        updates.push(("brightness", brightness::collect(theme)));
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColorConfig, Theme};

    fn test_theme() -> Theme {
        Theme {
            colors: ColorConfig {
                sidebars_bg: "#444".into(),
                sidebars_fg: "#eee".into(),
                urgent: "#f00".into(),
                key: "#aaa".into(),
                value: "#fff".into(),
                bg: "#222".into(),
            },
            icons: [
                ("bar-left-0", "["),
                ("bar-left-3", "≣"),
                ("bar-middle-0", "-"),
                ("bar-middle-4", "#"),
                ("bar-right-0", "]"),
                ("bar-right-3", "≫"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        }
    }

    #[test]
    fn test_stat_length_counts_value_plus_icon_padding() {
        let stat = Stat::new(
            &test_theme(),
            StatStyle::Default,
            "I".into(),
            "12:34".into(),
        );
        assert_eq!(stat.length, 7);
    }

    #[test]
    fn test_render_default_and_urgent() {
        let theme = test_theme();
        assert_eq!(
            render(&theme, StatStyle::Default, "I", "42"),
            "^fg(#aaa)I ^fg(#fff)42"
        );
        assert_eq!(
            render(&theme, StatStyle::Urgent, "I", "42"),
            "^fg(#f00)I 42"
        );
    }

    #[test]
    fn test_update_formatting_reapplies_theme() {
        let theme = test_theme();
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "clock",
            Stat::new(&theme, StatStyle::Default, "I".into(), "12:34".into()),
        );

        let mut recolored = theme.clone();
        recolored.colors.key = "#123".into();
        update_formatting(&mut snapshot, &recolored);

        assert!(snapshot["clock"].formatted.starts_with("^fg(#123)"));
        assert_eq!(snapshot["clock"].value, "12:34");
    }

    #[test]
    fn test_progress_bar_extremes() {
        let theme = test_theme();
        assert_eq!(progress_bar(&theme, 0), "[-]");
        assert_eq!(progress_bar(&theme, 100), "≣#≫");
    }

    #[test]
    fn test_apply_updates_inserts_and_removes() {
        let theme = test_theme();
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "volume",
            Stat::new(&theme, StatStyle::Default, "I".into(), "50".into()),
        );

        apply_updates(
            &mut snapshot,
            vec![
                ("volume", None),
                (
                    "cpu",
                    Some(Stat::new(&theme, StatStyle::Default, "C".into(), "7".into())),
                ),
            ],
        );

        assert!(!snapshot.contains_key("volume"));
        assert!(snapshot.contains_key("cpu"));
    }
}
