//! Bar content formatting.
//!
//! Pure functions from (snapshot, layout, monitor, username) to the text
//! lines streamed into the renderer subprocesses. All dzen escape
//! knowledge lives here.

use crate::config::Layout;
use crate::monitor::Monitor;
use crate::services::{KEYS, Snapshot};

/// Approximate pixel width of one rendered character.
///
/// Empirical coefficient tied to the bar font; deliberately not derived
/// from text measurement. Yeah, I am wondering about this as well.
pub const BAR_WIDTH_SCALE: f32 = 7.5;

/// Padding characters reserved around the trailing username block.
const USERNAME_ALLOWANCE: usize = 5;

/// Floating-bar width in pixels, counting stats from `start_key` onward
/// so only the right-aligned portion contributes.
pub fn bar_width_from_key(stats: &Snapshot, start_key: &str, username: &str) -> i32 {
    let mut width: i32 = 0;
    let mut started = false;

    for key in KEYS {
        if key == start_key {
            started = true;
        }
        if started && let Some(stat) = stats.get(key) {
            width += stat.length;
        }
    }
    width += (username.chars().count() + USERNAME_ALLOWANCE) as i32;

    (width as f32 * BAR_WIDTH_SCALE) as i32
}

/// Character length of the status content without any color styling,
/// used to size the floating main bar.
pub fn status_bar_len(stats: &Snapshot) -> usize {
    let mut bar = String::new();
    for key in KEYS {
        if let Some(stat) = stats.get(key) {
            bar.push(' ');
            bar.push_str(&stat.icon);
            bar.push(' ');
            bar.push_str(&stat.value);
        }
    }
    bar.chars().count()
}

/// Render the main status bar line for one monitor.
pub fn status_bar(layout: &Layout, stats: &Snapshot, monitor: &Monitor, username: &str) -> String {
    let colors = &layout.theme.colors;
    let mut bar = String::new();

    for key in KEYS {
        let Some(stat) = stats.get(key) else {
            continue;
        };

        if key == "clock" && !layout.popups.clock.is_empty() {
            // Clickable clock: the popup command receives the screen,
            // its geometry and the current bar width.
            let bar_width = bar_width_from_key(stats, key, username);
            bar.push_str(&format!(
                " ^ca(1,{} {} {} {} {}){}^ca()",
                layout.popups.clock,
                monitor.index + 1,
                monitor.width,
                monitor.height,
                bar_width,
                stat.formatted
            ));
        } else {
            bar.push_str(&format!(" {}", stat.formatted));
        }
    }

    if layout.popups.user.is_empty() {
        bar.push_str(&format!(
            " ^fg({})^fg({})^bg({}) {} ",
            colors.sidebars_bg, colors.sidebars_fg, colors.sidebars_bg, username
        ));
    } else {
        bar.push_str(&format!(
            " ^ca(1,{} {} {} {})^fg({})^fg({})^bg({}) {} ^ca()",
            layout.popups.user,
            monitor.index + 1,
            monitor.width,
            monitor.height,
            colors.sidebars_bg,
            colors.sidebars_fg,
            colors.sidebars_bg,
            username
        ));
    }

    bar
}

/// Render the static left-bar "info" block for one monitor.
pub fn left_bar_content(layout: &Layout, monitor: &Monitor) -> String {
    let colors = &layout.theme.colors;

    if layout.popups.info.is_empty() {
        format!(
            "^fg({})^bg({})  info^fg({})^bg({})  ",
            colors.sidebars_fg, colors.sidebars_bg, colors.sidebars_bg, colors.bg
        )
    } else {
        format!(
            "^ca(1,{} {} {} {})^fg({})^bg({})  info^fg({})^bg({})  ^ca()",
            layout.popups.info,
            monitor.index + 1,
            monitor.width,
            monitor.height,
            colors.sidebars_fg,
            colors.sidebars_bg,
            colors.sidebars_bg,
            colors.bg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use crate::services::{Snapshot, Stat, StatStyle};

    fn stat_with_length(value_len: usize) -> Stat {
        // Stat length is value chars + 2, so subtract the padding here.
        Stat::new(
            &Layout::default().theme,
            StatStyle::Default,
            "I".into(),
            "x".repeat(value_len - 2),
        )
    }

    fn monitor() -> Monitor {
        Monitor {
            index: 0,
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn test_bar_width_from_key_exact_arithmetic() {
        let mut stats = Snapshot::new();
        stats.insert("clock", stat_with_length(5));
        stats.insert("rx", stat_with_length(6));
        stats.insert("tx", stat_with_length(6));
        stats.insert("volume", stat_with_length(3));
        stats.insert("battery", stat_with_length(4));

        // Only volume and battery count: (3 + 4 + len("user") + 5) * 7.5 = 120.
        assert_eq!(bar_width_from_key(&stats, "volume", "user"), 120);
    }

    #[test]
    fn test_bar_width_counts_everything_from_first_key() {
        let mut stats = Snapshot::new();
        stats.insert("clock", stat_with_length(5));
        stats.insert("volume", stat_with_length(3));

        // (5 + 3 + 4 + 5) * 7.5 = 127.5, truncated.
        assert_eq!(bar_width_from_key(&stats, "clock", "user"), 127);
    }

    #[test]
    fn test_status_bar_len_skips_absent_keys() {
        let mut stats = Snapshot::new();
        let stat = Stat::new(
            &Layout::default().theme,
            StatStyle::Default,
            "I".into(),
            "12:34".into(),
        );
        stats.insert("clock", stat);

        // " I 12:34"
        assert_eq!(status_bar_len(&stats), 8);
    }

    #[test]
    fn test_status_bar_wraps_clock_popup() {
        let mut layout = Layout::default();
        layout.popups.clock = "popup-cal".into();

        let mut stats = Snapshot::new();
        stats.insert(
            "clock",
            Stat::new(&layout.theme, StatStyle::Default, "I".into(), "12:34".into()),
        );

        let bar = status_bar(&layout, &stats, &monitor(), "user");
        assert!(bar.contains("^ca(1,popup-cal 1 1920 1080"));
        assert!(bar.contains("^ca()"));
    }

    #[test]
    fn test_status_bar_always_ends_with_username_block() {
        let layout = Layout::default();
        let bar = status_bar(&layout, &Snapshot::new(), &monitor(), "user");
        assert!(bar.contains(" user "));
        assert!(!bar.contains("^ca("));
    }

    #[test]
    fn test_left_bar_popup_toggle() {
        let mut layout = Layout::default();
        assert!(!left_bar_content(&layout, &monitor()).contains("^ca("));

        layout.popups.info = "popup-info".into();
        let content = left_bar_content(&layout, &monitor());
        assert!(content.starts_with("^ca(1,popup-info 1 1920 1080)"));
    }
}
