//! Physical monitor enumeration.
//!
//! Monitors are detected once at startup from `xrandr` output and are
//! immutable for the lifetime of the process. Everything else addresses
//! them by their stable index.

use log::{error, info};
use std::process::Command;

/// One physical display. Geometry only; never mutated after enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Monitor {
    pub index: usize,
    pub width: i32,
    pub height: i32,
}

/// Detect connected monitors by running `xrandr`.
pub fn detect() -> Vec<Monitor> {
    let output = match Command::new("xrandr").output() {
        Ok(out) => out,
        Err(e) => {
            error!("error getting screens: {}", e);
            return Vec::new();
        }
    };

    let monitors = parse_xrandr(&String::from_utf8_lossy(&output.stdout));
    info!("Detected screens: {:?}", monitors);
    monitors
}

/// Parse `xrandr` output into the monitor list.
///
/// Connected outputs carry their mode in the third field, or the fourth
/// when the output is marked primary.
fn parse_xrandr(output: &str) -> Vec<Monitor> {
    let mut monitors = Vec::new();

    for line in output.lines() {
        if !line.contains(" connected ") {
            continue;
        }

        let fields: Vec<&str> = line.split(' ').collect();
        let pos = if line.contains("primary") { 3 } else { 2 };
        let Some(resolution) = fields.get(pos) else {
            continue;
        };

        // "1920x1080+0+0" -> "1920x1080"
        let Some(mode) = resolution.split('+').next() else {
            continue;
        };
        let mut dims = mode.split('x');
        let (Some(w), Some(h)) = (dims.next(), dims.next()) else {
            continue;
        };
        let (Ok(width), Ok(height)) = (w.parse(), h.parse()) else {
            continue;
        };

        monitors.push(Monitor {
            index: monitors.len(),
            width,
            height,
        });
    }

    monitors
}

#[cfg(test)]
mod tests {
    use super::*;

    const XRANDR_OUTPUT: &str = "\
Screen 0: minimum 320 x 200, current 3840 x 1080, maximum 16384 x 16384
eDP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 344mm x 194mm
   1920x1080     60.01*+  59.97    59.96    59.93
HDMI-1 connected 1920x1080+1920+0 (normal left inverted right x axis y axis) 527mm x 296mm
   1920x1080     60.00*+  50.00    59.94
DP-1 disconnected (normal left inverted right x axis y axis)
";

    #[test]
    fn test_parse_xrandr_two_monitors() {
        let monitors = parse_xrandr(XRANDR_OUTPUT);
        assert_eq!(
            monitors,
            vec![
                Monitor {
                    index: 0,
                    width: 1920,
                    height: 1080
                },
                Monitor {
                    index: 1,
                    width: 1920,
                    height: 1080
                },
            ]
        );
    }

    #[test]
    fn test_parse_xrandr_ignores_disconnected() {
        let monitors = parse_xrandr("DP-1 disconnected (normal)\n");
        assert!(monitors.is_empty());
    }

    #[test]
    fn test_parse_xrandr_ignores_garbage() {
        let monitors = parse_xrandr("HDMI-1 connected garbage+0+0 stuff\n");
        assert!(monitors.is_empty());
    }
}
