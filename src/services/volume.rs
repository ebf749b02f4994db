//! Sink volume via `pactl`.
//!
//! The configured sound device is a numeric pactl sink index. Parsing
//! works on the long `pactl list sinks` listing: one `Mute:`, `Volume:`
//! and (optionally) `Active Port:` line per sink, in sink order.

use super::{Stat, StatStyle, progress_bar};
use crate::config::Theme;
use log::warn;
use tokio::process::Command;

/// Parsed state of one sink.
#[derive(Debug, PartialEq, Eq)]
struct SinkState {
    volume: i32,
    muted: bool,
    headphone: bool,
}

/// Check that the configured sink index shows up in `pactl list sinks short`.
pub fn is_valid_device(device: &str) -> bool {
    let output = std::process::Command::new("pactl")
        .args(["list", "sinks", "short"])
        .output();

    let valid = match output {
        Ok(out) if !out.stdout.is_empty() => String::from_utf8_lossy(&out.stdout)
            .lines()
            .filter_map(|line| line.split('\t').next())
            .any(|id| id == device),
        _ => false,
    };

    if !valid {
        warn!(
            "Sound device '{}' is not valid; please recheck the config file",
            device
        );
    }
    valid
}

/// Collect the current volume for the configured sink.
pub async fn collect(theme: &Theme, device: &str) -> Option<Stat> {
    let index: usize = device.parse().ok()?;

    let output = Command::new("pactl")
        .args(["list", "sinks"])
        .output()
        .await
        .ok()?;

    let sink = parse_sinks(&String::from_utf8_lossy(&output.stdout), index)?;

    let icon_name = match (sink.muted, sink.headphone, sink.volume > 40) {
        (true, true, _) => "headphone_mute",
        (true, false, true) => "volume_loud_mute",
        (true, false, false) => "volume_low_mute",
        (false, true, _) => "headphone",
        (false, false, true) => "volume_loud",
        (false, false, false) => "volume_low",
    };
    let style = if sink.muted {
        StatStyle::Urgent
    } else {
        StatStyle::Default
    };

    Some(Stat::new(
        theme,
        style,
        theme.icon(icon_name),
        progress_bar(theme, sink.volume),
    ))
}

fn parse_sinks(output: &str, index: usize) -> Option<SinkState> {
    let mut volumes: Vec<i32> = Vec::new();
    let mut muted: Vec<bool> = Vec::new();
    let mut headphone: Vec<bool> = Vec::new();

    for line in output.lines() {
        let trimmed: Vec<&str> = line.split_whitespace().collect();
        match trimmed.as_slice() {
            ["Mute:", state, ..] => muted.push(*state == "yes"),
            // Volume: front-left: 43055 /  66% / -10.95 dB, front-right: ...
            ["Volume:", _, _, _, percent, ..] => {
                volumes.push(percent.trim_end_matches('%').parse().ok()?);
            }
            ["Active", "Port:", port, ..] => {
                // Active ports come after the volume line of their sink.
                while headphone.len() < volumes.len().saturating_sub(1) {
                    headphone.push(false);
                }
                headphone.push(port.contains("headphones"));
            }
            _ => {}
        }
    }

    while headphone.len() < volumes.len() {
        headphone.push(false);
    }

    Some(SinkState {
        volume: *volumes.get(index)?,
        muted: *muted.get(index)?,
        headphone: *headphone.get(index)?,
    })
}
