//! Battery charge via `acpi -b`.

use super::{Stat, StatStyle, progress_bar};
use crate::config::Theme;
use tokio::process::Command;

/// Charge level below which the stat switches to the urgent style.
const URGENT_CHARGE: i32 = 10;

#[derive(Debug, PartialEq, Eq)]
struct BatteryState {
    charge: i32,
    charging: bool,
}

/// Collect the battery charge. Machines without `acpi` or a battery
/// simply drop the key.
pub async fn collect(theme: &Theme) -> Option<Stat> {
    let output = Command::new("acpi").arg("-b").output().await.ok()?;
    if output.stdout.is_empty() {
        return None;
    }

    let state = parse_acpi(&String::from_utf8_lossy(&output.stdout))?;

    let mut icon_name = match state.charge {
        c if c > 75 => "battery_full",
        c if c > 50 => "battery_three_quarters",
        c if c > 25 => "battery_half",
        c if c > 10 => "battery_quarter",
        _ => "battery_empty",
    }
    .to_string();
    if state.charging {
        icon_name.push_str("_power");
    }

    let style = if state.charge <= URGENT_CHARGE {
        StatStyle::Urgent
    } else {
        StatStyle::Default
    };

    Some(Stat::new(
        theme,
        style,
        theme.icon(&icon_name),
        progress_bar(theme, state.charge),
    ))
}

/// Parse `acpi -b` output, e.g.
/// `Battery 0: Discharging, 45%, 01:30:11 remaining`.
fn parse_acpi(output: &str) -> Option<BatteryState> {
    let charge = output
        .split(' ')
        .nth(3)?
        .trim_end_matches(',')
        .trim_end_matches('%')
        .parse()
        .ok()?;

    let charging = output.contains("Charging") || output.contains("will never fully discharge");

    Some(BatteryState { charge, charging })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discharging() {
        let state = parse_acpi("Battery 0: Discharging, 45%, 01:30:11 remaining\n").unwrap();
        assert_eq!(
            state,
            BatteryState {
                charge: 45,
                charging: false
            }
        );
    }

    #[test]
    fn test_parse_charging() {
        let state = parse_acpi("Battery 0: Charging, 82%, 00:20:04 until charged\n").unwrap();
        assert_eq!(
            state,
            BatteryState {
                charge: 82,
                charging: true
            }
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_acpi("no battery here").is_none());
    }
}
