//! Configuration loading and the derived bar layout.
//!
//! The config document is the same JSON shape the window-manager setup
//! already ships: device names, font, WM socket path, icon set, color
//! theme, bar geometry and popup commands. It is parsed once at startup
//! and re-parsed on SIGHUP; the derived [`Layout`] snapshot is swapped
//! wholesale under the core lock so readers never observe a half-updated
//! theme.

use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "barkeep";

/// Startup config failures map to distinct exit codes so wrapper
/// scripts can tell a missing file from a broken one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read config file '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing config file '{path}': {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::Unreadable { .. } => 1,
            ConfigError::Malformed { .. } => 2,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IconEntry {
    pub name: String,
    pub icon: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ColorConfig {
    pub sidebars_bg: String,
    pub sidebars_fg: String,
    pub urgent: String,
    pub key: String,
    pub value: String,
    pub bg: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BarConfig {
    pub height: i32,
    pub left_bar_width: i32,
    /// "yes" (or empty) for a full-width main bar, anything else for a
    /// floating right-aligned one.
    pub contiguous: String,
    /// "top" or "bottom".
    pub position: String,
    /// Renderer command, dzen2 unless overridden.
    pub renderer: String,
    /// Extra arguments placed before the geometry flags.
    pub renderer_args: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PopupConfig {
    pub info: String,
    pub clock: String,
    pub user: String,
}

/// The raw configuration document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub sound_device: String,
    pub network_interface: String,
    pub font: String,
    pub wm_socket: String,
    pub icons: Vec<IconEntry>,
    pub colors: ColorConfig,
    pub bar: BarConfig,
    pub popups: PopupConfig,
}

/// Color theme plus the icon set, cloned out to collectors so they can
/// format stats without holding the core lock.
#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub colors: ColorConfig,
    pub icons: HashMap<String, String>,
}

impl Theme {
    pub fn icon(&self, name: &str) -> String {
        self.icons.get(name).cloned().unwrap_or_default()
    }
}

/// Read-mostly layout snapshot derived from the config document.
/// Replaced wholesale on reload.
#[derive(Clone, Debug)]
pub struct Layout {
    pub bar_height: i32,
    pub left_bar_width: i32,
    pub contiguous: bool,
    pub top_bar: bool,
    pub font: String,
    pub renderer: String,
    pub renderer_args: Vec<String>,
    pub theme: Theme,
    pub popups: PopupConfig,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::from_config(&Config::default())
    }
}

impl Layout {
    pub fn from_config(config: &Config) -> Self {
        let contiguous = config.bar.contiguous.is_empty() || config.bar.contiguous == "yes";

        let bar_height = if config.bar.height > 0 {
            config.bar.height
        } else {
            15
        };

        let left_bar_width = config.bar.left_bar_width.max(0);
        let top_bar = config.bar.position != "bottom";

        let renderer = if config.bar.renderer.is_empty() {
            "dzen2".to_string()
        } else {
            config.bar.renderer.clone()
        };

        let icons = config
            .icons
            .iter()
            .map(|entry| (entry.name.clone(), entry.icon.clone()))
            .collect();

        Layout {
            bar_height,
            left_bar_width,
            contiguous,
            top_bar,
            font: config.font.clone(),
            renderer,
            renderer_args: config.bar.renderer_args.clone(),
            theme: Theme {
                colors: config.colors.clone(),
                icons,
            },
            popups: config.popups.clone(),
        }
    }
}

/// XDG base directory for user configuration.
fn config_directory() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = env::var("HOME").unwrap_or_else(|_| {
                warn!("$HOME not set, falling back to current directory");
                ".".to_string()
            });
            PathBuf::from(home).join(".config")
        }
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/barkeep/barkeep.cfg`.
pub fn default_config_file() -> PathBuf {
    config_directory().join(APP_NAME).join("barkeep.cfg")
}

/// Load and parse the config document.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Hex colors contain `"#`, so the delimiter needs two hashes.
    const SAMPLE: &str = r##"{
        "SoundDevice": "0",
        "NetworkInterface": "wlan0",
        "Font": "Dejavu Sans Mono-9",
        "WmSocket": "/tmp/dwm.sock",
        "Icons": [{"Name": "clock", "Icon": "⊕"}],
        "Colors": {
            "SidebarsBg": "#444444",
            "SidebarsFg": "#eeeeee",
            "Urgent": "#ff0000",
            "Key": "#aaaaaa",
            "Value": "#ffffff",
            "Bg": "#222222"
        },
        "Bar": {"Height": 18, "LeftBarWidth": 80, "Contiguous": "no", "Position": "bottom"},
        "Popups": {"Info": "popup-info", "Clock": "popup-cal", "User": ""}
    }"##;

    #[test]
    fn test_load_sample_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.sound_device, "0");
        assert_eq!(config.network_interface, "wlan0");
        assert_eq!(config.wm_socket, "/tmp/dwm.sock");
        assert_eq!(config.icons[0].name, "clock");
        assert_eq!(config.colors.sidebars_bg, "#444444");
        assert_eq!(config.colors.urgent, "#ff0000");

        let layout = Layout::from_config(&config);
        assert_eq!(layout.bar_height, 18);
        assert_eq!(layout.left_bar_width, 80);
        assert!(!layout.contiguous);
        assert!(!layout.top_bar);
        assert_eq!(layout.renderer, "dzen2");
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let err = load(Path::new("/nonexistent/barkeep.cfg")).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_layout_defaults() {
        let layout = Layout::from_config(&Config::default());
        assert_eq!(layout.bar_height, 15);
        assert_eq!(layout.left_bar_width, 0);
        assert!(layout.contiguous);
        assert!(layout.top_bar);
    }
}
