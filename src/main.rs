//! barkeep - dzen2 status bar manager for dwm-style window managers.
//!
//! Samples host metrics once a second, streams themed status lines into
//! per-monitor dzen2 subprocesses, and talks to the window manager over
//! a Unix socket for bar toggling and theme reloads.

mod app;
mod bars;
mod config;
mod dispatcher;
mod format;
mod functions;
mod monitor;
mod services;
mod wm_link;

use app::App;
use log::{error, info};
use std::path::{Path, PathBuf};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage(config_path: &Path) {
    eprintln!(
        "Config file '{}' does not seem to exist. Please double check.",
        config_path.display()
    );
    eprintln!("Usage: {} [config file]\n", config::APP_NAME);
    eprintln!(
        "If no config file is specified, {} will try to use \
         '$XDG_CONFIG_HOME/{}/barkeep.cfg', if $XDG_CONFIG_HOME is set, \
         or '~/.config/{}/barkeep.cfg', otherwise.",
        config::APP_NAME,
        config::APP_NAME,
        config::APP_NAME
    );
}

#[tokio::main]
async fn main() {
    println!("{} v{}", config::APP_NAME, VERSION);
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_file);

    if !config_path.exists() {
        usage(&config_path);
        std::process::exit(1);
    }

    let config = match config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\nexiting...", e);
            std::process::exit(e.exit_code());
        }
    };

    let monitors = monitor::detect();
    if monitors.is_empty() {
        eprintln!("No monitors found!");
        std::process::exit(1);
    }

    let app = App::new(&config, config_path, monitors);

    // Bidirectional communication with the WM via Unix domain socket.
    tokio::spawn(app.wm_link.clone().run(app.manager.clone()));

    {
        let app = app.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher::run_signals(app).await {
                error!("signal handler failed: {}", e);
            }
        });
    }

    app.manager.redraw_all().await;
    info!(
        "{} running on {} monitor(s)",
        config::APP_NAME,
        app.manager.monitors().len()
    );

    tokio::select! {
        _ = dispatcher::run_ticker(app.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, closing bars");
        }
    }

    app.manager.shutdown().await;
}
