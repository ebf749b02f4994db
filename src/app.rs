//! Application state: the bar manager, the WM link and the collector,
//! wired together for the event sources in `dispatcher`.

use crate::bars::BarManager;
use crate::config::{self, Config, Layout};
use crate::monitor::Monitor;
use crate::services::Collector;
use crate::wm_link::WmLink;
use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct App {
    pub manager: Arc<BarManager>,
    pub wm_link: Arc<WmLink>,
    collector: Mutex<Collector>,
    config_path: PathBuf,
}

impl App {
    pub fn new(config: &Config, config_path: PathBuf, monitors: Vec<Monitor>) -> Arc<Self> {
        let username = env::var("USER").unwrap_or_default();
        let manager = BarManager::new(monitors, username, Layout::from_config(config));
        let wm_link = WmLink::new(PathBuf::from(&config.wm_socket));
        let collector = Mutex::new(Collector::new(
            &config.sound_device,
            &config.network_interface,
        ));

        Arc::new(App {
            manager,
            wm_link,
            collector,
            config_path,
        })
    }

    /// One ticker cycle: collect everything, push the new content, and
    /// resize the floating bar if the content length changed.
    pub async fn tick(&self) {
        let theme = self.manager.theme().await;
        let updates = self.collector.lock().await.collect_all(&theme).await;
        self.manager.tick(updates).await;
    }

    /// Refresh signal: re-collect only volume and brightness and push
    /// immediately, no redraw.
    pub async fn refresh_volatile(&self) {
        let theme = self.manager.theme().await;
        let updates = self.collector.lock().await.collect_volatile(&theme).await;
        self.manager.push_updates(updates).await;
    }

    /// Reload signal: re-read the config, re-theme the collected stats,
    /// notify the WM, then relaunch every bar with the new layout.
    pub async fn reload(&self) {
        info!("Reloading config...");
        let config = match config::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                // Fatal only at startup; a broken reload keeps the
                // previous config running.
                error!("config reload failed: {}; keeping previous config", e);
                return;
            }
        };

        self.collector
            .lock()
            .await
            .reconfigure(&config.sound_device, &config.network_interface);
        self.manager.set_layout(Layout::from_config(&config)).await;

        self.wm_link.trigger_wm_reload().await;

        let theme = self.manager.theme().await;
        let updates = self.collector.lock().await.collect_all(&theme).await;
        self.manager.apply_updates(updates).await;

        self.manager.redraw_all().await;
        self.manager.update_content().await;
    }
}
