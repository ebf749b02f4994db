//! Bar subprocess lifecycle management.
//!
//! Owns one renderer subprocess per (role, monitor) slot and every piece
//! of mutable bar state: the handle table, the layout snapshot, the stat
//! snapshot and the floating-bar width. All of it lives inside a single
//! `tokio::sync::Mutex`, so the ticker, the signal handler and the WM
//! socket reader can never observe a half-replaced handle or write to a
//! stream whose process has already been retired.
//!
//! Retired handles are closed off the hot path: `draw` installs the new
//! handle and hands the old one to a reaper task, which closes stdin
//! (the renderer's documented exit request), waits with a timeout and
//! kills stragglers so no zombie survives.

use crate::config::{Layout, Theme};
use crate::format;
use crate::monitor::Monitor;
use crate::services::{self, Snapshot, StatUpdates};
use log::{debug, error, info, warn};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// How long a retiring renderer gets to exit after its stdin closes
/// before it is killed.
const REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Initial floating-bar width before the first content measurement.
const INITIAL_MAIN_WIDTH: i32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarRole {
    Main,
    Left,
}

impl std::fmt::Display for BarRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarRole::Main => write!(f, "main"),
            BarRole::Left => write!(f, "left"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BarError {
    #[error("monitor index {0} incorrect")]
    InvalidMonitor(usize),

    #[error("failed to spawn {role} bar renderer for monitor {monitor}: {source}")]
    Spawn {
        role: BarRole,
        monitor: usize,
        source: std::io::Error,
    },
}

/// One running renderer subprocess. The child and its stdin are owned
/// exclusively here; nobody else signals or waits on them.
pub struct BarHandle {
    pub role: BarRole,
    pub monitor: usize,
    child: Child,
    stdin: ChildStdin,
    pub args: Vec<String>,
    pub visible: bool,
}

impl BarHandle {
    /// Write one newline-terminated content line. A failed write drops
    /// the line and keeps the process; the next tick retries.
    async fn write_line(&mut self, content: &str) {
        let mut line = String::with_capacity(content.len() + 1);
        line.push_str(content);
        line.push('\n');
        if let Err(e) = self.stdin.write_all(line.as_bytes()).await {
            debug!(
                "dropping status line for {} bar on monitor {}: {}",
                self.role, self.monitor, e
            );
        }
    }
}

/// Per-monitor handle slots, one sequence per role.
struct BarSet {
    main: Vec<Option<BarHandle>>,
    left: Vec<Option<BarHandle>>,
}

impl BarSet {
    fn new(monitors: usize) -> Self {
        BarSet {
            main: (0..monitors).map(|_| None).collect(),
            left: (0..monitors).map(|_| None).collect(),
        }
    }

    fn slots(&self, role: BarRole) -> &[Option<BarHandle>] {
        match role {
            BarRole::Main => &self.main,
            BarRole::Left => &self.left,
        }
    }

    fn slots_mut(&mut self, role: BarRole) -> &mut Vec<Option<BarHandle>> {
        match role {
            BarRole::Main => &mut self.main,
            BarRole::Left => &mut self.left,
        }
    }
}

/// The single unit of synchronization for the whole core.
struct CoreState {
    layout: Layout,
    stats: Snapshot,
    bars: BarSet,
    main_width: i32,
}

struct Retired {
    handle: BarHandle,
    delay: Option<Duration>,
}

/// Owner of all bar subprocesses and their shared state.
pub struct BarManager {
    monitors: Vec<Monitor>,
    username: String,
    core: Mutex<CoreState>,
    retire_tx: std::sync::Mutex<Option<mpsc::UnboundedSender<Retired>>>,
    reaper: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BarManager {
    pub fn new(monitors: Vec<Monitor>, username: String, layout: Layout) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let reaper = tokio::spawn(run_reaper(rx));

        let count = monitors.len();
        Arc::new(BarManager {
            monitors,
            username,
            core: Mutex::new(CoreState {
                layout,
                stats: Snapshot::new(),
                bars: BarSet::new(count),
                main_width: INITIAL_MAIN_WIDTH,
            }),
            retire_tx: std::sync::Mutex::new(Some(tx)),
            reaper: std::sync::Mutex::new(Some(reaper)),
        })
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    /// Clone the current theme for a collector run.
    pub async fn theme(&self) -> Theme {
        self.core.lock().await.layout.theme.clone()
    }

    /// Swap in a freshly loaded layout and re-render the collected stats
    /// with its theme.
    pub async fn set_layout(&self, layout: Layout) {
        let mut core = self.core.lock().await;
        core.layout = layout;
        // Reborrow through the guard so stats and layout borrow disjointly.
        let core = &mut *core;
        services::update_formatting(&mut core.stats, &core.layout.theme);
    }

    /// Whether the bar for this slot is currently shown.
    pub async fn is_visible(&self, role: BarRole, monitor: usize) -> bool {
        let core = self.core.lock().await;
        core.bars
            .slots(role)
            .get(monitor)
            .and_then(|slot| slot.as_ref())
            .is_some_and(|handle| handle.visible)
    }

    /// Spawn a fresh renderer for one slot and install it. The previous
    /// handle, if any, is retired asynchronously; the draw never waits
    /// for the old process to exit.
    pub async fn draw(&self, role: BarRole, monitor: usize) -> Result<(), BarError> {
        let mut core = self.core.lock().await;
        self.draw_locked(&mut core, role, monitor).await
    }

    async fn draw_locked(
        &self,
        core: &mut CoreState,
        role: BarRole,
        monitor: usize,
    ) -> Result<(), BarError> {
        let mon = *self
            .monitors
            .get(monitor)
            .ok_or(BarError::InvalidMonitor(monitor))?;

        let (args, content) = match role {
            BarRole::Main => (
                main_bar_args(&core.layout, &mon, core.main_width),
                format::status_bar(&core.layout, &core.stats, &mon, &self.username),
            ),
            BarRole::Left => (
                left_bar_args(&core.layout, &mon),
                format::left_bar_content(&core.layout, &mon),
            ),
        };

        let mut handle =
            spawn_renderer(&core.layout, role, monitor, args).map_err(|source| BarError::Spawn {
                role,
                monitor,
                source,
            })?;
        debug!(
            "{} bar for monitor {} launched: {:?}",
            role, monitor, handle.args
        );
        handle.write_line(&content).await;

        // Install first, retire second: the screen never shows a gap.
        let old = core.bars.slots_mut(role)[monitor].replace(handle);
        if let Some(old) = old {
            self.retire(old, None);
        }
        Ok(())
    }

    /// Close one bar: signal the renderer by closing its stdin, then
    /// wait (bounded) for it to exit.
    pub async fn close(&self, role: BarRole, monitor: usize) -> Result<(), BarError> {
        let handle = {
            let mut core = self.core.lock().await;
            core.bars
                .slots_mut(role)
                .get_mut(monitor)
                .ok_or(BarError::InvalidMonitor(monitor))?
                .take()
        };
        if let Some(handle) = handle {
            retire_handle(handle, None).await;
        }
        Ok(())
    }

    /// Close every matching bar. `delay` inserts one grace period before
    /// the whole batch is retired, used when a full bar set is being
    /// replaced so the teardown is not visible as flicker.
    pub async fn close_all(
        &self,
        role: Option<BarRole>,
        monitor: Option<usize>,
        delay: Option<Duration>,
    ) {
        let mut taken = Vec::new();
        {
            let mut core = self.core.lock().await;
            for r in [BarRole::Left, BarRole::Main] {
                if role.is_some_and(|want| want != r) {
                    continue;
                }
                for (i, slot) in core.bars.slots_mut(r).iter_mut().enumerate() {
                    if monitor.is_some_and(|want| want != i) {
                        continue;
                    }
                    if let Some(handle) = slot.take() {
                        taken.push(handle);
                    }
                }
            }
        }
        if let Some(delay) = delay
            && !taken.is_empty()
        {
            sleep(delay).await;
        }
        for handle in taken {
            self.retire(handle, None);
        }
    }

    /// Show or hide both bars of one monitor. The left bar's visibility
    /// is the canonical hidden indicator; main and left always move
    /// together.
    pub async fn toggle(&self, monitor: usize) -> Result<(), BarError> {
        let mut core = self.core.lock().await;
        let hidden = !core
            .bars
            .left
            .get(monitor)
            .ok_or(BarError::InvalidMonitor(monitor))?
            .as_ref()
            .is_some_and(|handle| handle.visible);

        if hidden {
            self.draw_locked(&mut core, BarRole::Left, monitor).await?;
            self.draw_locked(&mut core, BarRole::Main, monitor).await?;
            Ok(())
        } else {
            let left = core.bars.left[monitor].take();
            let main = core.bars.main[monitor].take();
            drop(core);
            if let Some(handle) = left {
                retire_handle(handle, None).await;
            }
            if let Some(handle) = main {
                retire_handle(handle, None).await;
            }
            Ok(())
        }
    }

    /// Redraw both bars for every monitor. A spawn failure on one
    /// monitor skips that monitor and keeps going.
    pub async fn redraw_all(&self) {
        let mut core = self.core.lock().await;
        self.redraw_role_locked(&mut core, BarRole::Left).await;
        self.redraw_role_locked(&mut core, BarRole::Main).await;
        self.maybe_resize_locked(&mut core).await;
    }

    async fn redraw_role_locked(&self, core: &mut CoreState, role: BarRole) {
        for i in 0..self.monitors.len() {
            if let Err(e) = self.draw_locked(core, role, i).await {
                error!("{}", e);
            }
        }
    }

    /// Write a fresh status line into every open main-bar stream.
    pub async fn update_content(&self) {
        let mut core = self.core.lock().await;
        self.update_content_locked(&mut core).await;
    }

    async fn update_content_locked(&self, core: &mut CoreState) {
        for mon in &self.monitors {
            let line = format::status_bar(&core.layout, &core.stats, mon, &self.username);
            if let Some(handle) = core.bars.main[mon.index].as_mut() {
                handle.write_line(&line).await;
            }
        }
    }

    /// Recompute the floating-bar width from the unstyled content
    /// length; a change relaunches the main bars with fresh geometry.
    async fn maybe_resize_locked(&self, core: &mut CoreState) {
        if core.layout.contiguous {
            return;
        }

        let target = (format::status_bar_len(&core.stats) as f32 * format::BAR_WIDTH_SCALE) as i32;
        if target != core.main_width {
            debug!(
                "main bar width {} -> {}, relaunching main bars",
                core.main_width, target
            );
            core.main_width = target;
            self.redraw_role_locked(core, BarRole::Main).await;
        }
    }

    /// Apply one tick's stat updates, push the new content, and resize
    /// the floating bar if the content length changed.
    pub async fn tick(&self, updates: StatUpdates) {
        let mut core = self.core.lock().await;
        services::apply_updates(&mut core.stats, updates);
        self.update_content_locked(&mut core).await;
        self.maybe_resize_locked(&mut core).await;
    }

    /// Apply stat updates without writing anything to the bars.
    pub async fn apply_updates(&self, updates: StatUpdates) {
        let mut core = self.core.lock().await;
        services::apply_updates(&mut core.stats, updates);
    }

    /// Apply a partial stat refresh and push content, without touching
    /// geometry. Used by the refresh signal.
    pub async fn push_updates(&self, updates: StatUpdates) {
        let mut core = self.core.lock().await;
        services::apply_updates(&mut core.stats, updates);
        self.update_content_locked(&mut core).await;
    }

    fn retire(&self, mut handle: BarHandle, delay: Option<Duration>) {
        handle.visible = false;
        let tx = self.retire_tx.lock().expect("retire queue lock poisoned");
        if let Some(tx) = tx.as_ref() {
            if let Err(mpsc::error::SendError(retired)) = tx.send(Retired { handle, delay }) {
                warn!("retire queue closed, closing bar handle detached");
                tokio::spawn(retire_handle(retired.handle, delay));
            }
        } else {
            warn!("retire queue closed, closing bar handle detached");
            tokio::spawn(retire_handle(handle, delay));
        }
    }

    /// Close every bar and drain the reaper so no renderer subprocess
    /// outlives this process.
    pub async fn shutdown(&self) {
        self.close_all(None, None, None).await;

        let tx = self.retire_tx.lock().expect("retire queue lock poisoned").take();
        drop(tx);

        let reaper = self.reaper.lock().expect("reaper lock poisoned").take();
        if let Some(reaper) = reaper {
            if let Err(e) = reaper.await {
                warn!("reaper task failed during shutdown: {}", e);
            }
        }
        info!("all bar renderers closed");
    }

    #[cfg(test)]
    async fn renderer_pid(&self, role: BarRole, monitor: usize) -> Option<u32> {
        let core = self.core.lock().await;
        core.bars.slots(role)[monitor].as_ref().and_then(|h| h.child.id())
    }

    #[cfg(test)]
    async fn stat_formatted(&self, key: &str) -> Option<String> {
        let core = self.core.lock().await;
        core.stats.get(key).map(|stat| stat.formatted.clone())
    }
}

/// Close one retired handle: stdin close is the exit request, a bounded
/// wait reaps the process, and a kill handles renderers that ignore the
/// request.
async fn retire_handle(handle: BarHandle, delay: Option<Duration>) {
    if let Some(delay) = delay {
        sleep(delay).await;
    }

    let BarHandle {
        role,
        monitor,
        mut child,
        stdin,
        ..
    } = handle;
    drop(stdin);

    match timeout(REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => debug!("{} bar on monitor {} exited: {}", role, monitor, status),
        Ok(Err(e)) => warn!("waiting on {} bar for monitor {}: {}", role, monitor, e),
        Err(_) => {
            warn!(
                "{} bar on monitor {} ignored stdin close, killing",
                role, monitor
            );
            if let Err(e) = child.kill().await {
                warn!("failed to kill {} bar on monitor {}: {}", role, monitor, e);
            }
        }
    }
}

async fn run_reaper(mut rx: mpsc::UnboundedReceiver<Retired>) {
    while let Some(retired) = rx.recv().await {
        retire_handle(retired.handle, retired.delay).await;
    }
}

fn spawn_renderer(
    layout: &Layout,
    role: BarRole,
    monitor: usize,
    args: Vec<String>,
) -> std::io::Result<BarHandle> {
    let mut child = Command::new(&layout.renderer)
        .args(&layout.renderer_args)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("renderer stdin unavailable"))?;

    Ok(BarHandle {
        role,
        monitor,
        child,
        stdin,
        args,
        visible: true,
    })
}

fn main_bar_args(layout: &Layout, mon: &Monitor, main_width: i32) -> Vec<String> {
    let (x, width) = if layout.contiguous {
        (layout.left_bar_width, mon.width - layout.left_bar_width)
    } else {
        (mon.width - main_width - 1, main_width)
    };
    let y = if layout.top_bar {
        0
    } else {
        mon.height - layout.bar_height
    };
    let colors = &layout.theme.colors;

    vec![
        "-xs".into(),
        (mon.index + 1).to_string(),
        "-ta".into(),
        "r".into(),
        "-fn".into(),
        layout.font.clone(),
        "-x".into(),
        x.to_string(),
        "-y".into(),
        y.to_string(),
        "-w".into(),
        width.to_string(),
        "-h".into(),
        layout.bar_height.to_string(),
        "-bg".into(),
        colors.bg.clone(),
        "-fg".into(),
        colors.key.clone(),
        "-e".into(),
        "button2=;".into(),
    ]
}

fn left_bar_args(layout: &Layout, mon: &Monitor) -> Vec<String> {
    let y = if layout.top_bar {
        0
    } else {
        mon.height - layout.bar_height
    };
    let colors = &layout.theme.colors;

    vec![
        "-xs".into(),
        (mon.index + 1).to_string(),
        "-ta".into(),
        "l".into(),
        "-fn".into(),
        layout.font.clone(),
        "-w".into(),
        layout.left_bar_width.to_string(),
        "-h".into(),
        layout.bar_height.to_string(),
        "-x".into(),
        "0".into(),
        "-y".into(),
        y.to_string(),
        "-bg".into(),
        colors.bg.clone(),
        "-fg".into(),
        colors.key.clone(),
        "-e".into(),
        "button2=;".into(),
    ]
}
