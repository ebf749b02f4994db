//! Control-plane link to the window manager.
//!
//! One persistent duplex Unix-socket connection. Inbound messages are
//! whitespace-delimited ASCII commands from the WM (bar toggling);
//! outbound messages are a fixed vocabulary of raw uppercase tokens with
//! no framing, which the WM reads whole-message-per-read.
//!
//! Known limitation, kept on purpose: reconnection only happens through
//! the initial dial loop. A read error after the link is up leaves it
//! dead until the process restarts; whether it should auto-heal is an
//! open product question.

use crate::bars::BarManager;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::net::unix::OwnedWriteHalf;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Pause between connection attempts while the WM endpoint is missing.
const DIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Inbound buffer size; WM messages are short command lines.
const READ_BUFFER_SIZE: usize = 128;

/// Recognized inbound commands.
#[derive(Debug, PartialEq, Eq)]
pub enum WmCommand {
    ToggleBar(usize),
}

/// Parse one inbound frame. Trailing NUL padding is stripped; the
/// command name is case-insensitive. Unknown or malformed commands are
/// logged and ignored so the protocol stays forward compatible.
pub fn parse_command(frame: &[u8]) -> Option<WmCommand> {
    let text = String::from_utf8_lossy(frame);
    let trimmed = text.trim_matches('\0');
    let mut tokens = trimmed.split_whitespace();
    let command = tokens.next()?;

    match command.to_uppercase().as_str() {
        "TOGGLE-BAR" => match tokens.next().map(str::parse::<usize>) {
            Some(Ok(monitor)) => Some(WmCommand::ToggleBar(monitor)),
            _ => {
                warn!("malformed TOGGLE-BAR message: '{}'", trimmed);
                None
            }
        },
        _ => {
            info!("unrecognized WM command '{}'; ignoring", trimmed);
            None
        }
    }
}

/// Encode one outbound command. Only a fixed vocabulary leaves the
/// process; anything else is a programmer error and is rejected here.
pub fn outbound_bytes(cmd: &str) -> Option<Vec<u8>> {
    let upper = cmd.to_uppercase();
    match upper.as_str() {
        "THEME-RELOAD" => Some(upper.into_bytes()),
        _ => {
            warn!("action '{}' unrecognized; ignoring", cmd);
            None
        }
    }
}

/// The duplex WM connection. The write half is shared so the reload
/// path can notify the WM while the reader task owns the read half.
pub struct WmLink {
    socket_path: PathBuf,
    writer: Mutex<Option<OwnedWriteHalf>>,
}

impl WmLink {
    pub fn new(socket_path: PathBuf) -> Arc<Self> {
        Arc::new(WmLink {
            socket_path,
            writer: Mutex::new(None),
        })
    }

    /// Dial the WM endpoint and process inbound commands until the
    /// connection dies. The dial retries forever; the bar runs degraded
    /// but alive until the endpoint exists.
    pub async fn run(self: Arc<Self>, manager: Arc<BarManager>) {
        let stream = dial(&self.socket_path).await;
        info!("connected to WM socket {}", self.socket_path.display());

        let (mut reader, writer) = stream.into_split();
        *self.writer.lock().await = Some(writer);

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            match reader.read(&mut buffer).await {
                Ok(0) => {
                    warn!("WM closed the socket; link is down until restart");
                    break;
                }
                Ok(n) => {
                    if let Some(WmCommand::ToggleBar(monitor)) = parse_command(&buffer[..n]) {
                        if let Err(e) = manager.toggle(monitor).await {
                            error!("{}", e);
                        }
                    }
                }
                Err(e) => {
                    error!("error reading WM socket: {}; link is down until restart", e);
                    break;
                }
            }
        }

        self.writer.lock().await.take();
    }

    /// Send one outbound command, if the link is up and the command is
    /// part of the vocabulary.
    pub async fn send(&self, cmd: &str) {
        let Some(bytes) = outbound_bytes(cmd) else {
            return;
        };

        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            warn!("WM link not connected, dropping '{}'", cmd);
            return;
        };

        if let Err(e) = writer.write_all(&bytes).await {
            error!("error sending '{}' to WM socket: {}", cmd, e);
        } else {
            info!("sent {} to WM", cmd);
        }
    }

    /// Tell the WM the theme changed, and poke the root window name so
    /// it redraws its own status immediately.
    pub async fn trigger_wm_reload(&self) {
        self.send("THEME-RELOAD").await;

        if let Err(e) = Command::new("xsetroot").args(["-name", ""]).status().await {
            warn!("xsetroot failed: {}", e);
        }
    }
}

/// Connect to the WM endpoint, retrying with a fixed short backoff until
/// it exists.
async fn dial(path: &Path) -> UnixStream {
    loop {
        match UnixStream::connect(path).await {
            Ok(stream) => return stream,
            Err(_) => sleep(DIAL_BACKOFF).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    #[test]
    fn test_parse_toggle_bar() {
        assert_eq!(
            parse_command(b"TOGGLE-BAR 1"),
            Some(WmCommand::ToggleBar(1))
        );
        // Case-insensitive command, NUL padding stripped.
        assert_eq!(
            parse_command(b"toggle-bar 0\0\0\0"),
            Some(WmCommand::ToggleBar(0))
        );
    }

    #[test]
    fn test_parse_malformed_toggle_bar() {
        assert_eq!(parse_command(b"TOGGLE-BAR"), None);
        assert_eq!(parse_command(b"TOGGLE-BAR abc"), None);
    }

    #[test]
    fn test_parse_unknown_command_ignored() {
        assert_eq!(parse_command(b"FOO-BAR 1"), None);
        assert_eq!(parse_command(b""), None);
    }

    #[test]
    fn test_outbound_vocabulary() {
        assert_eq!(outbound_bytes("theme-reload").unwrap(), b"THEME-RELOAD");
        assert!(outbound_bytes("SELF-DESTRUCT").is_none());
    }

    #[tokio::test]
    async fn test_unknown_command_keeps_link_and_bars_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wm.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let layout = crate::config::Layout {
            renderer: "sh".into(),
            renderer_args: vec!["-c".into(), "exec cat >/dev/null".into(), "cat".into()],
            ..crate::config::Layout::default()
        };
        let manager = BarManager::new(
            vec![crate::monitor::Monitor {
                index: 0,
                width: 1920,
                height: 1080,
            }],
            "user".into(),
            layout,
        );
        manager.redraw_all().await;

        let link = WmLink::new(path.clone());
        tokio::spawn(Arc::clone(&link).run(Arc::clone(&manager)));
        let (mut wm, _) = listener.accept().await.unwrap();

        // An unknown token must be swallowed: no bar touched, link alive.
        wm.write_all(b"FROB-BAR 0").await.unwrap();
        sleep(Duration::from_millis(150)).await;
        assert!(manager.is_visible(crate::bars::BarRole::Main, 0).await);
        assert!(manager.is_visible(crate::bars::BarRole::Left, 0).await);

        // The same connection still dispatches a real command afterwards.
        wm.write_all(b"TOGGLE-BAR 0").await.unwrap();
        let mut hidden = false;
        for _ in 0..50 {
            if !manager.is_visible(crate::bars::BarRole::Left, 0).await {
                hidden = true;
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        assert!(hidden, "toggle never applied after unknown command");

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_dial_retries_until_endpoint_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wm.sock");

        let dialer = {
            let path = path.clone();
            tokio::spawn(async move { dial(&path).await })
        };

        // Let the dialer spin against the missing endpoint first.
        sleep(Duration::from_millis(300)).await;
        let listener = UnixListener::bind(&path).unwrap();

        let stream = tokio::time::timeout(Duration::from_secs(2), dialer)
            .await
            .expect("dial never completed")
            .unwrap();
        drop(stream);
        drop(listener);
    }
}
