use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use super::{TaskRegistry, render_table};
use crate::console::Console;

const DEFAULT_WIDTH: usize = 100;

enum Wake {
    Changed,
    Stop,
}

/// Live task table pinned below the log output on stderr.
///
/// Redraws on a fixed interval and whenever the registry reports a change.
pub struct StatusBoard {
    tx: Sender<Wake>,
    handle: Option<JoinHandle<()>>,
    console: Arc<Console>,
}

impl StatusBoard {
    pub fn start(registry: &Arc<TaskRegistry>, refresh: Duration) -> io::Result<Self> {
        Self::start_with(registry, refresh, terminal_width(), Console::stderr())
    }

    fn start_with(
        registry: &Arc<TaskRegistry>,
        refresh: Duration,
        width: usize,
        console: Arc<Console>,
    ) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let notify = tx.clone();
        registry.on_change(move || {
            let _ = notify.send(Wake::Changed);
        });

        let registry = Arc::clone(registry);
        let out = Arc::clone(&console);
        let handle = thread::Builder::new()
            .name("status-board".to_string())
            .spawn(move || {
                loop {
                    let frame = render_table(&registry.snapshot(), Utc::now(), width);
                    if let Err(e) = out.pin(&frame) {
                        out.unpin();
                        warn!(error = %e, "status board write failed; stopping refresh");
                        return;
                    }
                    match rx.recv_timeout(refresh) {
                        Ok(Wake::Changed) | Err(RecvTimeoutError::Timeout) => {}
                        Ok(Wake::Stop) | Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            })?;

        Ok(Self {
            tx,
            handle: Some(handle),
            console,
        })
    }

    /// Stop refreshing and give the cursor back. Safe to call twice.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.tx.send(Wake::Stop);
        let _ = handle.join();
        self.console.unpin();
    }
}

impl Drop for StatusBoard {
    fn drop(&mut self) {
        self.stop();
    }
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse().ok())
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WIDTH)
}
