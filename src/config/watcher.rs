//! Hot reload of the route configuration.
//!
//! Watches the config file and pushes every successfully reloaded
//! [`GatewayConfig`] over an unbounded channel. The consumer (the HTTP
//! server's reload task) compiles and publishes the new route table; an
//! invalid edit is logged and the current table keeps serving.
//!
//! Editors commonly fire several filesystem events per save (truncate,
//! write, rename), so reloads within a short window are collapsed into one.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Events closer together than this trigger a single reload.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Watches the configuration file and emits reloaded configs.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver its reloads arrive on.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned [`RecommendedWatcher`] must be kept
    /// alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let mut last_reload: Option<Instant> = None;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !is_relevant(&event) {
                    return;
                }
                if !outside_debounce_window(&mut last_reload, DEBOUNCE_WINDOW) {
                    tracing::debug!("Config change within debounce window, skipping");
                    return;
                }

                tracing::info!(path = ?path, "Config file changed, reloading routes");
                match load_config(&path) {
                    Ok(new_config) => {
                        let _ = tx.send(new_config);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Config reload failed, keeping current routes");
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Only content changes matter; metadata and access events are ignored.
fn is_relevant(event: &Event) -> bool {
    event.kind.is_modify() || event.kind.is_create()
}

/// Records `now` and reports whether enough time passed since the last
/// accepted event to reload again.
fn outside_debounce_window(last: &mut Option<Instant>, window: Duration) -> bool {
    let now = Instant::now();
    match *last {
        Some(prev) if now.duration_since(prev) < window => false,
        _ => {
            *last = Some(now);
            true
        }
    }
}
