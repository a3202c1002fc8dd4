use crate::indexer::{PbIndex, STATE_DIR_NAME};
use crate::stats::RefreshReport;
use crate::{IndexError, Result};
use log::{error, warn};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::time;

#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    /// Quiet period after the last event before a refresh runs.
    pub debounce: Duration,
    /// Ceiling on how long a steady stream of events can delay a refresh.
    pub max_batch_wait: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(750),
            max_batch_wait: Duration::from_secs(5),
        }
    }
}

/// Filesystem watcher that keeps a [`PbIndex`] in line with its directory.
///
/// Events on `.pb` files are debounced into incremental refreshes; each
/// completed refresh is published to subscribers.
pub struct CorpusWatcher {
    update_tx: broadcast::Sender<RefreshReport>,
    shutdown_tx: mpsc::Sender<()>,
    _watcher: RecommendedWatcher,
}

impl CorpusWatcher {
    pub fn start(index: Arc<PbIndex>, config: WatcherConfig) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (update_tx, _) = broadcast::channel(16);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            NotifyConfig::default(),
        )
        .map_err(|err| IndexError::Watch(format!("watcher init failed: {err}")))?;
        watcher
            .watch(index.dir(), RecursiveMode::NonRecursive)
            .map_err(|err| IndexError::Watch(format!("watch {}: {err}", index.dir().display())))?;

        spawn_refresh_loop(index, config, event_rx, shutdown_rx, update_tx.clone());

        Ok(Self {
            update_tx,
            shutdown_tx,
            _watcher: watcher,
        })
    }

    /// Receive the report of every refresh the watcher runs.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshReport> {
        self.update_tx.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

fn spawn_refresh_loop(
    index: Arc<PbIndex>,
    config: WatcherConfig,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut shutdown_rx: mpsc::Receiver<()>,
    update_tx: broadcast::Sender<RefreshReport>,
) {
    tokio::spawn(async move {
        let mut state = DebounceState::new(config.debounce, config.max_batch_wait);

        loop {
            let deadline = state.next_deadline();

            tokio::select! {
                Some(event) = event_rx.recv() => {
                    handle_event(event, &mut state);
                }
                _ = shutdown_rx.recv() => break,
                () = async {
                    if let Some(deadline) = deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if deadline.is_some() => {
                    match index.refresh(false).await {
                        Ok(report) => {
                            let _ = update_tx.send(report);
                        }
                        Err(err) => error!("watcher refresh failed: {err}"),
                    }
                    state.reset();
                }
            }
        }
    });
}

fn handle_event(event: notify::Result<Event>, state: &mut DebounceState) {
    match event {
        Ok(event) => {
            if event.paths.is_empty() || event.paths.iter().any(|p| is_relevant_path(p)) {
                state.record_event();
            }
        }
        Err(err) => warn!("watcher error: {err}"),
    }
}

fn is_relevant_path(path: &Path) -> bool {
    if path
        .components()
        .any(|c| c.as_os_str() == STATE_DIR_NAME)
    {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pb"))
}

struct DebounceState {
    debounce: Duration,
    max_batch: Duration,
    last_event: Option<Instant>,
    first_event: Option<Instant>,
}

impl DebounceState {
    fn new(debounce: Duration, max_batch: Duration) -> Self {
        Self {
            debounce,
            max_batch,
            last_event: None,
            first_event: None,
        }
    }

    fn record_event(&mut self) {
        let now = Instant::now();
        self.last_event = Some(now);
        self.first_event.get_or_insert(now);
    }

    fn next_deadline(&self) -> Option<time::Instant> {
        let last = self.last_event?;
        let mut deadline = last + self.debounce;
        if let Some(first) = self.first_event {
            deadline = deadline.min(first + self.max_batch);
        }
        Some(time::Instant::from_std(deadline))
    }

    fn reset(&mut self) {
        self.last_event = None;
        self.first_event = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn only_pb_files_are_relevant() {
        assert!(is_relevant_path(&PathBuf::from("dir/katowice_2024.pb")));
        assert!(!is_relevant_path(&PathBuf::from("dir/notes.txt")));
        assert!(!is_relevant_path(&PathBuf::from(
            "dir/.pb-atlas/index.json"
        )));
    }

    #[test]
    fn debounce_waits_for_quiet() {
        let mut state = DebounceState::new(Duration::from_millis(100), Duration::from_secs(1));
        assert!(state.next_deadline().is_none());
        state.record_event();
        assert!(state.next_deadline().is_some());
        state.reset();
        assert!(state.next_deadline().is_none());
    }
}
