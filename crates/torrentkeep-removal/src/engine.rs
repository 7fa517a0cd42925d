//! The torrent removal engine: selection, cross-seed expansion, and action
//! dispatch over a set of downloader backends.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use systemstat::{Platform, System};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use torrentkeep_config::{RemovalAction, RemovalConfig, RemovalMode};
use torrentkeep_core::{DownloaderBackend, TorrentAction, TorrentView};
use torrentkeep_events::{Event, EventBus};
use torrentkeep_telemetry::Metrics;
use tracing::{info, instrument, warn};

use crate::error::RemovalResult;
use crate::predicates;
use crate::strategy;

/// Fixed debounce window between the last qualifying event and the next
/// removal pass.
const DEBOUNCE_DELAY: Duration = Duration::from_secs(5);

fn to_torrent_action(action: RemovalAction) -> TorrentAction {
    match action {
        RemovalAction::Pause => TorrentAction::Pause,
        RemovalAction::Delete => TorrentAction::Delete,
        RemovalAction::DeleteFiles => TorrentAction::DeleteFiles,
    }
}

fn action_label(action: RemovalAction) -> &'static str {
    match action {
        RemovalAction::Pause => "pause",
        RemovalAction::Delete => "delete",
        RemovalAction::DeleteFiles => "deletefile",
    }
}

/// Coordinates debounced, cooperatively-cancellable removal passes across a
/// fixed set of downloader backends.
pub struct RemovalEngine {
    config: RemovalConfig,
    backends: Vec<Arc<dyn DownloaderBackend>>,
    events: EventBus,
    metrics: Metrics,
    running: Arc<Mutex<()>>,
    cancelled: Arc<AtomicBool>,
    debounce_task: Mutex<Option<JoinHandle<()>>>,
}

impl RemovalEngine {
    /// Construct a new engine bound to the given backends.
    #[must_use]
    pub fn new(
        config: RemovalConfig,
        backends: Vec<Arc<dyn DownloaderBackend>>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            backends,
            events,
            metrics,
            running: Arc::new(Mutex::new(())),
            cancelled: Arc::new(AtomicBool::new(false)),
            debounce_task: Mutex::new(None),
        }
    }

    /// Request that any in-flight (or about-to-run) pass stop issuing further
    /// backend actions. The current torrent's action, if already dispatched,
    /// still completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Arm (or re-arm) the debounce timer: cancel any pending scheduled pass
    /// and schedule a new one [`DEBOUNCE_DELAY`] from now. A single timer
    /// task is reused across events rather than spawning one per event.
    pub async fn on_event(self: &Arc<Self>) {
        self.rearm(DEBOUNCE_DELAY).await;
    }

    /// Schedule a single one-shot pass after the fixed `onlyonce` delay.
    pub async fn schedule_onlyonce(self: &Arc<Self>, delay: Duration) {
        self.rearm(delay).await;
    }

    async fn rearm(self: &Arc<Self>, delay: Duration) {
        let mut slot = self.debounce_task.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        let engine = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = engine.run_once().await {
                warn!(error = %err, "debounced removal pass failed to start");
            }
        }));
    }

    /// Run one selection-and-dispatch pass against every configured backend.
    ///
    /// Safe to call concurrently: contending callers serialize on the
    /// engine's own lock rather than running interleaved passes.
    #[instrument(skip(self), fields(backends = self.backends.len()))]
    pub async fn run_once(&self) -> RemovalResult<()> {
        let _guard = self.running.lock().await;
        self.cancelled.store(false, Ordering::SeqCst);
        self.metrics.inc_removal_pass();

        for backend in &self.backends {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            self.run_backend_pass(backend.as_ref()).await;
        }
        Ok(())
    }

    async fn run_backend_pass(&self, backend: &dyn DownloaderBackend) {
        let name = backend.name().to_string();
        self.events.publish(Event::RemovalPassStarted { backend: name.clone() });

        let started = Instant::now();
        let torrents = match backend.list_torrents().await {
            Ok(torrents) => torrents,
            Err(err) => {
                warn!(backend = %name, error = %err, "listing torrents failed; skipping backend this pass");
                self.events.publish(Event::RemovalPassCompleted {
                    backend: name,
                    actioned: 0,
                });
                return;
            }
        };

        let selected = self.select(&torrents).await;
        self.metrics
            .observe_removal_selection_duration(started.elapsed());

        let mut actioned = 0_u64;
        let action = to_torrent_action(self.config.action);
        for view in &selected {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            match backend.remove(&view.id, action).await {
                Ok(()) => {
                    actioned += 1;
                    self.metrics.inc_torrents_removed(&name, action_label(self.config.action));
                    self.events.publish(Event::PluginAction {
                        backend: name.clone(),
                        torrent_id: view.id.clone(),
                        name: view.name.clone(),
                        action: action_label(self.config.action).to_string(),
                    });
                    info!(
                        backend = %name,
                        torrent = %view.name,
                        site = %view.site,
                        size_bytes = view.size,
                        "removed torrent"
                    );
                }
                Err(err) => {
                    warn!(
                        backend = %name,
                        torrent_id = %view.id,
                        error = %err,
                        "action failed for torrent; continuing with remaining selection"
                    );
                }
            }
        }

        self.events.publish(Event::RemovalPassCompleted {
            backend: name,
            actioned,
        });
    }

    async fn select(&self, torrents: &[TorrentView]) -> Vec<TorrentView> {
        let mut selected_ids = match &self.config.mode {
            RemovalMode::Condition { connector, predicates: predicate_set } => torrents
                .iter()
                .filter(|view| predicates::evaluate(view, *connector, predicate_set))
                .map(|view| view.id.clone())
                .collect::<Vec<_>>(),
            RemovalMode::Strategy(policy) => {
                let sorted = strategy::sort_by_action(torrents.to_vec(), policy.strategy_action);
                let ids = if policy.freespace_gib.is_some() {
                    let free_bytes = self.detect_free_bytes(policy.freespace_path.as_deref()).await;
                    strategy::select_by_freespace(&sorted, policy, free_bytes, self.config.cross_seed)
                } else if policy.maximum_count_seeds.is_some() {
                    strategy::select_by_maximum_count(&sorted, policy, self.config.cross_seed)
                } else {
                    strategy::select_by_maximum_size(&sorted, policy, self.config.cross_seed)
                };
                ids.into_iter().collect::<Vec<_>>()
            }
        };

        if self.config.cross_seed {
            expand_cross_seed(torrents, &mut selected_ids);
        }

        torrents
            .iter()
            .filter(|view| selected_ids.contains(&view.id))
            .cloned()
            .collect()
    }

    async fn detect_free_bytes(&self, path: Option<&str>) -> u64 {
        let Some(path) = path else { return 0 };
        let system = System::new();
        match system.mount_at(path) {
            Ok(mount) => mount.avail.as_u64(),
            Err(err) => {
                warn!(path, error = %err, "failed to read free disk space; treating as zero");
                0
            }
        }
    }
}

/// Union in every cross-seeded sibling (same name and size) of an already
/// selected torrent, using an index built over every torrent visited this
/// pass. Expansion can add torrents that would not themselves satisfy the
/// selection criteria.
fn expand_cross_seed(torrents: &[TorrentView], selected_ids: &mut Vec<String>) {
    let mut groups: HashMap<(String, u64), Vec<&TorrentView>> = HashMap::new();
    for view in torrents {
        groups.entry(view.cross_seed_key()).or_default().push(view);
    }

    let selected_keys: Vec<(String, u64)> = torrents
        .iter()
        .filter(|view| selected_ids.contains(&view.id))
        .map(TorrentView::cross_seed_key)
        .collect();

    for key in selected_keys {
        if let Some(members) = groups.get(&key) {
            for member in members {
                if !selected_ids.contains(&member.id) {
                    selected_ids.push(member.id.clone());
                }
            }
        }
    }
}
