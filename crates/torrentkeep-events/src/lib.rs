#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]
#![allow(unexpected_cfgs)]

//! Typed event bus shared by the removal engine and the materializer.
//!
//! Built on `tokio::broadcast` with a bounded in-memory replay ring so late
//! subscribers (e.g. a debounce task that starts mid-pass) can catch up on
//! recently emitted events instead of missing them entirely.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::error;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced by the removal engine and the materializer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new torrent became visible on a backend.
    DownloadAdded {
        /// Backend name that reported the torrent.
        backend: String,
        /// Backend-assigned torrent identifier.
        torrent_id: String,
        /// Display name of the torrent.
        name: String,
    },
    /// A removal pass began evaluating a backend's torrent set.
    RemovalPassStarted {
        /// Backend name being evaluated.
        backend: String,
    },
    /// The removal engine dispatched an action against a torrent.
    PluginAction {
        /// Backend name the action was dispatched against.
        backend: String,
        /// Backend-assigned torrent identifier.
        torrent_id: String,
        /// Display name of the torrent.
        name: String,
        /// Action that was dispatched.
        action: String,
    },
    /// A removal pass finished.
    RemovalPassCompleted {
        /// Backend name that was evaluated.
        backend: String,
        /// Number of torrents acted upon.
        actioned: u64,
    },
    /// A materializer traversal run began.
    MaterializerRunStarted {
        /// Traversal root path on the remote tree.
        root: String,
    },
    /// A remote entry was materialized into a local shortcut or download.
    EntryMaterialized {
        /// Remote path that was materialized.
        remote_path: String,
        /// Local path that was written.
        local_path: String,
    },
    /// Garbage collection removed a stale local artifact.
    GcEntryRemoved {
        /// Local path that was removed.
        local_path: String,
    },
    /// A materializer traversal run finished.
    MaterializerRunCompleted {
        /// Number of entries materialized during the run.
        materialized: u64,
        /// Number of entries removed by garbage collection.
        collected: u64,
    },
    /// Configuration update was applied.
    SettingsChanged {
        /// Description of the applied configuration change.
        description: String,
    },
    /// System health status changed (degraded or restored components).
    HealthChanged {
        /// Components currently considered degraded.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for transport framing and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DownloadAdded { .. } => "download_added",
            Self::RemovalPassStarted { .. } => "removal_pass_started",
            Self::PluginAction { .. } => "plugin_action",
            Self::RemovalPassCompleted { .. } => "removal_pass_completed",
            Self::MaterializerRunStarted { .. } => "materializer_run_started",
            Self::EntryMaterialized { .. } => "entry_materialized",
            Self::GcEntryRemoved { .. } => "gc_entry_removed",
            Self::MaterializerRunCompleted { .. } => "materializer_run_completed",
            Self::SettingsChanged { .. } => "settings_changed",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    #[must_use]
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.lock_buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.lock_buffer();
            for item in buffer.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_buffer().back().map(|event| event.id)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("event buffer mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from the
/// live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_action_event(i: usize) -> Event {
        Event::PluginAction {
            backend: "qbittorrent".into(),
            torrent_id: format!("hash-{i}"),
            name: format!("Example.S01E0{i}"),
            action: "delete".into(),
        }
    }

    #[test]
    fn event_kinds_cover_all_variants() {
        let events = [
            Event::DownloadAdded {
                backend: "qbittorrent".into(),
                torrent_id: "a".into(),
                name: "demo".into(),
            },
            Event::RemovalPassStarted {
                backend: "qbittorrent".into(),
            },
            sample_action_event(0),
            Event::RemovalPassCompleted {
                backend: "qbittorrent".into(),
                actioned: 1,
            },
            Event::MaterializerRunStarted { root: "/".into() },
            Event::EntryMaterialized {
                remote_path: "/movies/a.mkv".into(),
                local_path: "/strm/movies/a.strm".into(),
            },
            Event::GcEntryRemoved {
                local_path: "/strm/movies/old.strm".into(),
            },
            Event::MaterializerRunCompleted {
                materialized: 1,
                collected: 1,
            },
            Event::SettingsChanged {
                description: "updated".into(),
            },
            Event::HealthChanged {
                degraded: vec!["backend".into()],
            },
        ];

        let expected = [
            "download_added",
            "removal_pass_started",
            "plugin_action",
            "removal_pass_completed",
            "materializer_run_started",
            "entry_materialized",
            "gc_entry_removed",
            "materializer_run_completed",
            "settings_changed",
            "health_changed",
        ];

        for (event, kind) in events.iter().zip(expected) {
            assert_eq!(event.kind(), kind);
        }
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(sample_action_event(i));
        }
        assert_eq!(last_id, 5);

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event);
            }
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received.first().unwrap().id, 3);
        assert_eq!(received.last().unwrap().id, 5);
    }

    #[tokio::test]
    async fn last_event_id_reflects_recent_publish() {
        let bus = EventBus::with_capacity(2);
        assert!(bus.last_event_id().is_none(), "no events published yet");
        let published = bus.publish(sample_action_event(0));
        assert_eq!(bus.last_event_id(), Some(published));
    }

    #[tokio::test]
    async fn stream_returns_none_after_sender_dropped() {
        let mut stream = {
            let bus = EventBus::with_capacity(1);
            let stream = bus.subscribe(None);
            drop(bus);
            stream
        };
        assert!(
            stream.next().await.is_none(),
            "closing the sender should end the stream"
        );
    }
}
