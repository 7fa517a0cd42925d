//! Backend-agnostic torrent view and action types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which downloader family produced a [`TorrentView`].
///
/// Field-mapping semantics differ per backend (date fallback, upload-speed
/// derivation, tracker placeholder strings); the removal engine itself never
/// branches on this, but adapters use it to tag provenance for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// qBittorrent Web API-style backend.
    QBittorrent,
    /// Transmission RPC-style backend.
    Transmission,
}

/// Normalized, backend-agnostic snapshot of a single torrent.
///
/// Every field participates in the behavioral fingerprint used for equality
/// and cross-seed grouping: two views are equal only if every field that can
/// influence a removal decision matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentView {
    /// Backend-assigned identifier (info hash or backend-local id string).
    pub id: String,
    /// Which backend produced this view.
    pub backend: BackendKind,
    /// Display name of the torrent.
    pub name: String,
    /// Total size in bytes.
    pub size: u64,
    /// Fractional completion in `[0.0, 1.0]`.
    pub progress: f64,
    /// Upload/download ratio as reported or derived from the backend.
    pub ratio: f64,
    /// Upload speed in KiB/s.
    pub upspeed: f64,
    /// Download speed in KiB/s.
    pub downspeed: f64,
    /// Time the torrent was added to the backend.
    pub date_added: DateTime<Utc>,
    /// Time the torrent finished downloading (falls back to `date_added`
    /// when the backend reports no completion time).
    pub date_done: DateTime<Utc>,
    /// Total seconds spent seeding.
    pub seeding_time: i64,
    /// Sanitized tracker announce URLs (DHT/PeX/LSD pseudo-trackers removed).
    pub trackers: Vec<String>,
    /// Second-level domain of the primary tracker, or backend-reported site name.
    pub site: String,
    /// Backend category/label.
    pub category: String,
    /// Free-form tags attached to the torrent.
    pub tags: Vec<String>,
    /// Absolute save path on the backend host.
    pub save_path: String,
    /// Current lifecycle state as reported by the backend.
    pub state: TorrentState,
    /// Backend-reported error message, empty when the torrent has none.
    ///
    /// Only Transmission populates this; qBittorrent adapters always report
    /// an empty string.
    pub error: String,
}

impl TorrentView {
    /// Whether the torrent has finished downloading.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Key used to group cross-seeded duplicates: same name and size.
    #[must_use]
    pub fn cross_seed_key(&self) -> (String, u64) {
        (self.name.clone(), self.size)
    }
}

/// Lifecycle state reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Actively downloading.
    Downloading,
    /// Actively seeding.
    Seeding,
    /// Paused by the user or the engine.
    Paused,
    /// Stalled, errored, or otherwise inactive.
    Other,
}

/// Action dispatched against a torrent by the removal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentAction {
    /// Pause the torrent; keep on-disk data and backend metadata.
    Pause,
    /// Remove the torrent from the backend but keep on-disk data.
    Delete,
    /// Remove the torrent and its on-disk data.
    DeleteFiles,
}

/// A single constituent file of a torrent, as reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendFile {
    /// Backend-local file index or identifier.
    pub id: String,
    /// Relative file name within the torrent.
    pub name: String,
    /// Backend-reported download priority.
    pub priority: u8,
    /// Fractional completion in `[0.0, 1.0]`.
    pub progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TorrentView {
        TorrentView {
            id: "abc".into(),
            backend: BackendKind::QBittorrent,
            name: "Example.Movie.2024".into(),
            size: 1_000,
            progress: 1.0,
            ratio: 2.0,
            upspeed: 0.0,
            downspeed: 0.0,
            date_added: Utc::now(),
            date_done: Utc::now(),
            seeding_time: 3600,
            trackers: vec!["https://tracker.example.com/announce".into()],
            site: "example.com".into(),
            category: "movies".into(),
            tags: vec![],
            save_path: "/data/movies".into(),
            state: TorrentState::Seeding,
            error: String::new(),
        }
    }

    #[test]
    fn is_complete_uses_progress_threshold() {
        let mut view = sample();
        assert!(view.is_complete());
        view.progress = 0.99;
        assert!(!view.is_complete());
    }

    #[test]
    fn cross_seed_key_uses_name_and_size() {
        let view = sample();
        assert_eq!(view.cross_seed_key(), (view.name.clone(), view.size));
    }
}
