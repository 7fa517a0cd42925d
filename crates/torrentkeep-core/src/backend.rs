//! Pluggable downloader backend interface.

use async_trait::async_trait;

use crate::error::{TorrentError, TorrentResult};
use crate::model::{BackendFile, TorrentAction, TorrentView};

/// Uniform interface implemented by each supported downloader.
///
/// Adapters normalize their native wire format into [`TorrentView`] and
/// translate [`TorrentAction`] into the backend's own removal calls.
#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Stable name used in logs and metrics labels.
    fn name(&self) -> &str;

    /// Fetch the current snapshot of every torrent known to the backend.
    async fn list_torrents(&self) -> TorrentResult<Vec<TorrentView>>;

    /// Pause a torrent; default implementation reports lack of support.
    async fn pause(&self, id: &str) -> TorrentResult<()> {
        let _ = id;
        Err(TorrentError::Unsupported { operation: "pause" })
    }

    /// Remove a torrent from the backend, honoring the requested action.
    ///
    /// `TorrentAction::Pause` is rejected here; callers dispatch pause
    /// through [`Self::pause`] instead.
    async fn remove(&self, id: &str, action: TorrentAction) -> TorrentResult<()> {
        let _ = (id, action);
        Err(TorrentError::Unsupported { operation: "remove" })
    }

    /// Free disk space available under the given path, in bytes.
    async fn free_space_bytes(&self, path: &str) -> TorrentResult<u64> {
        let _ = path;
        Err(TorrentError::Unsupported {
            operation: "free_space_bytes",
        })
    }

    /// List the constituent files of a torrent and their download priority.
    ///
    /// Not exercised by the removal engine's selection or dispatch logic;
    /// carried for interface parity with the host's broader file-priority
    /// surface.
    async fn get_files(&self, id: &str) -> TorrentResult<Vec<BackendFile>> {
        let _ = id;
        Err(TorrentError::Unsupported { operation: "get_files" })
    }

    /// Set the download priority of a subset of a torrent's files.
    async fn set_files(&self, id: &str, file_ids: &[String], priority: u8) -> TorrentResult<()> {
        let _ = (id, file_ids, priority);
        Err(TorrentError::Unsupported { operation: "set_files" })
    }

    /// Resume torrents previously paused or stopped.
    async fn start_torrents(&self, ids: &[String]) -> TorrentResult<()> {
        let _ = ids;
        Err(TorrentError::Unsupported {
            operation: "start_torrents",
        })
    }

    /// Force-start torrents, bypassing queueing limits.
    async fn force_start(&self, ids: &[String]) -> TorrentResult<()> {
        let _ = ids;
        Err(TorrentError::Unsupported {
            operation: "force_start",
        })
    }

    /// Whether the backend itself reports as inactive (e.g. paused globally).
    async fn is_inactive(&self) -> TorrentResult<bool> {
        Ok(false)
    }
}

/// Capability consumed only by the downloader-API HTTP surface (the
/// `GET /download_torrent_notest` route), not by the removal engine: add a
/// torrent by URL tagged with a caller-chosen label, then look up the
/// backend-assigned hash by that same label once the add has settled.
#[async_trait]
pub trait TorrentInjector: Send + Sync {
    /// Add a torrent from `url`, tagging it with `tag` so it can be found
    /// again before its hash is otherwise known.
    async fn add_by_url(&self, url: &str, tag: &str) -> TorrentResult<()>;

    /// Look up the backend-assigned hash of the torrent carrying `tag`, if
    /// the backend has finished registering it.
    async fn find_hash_by_tag(&self, tag: &str) -> TorrentResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubBackend;

    #[async_trait]
    impl DownloaderBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        async fn list_torrents(&self) -> TorrentResult<Vec<TorrentView>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn default_methods_report_unsupported() {
        let backend = StubBackend;
        assert!(backend.pause("id").await.is_err());
        assert!(backend.remove("id", TorrentAction::Delete).await.is_err());
        assert!(backend.free_space_bytes("/data").await.is_err());
    }
}
