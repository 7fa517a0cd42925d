//! qBittorrent Web API adapter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use torrentkeep_core::{
    BackendKind, DownloaderBackend, TorrentAction, TorrentError, TorrentInjector, TorrentResult,
    TorrentState, TorrentView,
};

use crate::site::{sanitize_trackers, second_level_domain};

/// Connection details and HTTP client for a single qBittorrent instance.
pub struct QbBackend {
    name: String,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct QbTorrent {
    hash: String,
    name: String,
    size: i64,
    progress: f64,
    ratio: f64,
    uploaded: i64,
    dlspeed: i64,
    added_on: i64,
    completion_on: i64,
    category: String,
    tags: String,
    save_path: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct QbTracker {
    url: String,
}

impl QbBackend {
    /// Construct an adapter for the given instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> TorrentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .build()
            .map_err(|err| TorrentError::OperationFailed {
                operation: "build_client",
                torrent_id: None,
                source: Box::new(err),
            })?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            username,
            password,
            client,
        })
    }

    async fn authenticate(&self) -> TorrentResult<()> {
        let Some(username) = self.username.as_deref() else {
            return Ok(());
        };
        let password = self.password.as_deref().unwrap_or_default();
        let url = format!("{}/api/v2/auth/login", self.base_url);
        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|err| Self::operation_failed("login", None, err))?;
        if !response.status().is_success() {
            return Err(TorrentError::OperationFailed {
                operation: "login",
                torrent_id: None,
                source: format!("qBittorrent login returned status {}", response.status()).into(),
            });
        }
        Ok(())
    }

    fn operation_failed(
        operation: &'static str,
        torrent_id: Option<String>,
        source: reqwest::Error,
    ) -> TorrentError {
        TorrentError::OperationFailed {
            operation,
            torrent_id,
            source: Box::new(source),
        }
    }

    async fn trackers_for(&self, hash: &str) -> Vec<String> {
        let url = format!("{}/api/v2/torrents/trackers", self.base_url);
        let Ok(response) = self.client.get(url).query(&[("hash", hash)]).send().await else {
            return Vec::new();
        };
        let Ok(trackers) = response.json::<Vec<QbTracker>>().await else {
            return Vec::new();
        };
        sanitize_trackers(trackers.into_iter().map(|tracker| tracker.url))
    }

    #[allow(clippy::cast_precision_loss)]
    fn to_view(torrent: QbTorrent, trackers: Vec<String>) -> TorrentView {
        let date_added = timestamp_to_utc(torrent.added_on);
        let date_done = if torrent.completion_on > 0 {
            timestamp_to_utc(torrent.completion_on)
        } else {
            date_added
        };
        let site = trackers
            .first()
            .map(|url| second_level_domain(url))
            .unwrap_or_default();
        let state = map_state(&torrent.state);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let size = torrent.size.max(0) as u64;
        let seeding_time = (Utc::now() - date_done).num_seconds().max(0);
        let uploaded = torrent.uploaded.max(0) as f64;
        let upspeed = if seeding_time > 0 {
            uploaded / seeding_time as f64 / 1024.0
        } else {
            0.0
        };
        TorrentView {
            id: torrent.hash,
            backend: BackendKind::QBittorrent,
            name: torrent.name,
            size,
            progress: torrent.progress,
            ratio: torrent.ratio,
            upspeed,
            downspeed: torrent.dlspeed as f64 / 1024.0,
            date_added,
            date_done,
            seeding_time,
            trackers,
            site,
            category: torrent.category,
            tags: torrent
                .tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(String::from)
                .collect(),
            save_path: torrent.save_path,
            state,
            error: String::new(),
        }
    }
}

fn timestamp_to_utc(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or(Utc::now())
}

fn map_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "stalledDL" | "forcedDL" | "queuedDL" | "metaDL" | "allocating" => {
            TorrentState::Downloading
        }
        "uploading" | "stalledUP" | "forcedUP" | "queuedUP" => TorrentState::Seeding,
        "pausedDL" | "pausedUP" => TorrentState::Paused,
        _ => TorrentState::Other,
    }
}

#[async_trait]
impl DownloaderBackend for QbBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_torrents(&self) -> TorrentResult<Vec<TorrentView>> {
        self.authenticate().await?;
        let url = format!("{}/api/v2/torrents/info", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| Self::operation_failed("list_torrents", None, err))?;
        let torrents: Vec<QbTorrent> = response
            .json()
            .await
            .map_err(|err| Self::operation_failed("list_torrents", None, err))?;
        let mut views = Vec::with_capacity(torrents.len());
        for torrent in torrents {
            let trackers = self.trackers_for(&torrent.hash).await;
            views.push(Self::to_view(torrent, trackers));
        }
        Ok(views)
    }

    async fn pause(&self, id: &str) -> TorrentResult<()> {
        self.authenticate().await?;
        let url = format!("{}/api/v2/torrents/pause", self.base_url);
        self.client
            .post(url)
            .form(&[("hashes", id)])
            .send()
            .await
            .map_err(|err| Self::operation_failed("pause", Some(id.to_string()), err))?;
        Ok(())
    }

    async fn remove(&self, id: &str, action: TorrentAction) -> TorrentResult<()> {
        if action == TorrentAction::Pause {
            return self.pause(id).await;
        }
        self.authenticate().await?;
        let delete_files = action == TorrentAction::DeleteFiles;
        let url = format!("{}/api/v2/torrents/delete", self.base_url);
        self.client
            .post(url)
            .form(&[
                ("hashes", id.to_string()),
                ("deleteFiles", delete_files.to_string()),
            ])
            .send()
            .await
            .map_err(|err| Self::operation_failed("remove", Some(id.to_string()), err))?;
        Ok(())
    }
}

#[async_trait]
impl TorrentInjector for QbBackend {
    async fn add_by_url(&self, url: &str, tag: &str) -> TorrentResult<()> {
        self.authenticate().await?;
        let add_url = format!("{}/api/v2/torrents/add", self.base_url);
        self.client
            .post(add_url)
            .form(&[("urls", url), ("tags", tag)])
            .send()
            .await
            .map_err(|err| Self::operation_failed("add_by_url", None, err))?;
        Ok(())
    }

    async fn find_hash_by_tag(&self, tag: &str) -> TorrentResult<Option<String>> {
        self.authenticate().await?;
        let url = format!("{}/api/v2/torrents/info", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&[("tag", tag)])
            .send()
            .await
            .map_err(|err| Self::operation_failed("find_hash_by_tag", None, err))?;
        let torrents: Vec<QbTorrent> = response
            .json()
            .await
            .map_err(|err| Self::operation_failed("find_hash_by_tag", None, err))?;
        Ok(torrents.into_iter().next().map(|torrent| torrent.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_state_groups_qb_states() {
        assert_eq!(map_state("downloading"), TorrentState::Downloading);
        assert_eq!(map_state("uploading"), TorrentState::Seeding);
        assert_eq!(map_state("pausedUP"), TorrentState::Paused);
        assert_eq!(map_state("error"), TorrentState::Other);
    }

    #[test]
    fn to_view_falls_back_to_added_on_when_not_complete() {
        let torrent = QbTorrent {
            hash: "abc".into(),
            name: "Example".into(),
            size: 100,
            progress: 0.5,
            ratio: 0.0,
            uploaded: 1_048_576,
            dlspeed: 0,
            added_on: 1_700_000_000,
            completion_on: -1,
            category: String::new(),
            tags: "a, b".into(),
            save_path: "/data".into(),
            state: "downloading".into(),
        };
        let view = QbBackend::to_view(torrent, vec!["https://tracker.example.com/announce".into()]);
        assert_eq!(view.date_done, view.date_added);
        assert_eq!(view.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(view.site, "example.com");
    }
}
