//! Transmission RPC adapter.
//!
//! Transmission requires an `X-Transmission-Session-Id` header on every
//! request after the first; a stale or missing header yields HTTP 409 with
//! the current value, which callers must retry once with.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use torrentkeep_core::{
    BackendKind, DownloaderBackend, TorrentAction, TorrentError, TorrentInjector, TorrentResult,
    TorrentState, TorrentView,
};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Connection details and HTTP client for a single Transmission instance.
pub struct TrBackend {
    name: String,
    rpc_url: String,
    username: Option<String>,
    password: Option<String>,
    client: Client,
    session_id: Arc<RwLock<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct TrTracker {
    announce: String,
    #[serde(default)]
    sitename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrTorrent {
    #[serde(rename = "hashString")]
    hash_string: String,
    name: String,
    #[serde(rename = "totalSize")]
    total_size: i64,
    #[serde(rename = "percentDone")]
    percent_done: f64,
    #[serde(rename = "uploadRatio")]
    ratio: f64,
    #[serde(rename = "addedDate")]
    added_date: i64,
    #[serde(rename = "doneDate")]
    done_date: i64,
    #[serde(rename = "downloadDir")]
    download_dir: String,
    trackers: Vec<TrTracker>,
    #[serde(rename = "errorString")]
    error_string: String,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    arguments: Value,
    result: String,
}

#[derive(Debug, Deserialize)]
struct TrTorrentLabels {
    #[serde(rename = "hashString")]
    hash_string: String,
    #[serde(default)]
    labels: Vec<String>,
}

impl TrBackend {
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
            .build()
            .map_err(|err| TorrentError::OperationFailed {
                operation: "build_client",
                torrent_id: None,
                source: Box::new(err),
            })?;
        let base_url = base_url.into();
        let rpc_url = format!("{}/transmission/rpc", base_url.trim_end_matches('/'));
        Ok(Self {
            name: name.into(),
            rpc_url,
            username,
            password,
            client,
            session_id: Arc::new(RwLock::new(None)),
        })
    }

    async fn call(&self, method: &str, arguments: Value) -> TorrentResult<Value> {
        let request = RpcRequest { method, arguments };
        let response = self.send(&request).await?;
        if response.result != "success" {
            return Err(TorrentError::OperationFailed {
                operation: "rpc_call",
                torrent_id: None,
                source: format!("transmission RPC returned '{}'", response.result).into(),
            });
        }
        Ok(response.arguments)
    }

    async fn send(&self, request: &RpcRequest<'_>) -> TorrentResult<RpcResponse> {
        let session_id = self.session_id.read().await.clone();
        let response = self.issue(request, session_id.as_deref()).await?;
        if response.status() == StatusCode::CONFLICT {
            let fresh = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(String::from);
            if let Some(fresh) = fresh {
                *self.session_id.write().await = Some(fresh.clone());
                let retried = self.issue(request, Some(&fresh)).await?;
                return retried
                    .json()
                    .await
                    .map_err(|err| Self::operation_failed("rpc_call", err));
            }
        }
        response
            .json()
            .await
            .map_err(|err| Self::operation_failed("rpc_call", err))
    }

    async fn issue(
        &self,
        request: &RpcRequest<'_>,
        session_id: Option<&str>,
    ) -> TorrentResult<reqwest::Response> {
        let mut builder = self.client.post(&self.rpc_url).json(request);
        if let Some(session_id) = session_id {
            if let Ok(header) = HeaderValue::from_str(session_id) {
                builder = builder.header(SESSION_HEADER, header);
            }
        }
        if let Some(username) = self.username.as_deref() {
            builder = builder.basic_auth(username, self.password.as_deref());
        }
        builder
            .send()
            .await
            .map_err(|err| Self::operation_failed("rpc_call", err))
    }

    fn operation_failed(operation: &'static str, source: reqwest::Error) -> TorrentError {
        TorrentError::OperationFailed {
            operation,
            torrent_id: None,
            source: Box::new(source),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn to_view(torrent: TrTorrent) -> TorrentView {
        let date_added = timestamp_to_utc(torrent.added_date);
        let date_done = if torrent.done_date > 0 {
            timestamp_to_utc(torrent.done_date)
        } else {
            date_added
        };
        let seeding_time = (Utc::now() - date_done).num_seconds().max(0);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let size = torrent.total_size.max(0) as u64;
        let uploaded = torrent.ratio * size as f64;
        let upspeed = if seeding_time > 0 {
            uploaded / seeding_time as f64 / 1024.0
        } else {
            0.0
        };
        let trackers: Vec<String> = torrent
            .trackers
            .iter()
            .map(|tracker| tracker.announce.clone())
            .collect();
        let site = torrent
            .trackers
            .first()
            .and_then(|tracker| tracker.sitename.clone())
            .unwrap_or_default();
        TorrentView {
            id: torrent.hash_string,
            backend: BackendKind::Transmission,
            name: torrent.name,
            size,
            progress: torrent.percent_done,
            ratio: torrent.ratio,
            upspeed,
            downspeed: 0.0,
            date_added,
            date_done,
            seeding_time,
            trackers,
            site,
            category: String::new(),
            tags: Vec::new(),
            save_path: torrent.download_dir,
            state: TorrentState::Other,
            error: torrent.error_string,
        }
    }
}

fn timestamp_to_utc(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or(Utc::now())
}

#[async_trait]
impl DownloaderBackend for TrBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_torrents(&self) -> TorrentResult<Vec<TorrentView>> {
        let arguments = json!({
            "fields": [
                "id", "hashString", "name", "totalSize", "percentDone", "uploadRatio",
                "addedDate", "doneDate", "downloadDir", "trackers", "errorString",
            ],
        });
        let result = self.call("torrent-get", arguments).await?;
        let torrents: Vec<TrTorrent> = serde_json::from_value(
            result.get("torrents").cloned().unwrap_or(Value::Null),
        )
        .map_err(|err| TorrentError::OperationFailed {
            operation: "list_torrents",
            torrent_id: None,
            source: Box::new(err),
        })?;
        Ok(torrents.into_iter().map(TrBackend::to_view).collect())
    }

    async fn pause(&self, id: &str) -> TorrentResult<()> {
        self.call("torrent-stop", json!({ "ids": [id] })).await?;
        Ok(())
    }

    async fn remove(&self, id: &str, action: TorrentAction) -> TorrentResult<()> {
        if action == TorrentAction::Pause {
            return self.pause(id).await;
        }
        let delete_local_data = action == TorrentAction::DeleteFiles;
        self.call(
            "torrent-remove",
            json!({ "ids": [id], "delete-local-data": delete_local_data }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TorrentInjector for TrBackend {
    async fn add_by_url(&self, url: &str, tag: &str) -> TorrentResult<()> {
        self.call(
            "torrent-add",
            json!({ "filename": url, "labels": [tag] }),
        )
        .await?;
        Ok(())
    }

    async fn find_hash_by_tag(&self, tag: &str) -> TorrentResult<Option<String>> {
        let result = self
            .call(
                "torrent-get",
                json!({ "fields": ["hashString", "labels"] }),
            )
            .await?;
        let torrents: Vec<TrTorrentLabels> = serde_json::from_value(
            result.get("torrents").cloned().unwrap_or(Value::Null),
        )
        .map_err(|err| TorrentError::OperationFailed {
            operation: "find_hash_by_tag",
            torrent_id: None,
            source: Box::new(err),
        })?;
        Ok(torrents
            .into_iter()
            .find(|torrent| torrent.labels.iter().any(|label| label == tag))
            .map(|torrent| torrent.hash_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_view_falls_back_to_added_date_when_incomplete() {
        let torrent = TrTorrent {
            hash_string: "abc123".into(),
            name: "Example".into(),
            total_size: 1_000,
            percent_done: 0.5,
            ratio: 0.0,
            added_date: 1_700_000_000,
            done_date: 0,
            download_dir: "/downloads".into(),
            trackers: vec![TrTracker {
                announce: "https://tracker.example.com/announce".into(),
                sitename: Some("example".into()),
            }],
            error_string: String::new(),
        };
        let view = TrBackend::to_view(torrent);
        assert_eq!(view.date_done, view.date_added);
        assert_eq!(view.site, "example");
        assert_eq!(view.trackers.len(), 1);
    }
}
