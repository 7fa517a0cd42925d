//! Stub dependencies that let the demo binary exercise both engines without
//! a real downloader or remote listing service.

use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use axum::routing::post;
use axum::{Router, serve};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use torrentkeep_core::{BackendKind, DownloaderBackend, TorrentAction, TorrentResult, TorrentState, TorrentView};

use crate::error::{AppError, AppResult};

/// A fixed in-memory set of torrents standing in for a live downloader.
///
/// Mirrors scenario S1 from the removal engine's testable properties: one
/// long-seeding, high-ratio torrent (`t1`), one recently added torrent
/// (`t2`), and one long-seeding, low-ratio torrent (`t3`).
pub struct StubBackend {
    removed: Mutex<Vec<String>>,
}

impl StubBackend {
    /// Construct a backend carrying three canned torrents.
    #[must_use]
    pub fn new() -> Self {
        Self {
            removed: Mutex::new(Vec::new()),
        }
    }

    /// Identifiers acted upon since construction, in dispatch order.
    #[must_use]
    pub fn removed_ids(&self) -> Vec<String> {
        self.removed.lock().expect("removed lock poisoned").clone()
    }

    fn torrents() -> Vec<TorrentView> {
        let now = Utc::now();
        vec![
            torrent("t1", "Example.Movie.One", 90_000, 2.5, now),
            torrent("t2", "Example.Movie.Two", 3_600, 3.0, now),
            torrent("t3", "Example.Movie.Three", 90_000, 1.0, now),
        ]
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn torrent(id: &str, name: &str, seeding_time: i64, ratio: f64, now: chrono::DateTime<Utc>) -> TorrentView {
    TorrentView {
        id: id.to_string(),
        backend: BackendKind::QBittorrent,
        name: name.to_string(),
        size: 4 * (1_u64 << 30),
        progress: 1.0,
        ratio,
        upspeed: 0.0,
        downspeed: 0.0,
        date_added: now - ChronoDuration::seconds(seeding_time),
        date_done: now - ChronoDuration::seconds(seeding_time),
        seeding_time,
        trackers: vec!["https://tracker.example.com/announce".into()],
        site: "example.com".into(),
        category: "movies".into(),
        tags: Vec::new(),
        save_path: "/data/movies".into(),
        state: TorrentState::Seeding,
        error: String::new(),
    }
}

#[async_trait]
impl DownloaderBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn list_torrents(&self) -> TorrentResult<Vec<TorrentView>> {
        Ok(Self::torrents())
    }

    async fn remove(&self, id: &str, _action: TorrentAction) -> TorrentResult<()> {
        self.removed
            .lock()
            .expect("removed lock poisoned")
            .push(id.to_string());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ListRequest {
    path: String,
}

/// A minimal in-process HTTP server implementing the remote listing API,
/// serving the fixed tree from testable-property scenario S6:
/// `/a.mkv`, `/sub/b.srt`, `/sub/c.txt`.
async fn list_handler(State(_state): State<()>, Json(request): Json<ListRequest>) -> Json<Value> {
    let content = match request.path.as_str() {
        "/" => vec![entry("a.mkv", false), entry("sub", true)],
        "/sub" => vec![entry("b.srt", false), entry("c.txt", false)],
        _ => Vec::new(),
    };
    Json(json!({ "code": 200, "data": { "content": content } }))
}

fn entry(name: &str, is_dir: bool) -> Value {
    json!({ "name": name, "is_dir": is_dir })
}

/// Serves canned bytes for every download URL the traversal constructs, so
/// the demo's subtitle download succeeds instead of logging a failure.
async fn download_handler() -> &'static str {
    "demo subtitle content\n"
}

/// Bind and spawn the stub listing server, returning the address it is
/// reachable on. The server runs for the lifetime of the returned task.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn spawn_listing_server() -> AppResult<SocketAddr> {
    let router = Router::new()
        .route("/api/fs/list", post(list_handler))
        .route("/d/{*path}", axum::routing::get(download_handler))
        .with_state(());
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("valid loopback address");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::ListingServerBind { addr, source })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|source| AppError::ListingServerBind { addr, source })?;
    tokio::spawn(async move {
        if let Err(err) = serve(listener, router.into_make_service()).await {
            tracing::warn!(%err, "stub listing server terminated");
        }
    });
    Ok(bound_addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_backend_lists_three_canned_torrents() {
        let backend = StubBackend::new();
        let torrents = backend.list_torrents().await.unwrap();
        assert_eq!(torrents.len(), 3);
    }

    #[tokio::test]
    async fn spawn_listing_server_serves_the_s6_tree() {
        let addr = spawn_listing_server().await.unwrap();
        let client = reqwest::Client::new();
        let response: Value = client
            .post(format!("http://{addr}/api/fs/list"))
            .json(&json!({ "path": "/", "password": "", "page": 1, "per_page": 0, "refresh": false }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(response["code"], 200);
        assert_eq!(response["data"]["content"].as_array().unwrap().len(), 2);
    }
}
