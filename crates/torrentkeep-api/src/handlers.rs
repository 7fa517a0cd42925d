//! The single documented downloader-API route.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use torrentkeep_events::Event;

use crate::AppState;

/// Number of times to poll for the backend-assigned hash before giving up.
const HASH_LOOKUP_ATTEMPTS: u32 = 5;
/// Delay between hash-lookup polls.
const HASH_LOOKUP_DELAY: Duration = Duration::from_millis(200);
/// Length of the random tag generated for each injected torrent.
const TAG_LENGTH: usize = 10;

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadTorrentQuery {
    torrent_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DownloadTorrentResponse {
    success: bool,
    message: String,
}

/// `GET /download_torrent_notest?torrent_url=<url>`
///
/// Adds the torrent with a freshly generated random tag, polls the backend
/// for the assigned hash, and emits `PluginAction{action:"downloaderapi_add"}`
/// once the hash is known.
pub(crate) async fn download_torrent_notest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadTorrentQuery>,
) -> Json<DownloadTorrentResponse> {
    let tag = random_tag();

    if let Err(err) = state.injector.add_by_url(&query.torrent_url, &tag).await {
        return Json(DownloadTorrentResponse {
            success: false,
            message: format!("failed to add torrent: {err}"),
        });
    }

    let hash = match poll_for_hash(&state, &tag).await {
        Ok(Some(hash)) => hash,
        Ok(None) => {
            return Json(DownloadTorrentResponse {
                success: false,
                message: "torrent was added but its hash was never assigned".to_string(),
            });
        }
        Err(err) => {
            return Json(DownloadTorrentResponse {
                success: false,
                message: format!("failed to look up assigned hash: {err}"),
            });
        }
    };

    state.events.publish(Event::PluginAction {
        backend: state.backend_name.clone(),
        torrent_id: hash.clone(),
        name: String::new(),
        action: "downloaderapi_add".to_string(),
    });
    state.metrics.inc_event("plugin_action");

    Json(DownloadTorrentResponse {
        success: true,
        message: format!("added torrent with hash {hash}"),
    })
}

async fn poll_for_hash(
    state: &AppState,
    tag: &str,
) -> torrentkeep_core::TorrentResult<Option<String>> {
    for attempt in 0..HASH_LOOKUP_ATTEMPTS {
        if let Some(hash) = state.injector.find_hash_by_tag(tag).await? {
            return Ok(Some(hash));
        }
        if attempt + 1 < HASH_LOOKUP_ATTEMPTS {
            tokio::time::sleep(HASH_LOOKUP_DELAY).await;
        }
    }
    Ok(None)
}

fn random_tag() -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .take(TAG_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tag_has_expected_length() {
        assert_eq!(random_tag().len(), TAG_LENGTH);
    }

    #[test]
    fn random_tag_is_alphanumeric() {
        assert!(random_tag().chars().all(|ch| ch.is_ascii_alphanumeric()));
    }
}
