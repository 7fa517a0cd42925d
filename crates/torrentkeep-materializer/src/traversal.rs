//! Remote tree traversal.
//!
//! Walks the configured roots breadth-first (level by level, with listing
//! concurrency bounded by a semaphore) or depth-first (a LIFO frontier,
//! listed one path at a time), classifying every file entry as a shortcut
//! job, a subtitle job, or neither. Both job kinds are handed off through
//! `mpsc` channels to the consumer pools in [`crate::writer`]; closing the
//! sender when the walk finishes is the channel's natural sentinel.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use torrentkeep_config::{MaterializerConfig, TraversalMode};
use torrentkeep_events::{Event, EventBus};
use torrentkeep_telemetry::Metrics;
use tracing::warn;

use crate::listing::ListingClient;
use crate::pathmap::{is_media, is_subtitle, target_path};

/// A shortcut file to be written locally.
#[derive(Debug, Clone)]
pub struct ShortcutJob {
    /// Remote path the shortcut was materialized from.
    pub remote_path: String,
    /// Local `.strm` path to write.
    pub local_path: PathBuf,
    /// URL stored as the shortcut file's body.
    pub download_url: String,
}

/// A subtitle file to be downloaded verbatim.
#[derive(Debug, Clone)]
pub struct SubtitleJob {
    /// Remote path the subtitle was downloaded from.
    pub remote_path: String,
    /// Local path to write the downloaded bytes to.
    pub local_path: PathBuf,
    /// URL to fetch the subtitle's bytes from.
    pub download_url: String,
}

/// Outcome of a completed traversal.
#[derive(Debug, Default, Clone)]
pub struct TraversalStats {
    /// Local paths this traversal intends to materialize, used as the GC
    /// "expected" set when `sync_remote` is enabled.
    pub processed: Vec<PathBuf>,
    /// Total file entries classified (shortcut or subtitle) during the walk.
    pub entries_emitted: u64,
}

/// Channels and background handle for an in-flight traversal.
pub(crate) struct TraversalHandles {
    /// Shortcut jobs, consumed by [`crate::writer::run_shortcut_pool`].
    pub shortcuts: mpsc::Receiver<ShortcutJob>,
    /// Subtitle jobs, consumed by [`crate::writer::run_subtitle_pool`].
    pub subtitles: mpsc::Receiver<SubtitleJob>,
    /// Join handle resolving to the traversal's final statistics.
    pub join: JoinHandle<TraversalStats>,
}

/// Spawn a traversal of every configured root as a background task.
pub(crate) fn spawn_traversal(
    config: Arc<MaterializerConfig>,
    listing: Arc<ListingClient>,
    events: EventBus,
    metrics: Metrics,
) -> TraversalHandles {
    let (shortcut_tx, shortcuts) = mpsc::channel(256);
    let (subtitle_tx, subtitles) = mpsc::channel(256);

    let join = tokio::spawn(async move {
        let mut stats = TraversalStats::default();
        let semaphore = Arc::new(Semaphore::new(config.max_list_workers.max(1)));

        for root in &config.roots {
            events.publish(Event::MaterializerRunStarted { root: root.clone() });
            walk_root(
                root,
                &config,
                &listing,
                &semaphore,
                &shortcut_tx,
                &subtitle_tx,
                &mut stats,
            )
            .await;
        }

        metrics.inc_traversal_entries(stats.entries_emitted);
        stats
    });

    TraversalHandles {
        shortcuts,
        subtitles,
        join,
    }
}

async fn walk_root(
    root: &str,
    config: &MaterializerConfig,
    listing: &Arc<ListingClient>,
    semaphore: &Arc<Semaphore>,
    shortcut_tx: &mpsc::Sender<ShortcutJob>,
    subtitle_tx: &mpsc::Sender<SubtitleJob>,
    stats: &mut TraversalStats,
) {
    match config.traversal_mode {
        TraversalMode::Bfs => {
            walk_bfs(
                root,
                config,
                listing,
                semaphore,
                shortcut_tx,
                subtitle_tx,
                stats,
            )
            .await;
        }
        TraversalMode::Dfs => {
            walk_dfs(root, config, listing, shortcut_tx, subtitle_tx, stats).await;
        }
    }
}

async fn walk_bfs(
    root: &str,
    config: &MaterializerConfig,
    listing: &Arc<ListingClient>,
    semaphore: &Arc<Semaphore>,
    shortcut_tx: &mpsc::Sender<ShortcutJob>,
    subtitle_tx: &mpsc::Sender<SubtitleJob>,
    stats: &mut TraversalStats,
) {
    let mut frontier: VecDeque<(String, i64)> = VecDeque::new();
    frontier.push_back((root.to_string(), 0));

    while !frontier.is_empty() {
        let level: Vec<(String, i64)> = frontier.drain(..).collect();
        let mut join_set = JoinSet::new();
        for (path, depth) in level {
            let listing = Arc::clone(listing);
            let semaphore = Arc::clone(semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let entries = listing.list(&path).await;
                (path, depth, entries)
            });
        }
        let mut listed = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(item) => listed.push(item),
                Err(err) => warn!(error = %err, "listing task panicked"),
            }
        }

        for (path, depth, entries) in listed {
            let entries = match entries {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path, error = %err, "listing failed, pruning subtree");
                    continue;
                }
            };
            for entry in entries {
                let remote_path = join_remote(&path, &entry.name);
                if entry.is_dir {
                    if config.max_depth < 0 || depth + 1 <= config.max_depth {
                        frontier.push_back((remote_path, depth + 1));
                    }
                    continue;
                }
                classify_and_emit(
                    &remote_path,
                    entry.sign.as_deref(),
                    listing,
                    config,
                    shortcut_tx,
                    subtitle_tx,
                    stats,
                )
                .await;
            }
        }
    }
}

async fn walk_dfs(
    root: &str,
    config: &MaterializerConfig,
    listing: &Arc<ListingClient>,
    shortcut_tx: &mpsc::Sender<ShortcutJob>,
    subtitle_tx: &mpsc::Sender<SubtitleJob>,
    stats: &mut TraversalStats,
) {
    let mut stack: Vec<(String, i64)> = vec![(root.to_string(), 0)];

    while let Some((path, depth)) = stack.pop() {
        let entries = match listing.list(&path).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %path, error = %err, "listing failed, pruning subtree");
                continue;
            }
        };
        for entry in entries {
            let remote_path = join_remote(&path, &entry.name);
            if entry.is_dir {
                if config.max_depth < 0 || depth + 1 <= config.max_depth {
                    stack.push((remote_path, depth + 1));
                }
                continue;
            }
            classify_and_emit(
                &remote_path,
                entry.sign.as_deref(),
                listing,
                config,
                shortcut_tx,
                subtitle_tx,
                stats,
            )
            .await;
        }
    }
}

fn join_remote(parent: &str, name: &str) -> String {
    format!("{}/{name}", parent.trim_end_matches('/'))
}

async fn classify_and_emit(
    remote_path: &str,
    sign: Option<&str>,
    listing: &ListingClient,
    config: &MaterializerConfig,
    shortcut_tx: &mpsc::Sender<ShortcutJob>,
    subtitle_tx: &mpsc::Sender<SubtitleJob>,
    stats: &mut TraversalStats,
) {
    let name = remote_path.rsplit('/').next().unwrap_or(remote_path);
    let download_url = rewrite_url(&listing.download_url(remote_path, sign), listing, config);

    if is_media(name, &config.media_suffixes) {
        let local_path = target_path(
            remote_path,
            &config.source_dir,
            &config.path_replace,
            &config.target_dir,
            &config.media_suffixes,
        );
        stats.processed.push(local_path.clone());
        stats.entries_emitted += 1;
        let job = ShortcutJob {
            remote_path: remote_path.to_string(),
            local_path,
            download_url,
        };
        if shortcut_tx.send(job).await.is_err() {
            warn!(remote_path = %remote_path, "shortcut consumer pool closed early");
        }
    } else if is_subtitle(name, &config.subtitle_suffixes) {
        let local_path = target_path(
            remote_path,
            &config.source_dir,
            &config.path_replace,
            &config.target_dir,
            &[],
        );
        stats.processed.push(local_path.clone());
        stats.entries_emitted += 1;
        let job = SubtitleJob {
            remote_path: remote_path.to_string(),
            local_path,
            download_url,
        };
        if subtitle_tx.send(job).await.is_err() {
            warn!(remote_path = %remote_path, "subtitle consumer pool closed early");
        }
    }
}

fn rewrite_url(download_url: &str, listing: &ListingClient, config: &MaterializerConfig) -> String {
    match &config.url_replace {
        Some(replacement) => download_url.replacen(&listing.download_prefix(), replacement, 1),
        None => download_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> MaterializerConfig {
        MaterializerConfig {
            base_url: "https://remote.example".into(),
            token: None,
            roots: vec!["/movies".into()],
            source_dir: "/movies".into(),
            path_replace: String::new(),
            max_depth: -1,
            traversal_mode: TraversalMode::Bfs,
            sync_remote: false,
            target_dir: "/data/strm".into(),
            media_suffixes: vec!["mkv".into()],
            subtitle_suffixes: vec!["srt".into()],
            max_list_workers: 4,
            max_download_workers: 4,
            url_replace: None,
            gc: None,
        }
    }

    #[test]
    fn join_remote_trims_trailing_slash() {
        assert_eq!(join_remote("/movies/", "a.mkv"), "/movies/a.mkv");
        assert_eq!(join_remote("/movies", "a.mkv"), "/movies/a.mkv");
    }

    fn sample_listing() -> ListingClient {
        ListingClient::new("https://remote.example", None, reqwest::Client::new())
    }

    #[test]
    fn rewrite_url_applies_prefix_replacement() {
        let mut config = sample_config();
        config.url_replace = Some("https://cdn.example".into());
        let listing = sample_listing();
        let rewritten = rewrite_url("https://remote.example/d/movies/a.mkv", &listing, &config);
        assert_eq!(rewritten, "https://cdn.example/movies/a.mkv");
    }

    #[test]
    fn rewrite_url_passes_through_when_unconfigured() {
        let config = sample_config();
        let listing = sample_listing();
        assert_eq!(
            rewrite_url("https://remote.example/d/movies/a.mkv", &listing, &config),
            "https://remote.example/d/movies/a.mkv"
        );
    }

    #[tokio::test]
    async fn classify_and_emit_routes_media_to_shortcut_channel() {
        let config = sample_config();
        let listing = sample_listing();
        let (shortcut_tx, mut shortcut_rx) = mpsc::channel(4);
        let (subtitle_tx, _subtitle_rx) = mpsc::channel(4);
        let mut stats = TraversalStats::default();

        classify_and_emit(
            "/movies/a.mkv",
            None,
            &listing,
            &config,
            &shortcut_tx,
            &subtitle_tx,
            &mut stats,
        )
        .await;

        let job = shortcut_rx.recv().await.expect("shortcut job");
        assert_eq!(job.local_path, PathBuf::from("/data/strm/a.strm"));
        assert_eq!(stats.entries_emitted, 1);
    }

    #[tokio::test]
    async fn classify_and_emit_routes_subtitles_to_subtitle_channel() {
        let config = sample_config();
        let listing = sample_listing();
        let (shortcut_tx, _shortcut_rx) = mpsc::channel(4);
        let (subtitle_tx, mut subtitle_rx) = mpsc::channel(4);
        let mut stats = TraversalStats::default();

        classify_and_emit(
            "/movies/a.srt",
            None,
            &listing,
            &config,
            &shortcut_tx,
            &subtitle_tx,
            &mut stats,
        )
        .await;

        let job = subtitle_rx.recv().await.expect("subtitle job");
        assert_eq!(job.local_path, PathBuf::from("/data/strm/a.srt"));
        assert_eq!(stats.entries_emitted, 1);
    }

    #[tokio::test]
    async fn classify_and_emit_skips_unrecognized_suffixes() {
        let config = sample_config();
        let listing = sample_listing();
        let (shortcut_tx, _shortcut_rx) = mpsc::channel(4);
        let (subtitle_tx, _subtitle_rx) = mpsc::channel(4);
        let mut stats = TraversalStats::default();

        classify_and_emit(
            "/movies/readme.txt",
            None,
            &listing,
            &config,
            &shortcut_tx,
            &subtitle_tx,
            &mut stats,
        )
        .await;

        assert_eq!(stats.entries_emitted, 0);
    }
}
