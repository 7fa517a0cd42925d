//! One materializer pass: traversal, consumer pools, optional GC sweep.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use torrentkeep_config::MaterializerConfig;
use torrentkeep_events::{Event, EventBus};
use torrentkeep_telemetry::Metrics;
use tracing::info;

use crate::error::{MaterializerError, MaterializerResult};
use crate::gc::{self, GcFilter};
use crate::listing::ListingClient;
use crate::traversal::spawn_traversal;
use crate::writer::{run_shortcut_pool, run_subtitle_pool};

/// Orchestrates a single materialization pass over the configured remote
/// roots, writing shortcuts and subtitles and, when `sync_remote` is set,
/// sweeping local artifacts no longer present remotely.
pub struct Materializer {
    config: Arc<MaterializerConfig>,
    listing: Arc<ListingClient>,
    http_client: Client,
    events: EventBus,
    metrics: Metrics,
}

/// Summary of a completed pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Shortcut files written.
    pub shortcuts_written: u64,
    /// Subtitle files downloaded.
    pub subtitles_downloaded: u64,
    /// Local artifacts removed by a GC sweep, if one ran.
    pub gc_removed: u64,
}

impl Materializer {
    /// Construct a materializer bound to `config`, publishing to `events`
    /// and recording to `metrics`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, or if the
    /// underlying HTTP client cannot be constructed.
    pub fn new(
        config: MaterializerConfig,
        events: EventBus,
        metrics: Metrics,
    ) -> MaterializerResult<Self> {
        torrentkeep_config::validate_materializer_config(&config)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| MaterializerError::IoFailure {
                operation: "build_client",
                path: config.base_url.clone(),
                source: Box::new(err),
            })?;
        let listing = ListingClient::new(
            config.base_url.clone(),
            config.token.clone(),
            http_client.clone(),
        );
        Ok(Self {
            config: Arc::new(config),
            listing: Arc::new(listing),
            http_client,
            events,
            metrics,
        })
    }

    /// Run one full pass: traverse every configured root, drain both
    /// consumer pools, and sweep stale artifacts if `sync_remote` is set.
    pub async fn run_once(&self) -> RunSummary {
        info!(roots = ?self.config.roots, "materializer pass starting");
        let handles = spawn_traversal(
            Arc::clone(&self.config),
            Arc::clone(&self.listing),
            self.events.clone(),
            self.metrics.clone(),
        );

        let shortcut_task = tokio::spawn(run_shortcut_pool(
            handles.shortcuts,
            self.config.max_download_workers,
            self.events.clone(),
        ));
        let subtitle_task = tokio::spawn(run_subtitle_pool(
            handles.subtitles,
            self.config.max_download_workers,
            self.http_client.clone(),
            self.events.clone(),
        ));

        let stats = handles.join.await.unwrap_or_default();
        let shortcuts_written = shortcut_task.await.unwrap_or(0);
        let subtitles_downloaded = subtitle_task.await.unwrap_or(0);

        let gc_removed = if self.config.sync_remote {
            self.run_gc(&stats.processed.iter().cloned().collect())
        } else {
            0
        };

        self.metrics.inc_materializer_run();
        self.events.publish(Event::MaterializerRunCompleted {
            materialized: shortcuts_written + subtitles_downloaded,
            collected: gc_removed,
        });

        RunSummary {
            shortcuts_written,
            subtitles_downloaded,
            gc_removed,
        }
    }

    fn run_gc(&self, processed: &HashSet<std::path::PathBuf>) -> u64 {
        let Some(gc_config) = &self.config.gc else {
            return 0;
        };
        let target_dir = std::path::Path::new(&self.config.target_dir);
        let mut filter = GcFilter::build(
            gc_config,
            target_dir,
            &self.config.media_suffixes,
            &self.config.subtitle_suffixes,
        );
        self.metrics.set_bloom_filter_layers(filter.layer_count());
        let removed = gc::sweep(
            &mut filter,
            processed,
            target_dir,
            &self.config.media_suffixes,
            &self.config.subtitle_suffixes,
        );
        self.metrics.inc_gc_sweep();
        self.metrics.inc_gc_entries_removed(removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use torrentkeep_config::TraversalMode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(base_url: String, target_dir: String) -> MaterializerConfig {
        MaterializerConfig {
            base_url,
            token: None,
            roots: vec!["/movies".into()],
            source_dir: "/movies".into(),
            path_replace: String::new(),
            max_depth: -1,
            traversal_mode: TraversalMode::Bfs,
            sync_remote: false,
            target_dir,
            media_suffixes: vec!["mkv".into()],
            subtitle_suffixes: vec!["srt".into()],
            max_list_workers: 2,
            max_download_workers: 2,
            url_replace: None,
            gc: None,
        }
    }

    #[tokio::test]
    async fn run_once_writes_a_shortcut_for_a_single_media_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/fs/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "data": {
                    "content": [
                        {"name": "a.mkv", "is_dir": false, "sign": "abc123"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let config = config_for(server.uri(), dir.path().display().to_string());
        let materializer = Materializer::new(config, EventBus::with_capacity(32), Metrics::new().expect("metrics"))
            .expect("materializer");

        let summary = materializer.run_once().await;
        assert_eq!(summary.shortcuts_written, 1);
        assert_eq!(summary.subtitles_downloaded, 0);

        let written = std::fs::read_to_string(dir.path().join("a.strm")).expect("read shortcut");
        assert_eq!(written, format!("{}/d/movies/a.mkv?sign=abc123", server.uri()));
    }
}
