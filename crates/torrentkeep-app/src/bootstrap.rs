//! Wires stub dependencies together and runs one pass of each engine.

use std::sync::Arc;

use torrentkeep_config::defaults::{default_media_suffixes, default_subtitle_suffixes};
use torrentkeep_config::{
    BackendConfig, ConditionPredicates, MaterializerConfig, PredicateConnector, RemovalAction,
    RemovalConfig, RemovalMode, TraversalMode,
};
use torrentkeep_core::DownloaderBackend;
use torrentkeep_events::EventBus;
use torrentkeep_materializer::Materializer;
use torrentkeep_removal::RemovalEngine;
use torrentkeep_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::stub::{StubBackend, spawn_listing_server};

fn removal_config() -> RemovalConfig {
    RemovalConfig {
        backends: vec![BackendConfig {
            name: "stub".into(),
            base_url: "http://localhost".into(),
            username: None,
            password: None,
        }],
        mode: RemovalMode::Condition {
            connector: PredicateConnector::And,
            predicates: ConditionPredicates {
                min_seeding_seconds: Some(86_400),
                min_ratio: Some(2.0),
                ..ConditionPredicates::default()
            },
        },
        cross_seed: false,
        action: RemovalAction::Delete,
        onlyonce: true,
    }
}

fn materializer_config(base_url: String, target_dir: String) -> MaterializerConfig {
    MaterializerConfig {
        base_url,
        token: None,
        roots: vec!["/".into()],
        source_dir: String::new(),
        path_replace: String::new(),
        max_depth: -1,
        traversal_mode: TraversalMode::Bfs,
        sync_remote: false,
        target_dir,
        media_suffixes: default_media_suffixes(),
        subtitle_suffixes: default_subtitle_suffixes(),
        max_list_workers: 4,
        max_download_workers: 4,
        url_replace: None,
        gc: None,
    }
}

/// Run the demo application: one removal pass against the stub backend,
/// then one materializer pass against the in-process stub listing server.
///
/// # Errors
///
/// Returns an error if logging or metrics fail to initialize, if the stub
/// listing server cannot be bound, or if either engine's configuration
/// fails validation.
pub async fn run_app() -> AppResult<()> {
    init_logging(&LoggingConfig {
        format: LogFormat::Pretty,
        ..LoggingConfig::default()
    })
    .map_err(AppError::Logging)?;

    let events = EventBus::new();
    let metrics = Metrics::new().map_err(AppError::Metrics)?;

    let backend = Arc::new(StubBackend::new());
    let backends: Vec<Arc<dyn DownloaderBackend>> = vec![backend.clone()];
    let removal_engine = RemovalEngine::new(removal_config(), backends, events.clone(), metrics.clone());
    removal_engine.run_once().await?;
    info!(removed = ?backend.removed_ids(), "removal pass complete");

    let listing_addr = spawn_listing_server().await?;
    let target_dir = std::env::temp_dir().join("torrentkeep-demo");
    let materializer = Materializer::new(
        materializer_config(format!("http://{listing_addr}"), target_dir.display().to_string()),
        events,
        metrics,
    )?;
    let summary = materializer.run_once().await;
    info!(
        shortcuts = summary.shortcuts_written,
        subtitles = summary.subtitles_downloaded,
        "materializer pass complete"
    );

    Ok(())
}
