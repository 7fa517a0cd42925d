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
#![allow(unexpected_cfgs)]
#![allow(clippy::multiple_crate_versions)]

//! The downloader-API HTTP surface: a single route that lets an external
//! plugin host inject a torrent by URL and learn its backend-assigned hash.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use torrentkeep_core::TorrentInjector;
use torrentkeep_events::EventBus;
use torrentkeep_telemetry::{Metrics, propagate_request_id_layer, set_request_id_layer};

pub use error::{ApiError, ApiResult};

/// Shared state handed to every route handler.
pub(crate) struct AppState {
    pub(crate) injector: Arc<dyn TorrentInjector>,
    pub(crate) events: EventBus,
    pub(crate) metrics: Metrics,
    pub(crate) backend_name: String,
}

/// Axum router wrapper hosting the downloader-API surface.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a new API server over the given backend's injector handle.
    #[must_use]
    pub fn new(
        backend_name: impl Into<String>,
        injector: Arc<dyn TorrentInjector>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let state = Arc::new(AppState {
            injector,
            events,
            metrics,
            backend_name: backend_name.into(),
        });
        let router = Router::new()
            .route(
                "/download_torrent_notest",
                get(handlers::download_torrent_notest),
            )
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .with_state(state);
        Self { router }
    }

    /// Serve the router on `addr` until the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server
    /// terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiResult<()> {
        tracing::info!("starting downloader-api on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ApiError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(ApiError::Serve)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn router(self) -> Router {
        self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use torrentkeep_core::{TorrentError, TorrentResult};

    struct StubInjector {
        hash: Mutex<Option<String>>,
    }

    #[async_trait]
    impl TorrentInjector for StubInjector {
        async fn add_by_url(&self, _url: &str, tag: &str) -> TorrentResult<()> {
            *self.hash.lock().unwrap() = Some(format!("hash-for-{tag}"));
            Ok(())
        }

        async fn find_hash_by_tag(&self, _tag: &str) -> TorrentResult<Option<String>> {
            Ok(self.hash.lock().unwrap().clone())
        }
    }

    struct FailingInjector;

    #[async_trait]
    impl TorrentInjector for FailingInjector {
        async fn add_by_url(&self, _url: &str, _tag: &str) -> TorrentResult<()> {
            Err(TorrentError::OperationFailed {
                operation: "add_by_url",
                torrent_id: None,
                source: "connection refused".into(),
            })
        }

        async fn find_hash_by_tag(&self, _tag: &str) -> TorrentResult<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn download_torrent_notest_reports_success() {
        let injector = Arc::new(StubInjector {
            hash: Mutex::new(None),
        });
        let server = ApiServer::new(
            "qbittorrent",
            injector,
            EventBus::new(),
            Metrics::new().expect("metrics"),
        );
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/download_torrent_notest?torrent_url=magnet:?xt=urn:btih:abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn download_torrent_notest_reports_failure_from_backend() {
        let server = ApiServer::new(
            "qbittorrent",
            Arc::new(FailingInjector),
            EventBus::new(),
            Metrics::new().expect("metrics"),
        );
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/download_torrent_notest?torrent_url=magnet:?xt=urn:btih:abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
