//! Shortcut and subtitle consumer pools.
//!
//! Each pool drains its job channel with `max_download_workers` concurrent
//! workers (subtitle downloads are the only ones that touch the network per
//! job; shortcut writes are pure local I/O but share the same worker budget
//! for symmetry with the remote tree's own client).

use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use tokio::fs;
use tokio::sync::{Semaphore, mpsc};
use torrentkeep_events::{Event, EventBus};
use tracing::warn;

use crate::error::MaterializerError;
use crate::traversal::{ShortcutJob, SubtitleJob};

/// Drain the shortcut job channel, writing each job's URL into a `.strm`
/// file at its target path.
pub(crate) async fn run_shortcut_pool(
    mut jobs: mpsc::Receiver<ShortcutJob>,
    max_workers: usize,
    events: EventBus,
) -> u64 {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut written = 0_u64;
    let mut join_set = tokio::task::JoinSet::new();

    while let Some(job) = jobs.recv().await {
        let semaphore = Arc::clone(&semaphore);
        let events = events.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            match write_shortcut(&job).await {
                Ok(()) => {
                    events.publish(Event::EntryMaterialized {
                        remote_path: job.remote_path,
                        local_path: job.local_path.display().to_string(),
                    });
                    true
                }
                Err(err) => {
                    warn!(path = %job.local_path.display(), error = %err, "failed to write shortcut");
                    false
                }
            }
        });
    }

    while let Some(result) = join_set.join_next().await {
        if matches!(result, Ok(true)) {
            written += 1;
        }
    }

    written
}

/// Drain the subtitle job channel, downloading each job's bytes to its
/// target path.
pub(crate) async fn run_subtitle_pool(
    mut jobs: mpsc::Receiver<SubtitleJob>,
    max_workers: usize,
    client: Client,
    events: EventBus,
) -> u64 {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut downloaded = 0_u64;
    let mut join_set = tokio::task::JoinSet::new();

    while let Some(job) = jobs.recv().await {
        let semaphore = Arc::clone(&semaphore);
        let client = client.clone();
        let events = events.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            match download_subtitle(&job, &client).await {
                Ok(()) => {
                    events.publish(Event::EntryMaterialized {
                        remote_path: job.remote_path,
                        local_path: job.local_path.display().to_string(),
                    });
                    true
                }
                Err(err) => {
                    warn!(path = %job.local_path.display(), error = %err, "failed to download subtitle");
                    false
                }
            }
        });
    }

    while let Some(result) = join_set.join_next().await {
        if matches!(result, Ok(true)) {
            downloaded += 1;
        }
    }

    downloaded
}

async fn write_shortcut(job: &ShortcutJob) -> Result<(), MaterializerError> {
    ensure_parent(&job.local_path).await?;
    fs::write(&job.local_path, job.download_url.as_bytes())
        .await
        .map_err(|err| io_failure("write_shortcut", &job.local_path, err))
}

async fn download_subtitle(job: &SubtitleJob, client: &Client) -> Result<(), MaterializerError> {
    ensure_parent(&job.local_path).await?;
    let response = client
        .get(&job.download_url)
        .send()
        .await
        .map_err(|err| io_failure("download_subtitle", &job.local_path, err))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|err| io_failure("download_subtitle", &job.local_path, err))?;
    fs::write(&job.local_path, &bytes)
        .await
        .map_err(|err| io_failure("download_subtitle", &job.local_path, err))
}

async fn ensure_parent(path: &Path) -> Result<(), MaterializerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| io_failure("create_dir_all", path, err))?;
    }
    Ok(())
}

fn io_failure(
    operation: &'static str,
    path: &Path,
    source: impl std::error::Error + Send + Sync + 'static,
) -> MaterializerError {
    MaterializerError::IoFailure {
        operation,
        path: path.display().to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn shortcut_pool_writes_download_url_as_body() {
        let dir = tempdir().expect("tempdir");
        let local_path = dir.path().join("movies/a.strm");
        let (tx, rx) = mpsc::channel(4);
        tx.send(ShortcutJob {
            remote_path: "/movies/a.mkv".into(),
            local_path: local_path.clone(),
            download_url: "https://remote.example/d/movies/a.mkv".into(),
        })
        .await
        .expect("send job");
        drop(tx);

        let events = EventBus::with_capacity(8);
        let written = run_shortcut_pool(rx, 2, events).await;
        assert_eq!(written, 1);

        let contents = tokio::fs::read_to_string(&local_path).await.expect("read");
        assert_eq!(contents, "https://remote.example/d/movies/a.mkv");
    }

    #[tokio::test]
    async fn shortcut_pool_counts_failures_as_zero() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, b"not a directory")
            .await
            .expect("write blocker file");
        let local_path: PathBuf = blocker.join("a.strm");

        let (tx, rx) = mpsc::channel(4);
        tx.send(ShortcutJob {
            remote_path: "/movies/a.mkv".into(),
            local_path,
            download_url: "https://remote.example/d/movies/a.mkv".into(),
        })
        .await
        .expect("send job");
        drop(tx);

        let events = EventBus::with_capacity(8);
        let written = run_shortcut_pool(rx, 2, events).await;
        assert_eq!(written, 0);
    }
}
