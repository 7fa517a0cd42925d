//! Garbage collection of stale local shortcuts and subtitle files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use torrentkeep_config::{GcConfig, GcFilterKind};
use tracing::warn;
use walkdir::WalkDir;

use crate::bloom::ScalableCountingBloom;

const STRM_SUFFIX: &str = "strm";

fn is_managed_suffix(
    path: &Path,
    media_suffixes: &[String],
    subtitle_suffixes: &[String],
) -> bool {
    let Some(suffix) = path.extension() else {
        return false;
    };
    let suffix = suffix.to_string_lossy();
    suffix.eq_ignore_ascii_case(STRM_SUFFIX)
        || media_suffixes.iter().any(|s| s.eq_ignore_ascii_case(&suffix))
        || subtitle_suffixes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&suffix))
}

fn scan_target_dir(
    target_dir: &Path,
    media_suffixes: &[String],
    subtitle_suffixes: &[String],
) -> Vec<PathBuf> {
    WalkDir::new(target_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_managed_suffix(path, media_suffixes, subtitle_suffixes))
        .collect()
}

/// Membership structure over local target paths, backing the post-traversal
/// GC sweep. Constructed fresh for each run from the configured variant.
pub enum GcFilter {
    /// Exact `HashSet` seeded by a one-time scan of `target_dir`.
    Set(HashSet<PathBuf>),
    /// No persistent state; every operation re-probes the filesystem.
    Io,
    /// Scalable counting Bloom filter seeded by the same scan as `Set`.
    Bloom(ScalableCountingBloom),
}

impl GcFilter {
    /// Build the configured filter variant, seeding `Set`/`Bloom` with a
    /// one-time scan of `target_dir`.
    #[must_use]
    pub fn build(
        config: &GcConfig,
        target_dir: &Path,
        media_suffixes: &[String],
        subtitle_suffixes: &[String],
    ) -> Self {
        match config.filter {
            GcFilterKind::Set => {
                let seen = scan_target_dir(target_dir, media_suffixes, subtitle_suffixes);
                Self::Set(seen.into_iter().collect())
            }
            GcFilterKind::Io => Self::Io,
            GcFilterKind::Bloom => {
                let mut filter =
                    ScalableCountingBloom::new(config.bloom_initial_capacity, config.bloom_error_rate);
                for path in scan_target_dir(target_dir, media_suffixes, subtitle_suffixes) {
                    filter.add(&path_key(&path));
                }
                Self::Bloom(filter)
            }
        }
    }

    /// Current layer count, for the Bloom gauge; other variants report 0.
    #[must_use]
    pub fn layer_count(&self) -> i64 {
        match self {
            Self::Bloom(filter) => i64::try_from(filter.layer_count()).unwrap_or(i64::MAX),
            Self::Set(_) | Self::Io => 0,
        }
    }
}

fn path_key(path: &Path) -> String {
    path.display().to_string()
}

/// Remove local artifacts the filter knows about (or the filesystem holds,
/// for the `Io` variant) that are absent from `processed`. Returns the
/// number of entries removed.
pub(crate) fn sweep(
    filter: &mut GcFilter,
    processed: &HashSet<PathBuf>,
    target_dir: &Path,
    media_suffixes: &[String],
    subtitle_suffixes: &[String],
) -> u64 {
    match filter {
        GcFilter::Set(known) => {
            let stale: Vec<PathBuf> = known.difference(processed).cloned().collect();
            let removed = remove_paths(&stale);
            known.retain(|path| processed.contains(path));
            removed
        }
        GcFilter::Io => {
            let scanned = scan_target_dir(target_dir, media_suffixes, subtitle_suffixes);
            let stale: Vec<PathBuf> = scanned
                .into_iter()
                .filter(|path| !processed.contains(path))
                .collect();
            remove_paths(&stale)
        }
        GcFilter::Bloom(bloom) => {
            let scanned = scan_target_dir(target_dir, media_suffixes, subtitle_suffixes);
            let mut removed = 0_u64;
            for path in scanned {
                if processed.contains(&path) {
                    continue;
                }
                if std::fs::remove_file(&path).is_ok() {
                    bloom.remove(&path_key(&path));
                    removed += 1;
                } else {
                    warn!(path = %path.display(), "gc sweep failed to remove stale artifact");
                }
            }
            removed
        }
    }
}

fn remove_paths(paths: &[PathBuf]) -> u64 {
    let mut removed = 0_u64;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(err) => warn!(path = %path.display(), error = %err, "gc sweep failed to remove stale artifact"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn media() -> Vec<String> {
        vec!["mkv".to_string()]
    }

    fn subs() -> Vec<String> {
        vec!["srt".to_string()]
    }

    #[test]
    fn set_filter_sweeps_only_unprocessed_entries() {
        let dir = tempdir().expect("tempdir");
        let kept = dir.path().join("keep.strm");
        let stale = dir.path().join("stale.strm");
        std::fs::write(&kept, b"url").expect("write kept");
        std::fs::write(&stale, b"url").expect("write stale");

        let config = GcConfig {
            filter: GcFilterKind::Set,
            bloom_error_rate: 0.01,
            bloom_initial_capacity: 64,
        };
        let mut filter = GcFilter::build(&config, dir.path(), &media(), &subs());
        let processed: HashSet<PathBuf> = [kept.clone()].into_iter().collect();

        let removed = sweep(&mut filter, &processed, dir.path(), &media(), &subs());
        assert_eq!(removed, 1);
        assert!(kept.exists());
        assert!(!stale.exists());
    }

    #[test]
    fn io_filter_sweeps_by_rescanning_target_dir() {
        let dir = tempdir().expect("tempdir");
        let stale = dir.path().join("stale.strm");
        std::fs::write(&stale, b"url").expect("write stale");

        let config = GcConfig {
            filter: GcFilterKind::Io,
            bloom_error_rate: 0.01,
            bloom_initial_capacity: 64,
        };
        let mut filter = GcFilter::build(&config, dir.path(), &media(), &subs());
        let processed = HashSet::new();

        let removed = sweep(&mut filter, &processed, dir.path(), &media(), &subs());
        assert_eq!(removed, 1);
        assert!(!stale.exists());
    }

    #[test]
    fn bloom_filter_sweeps_unprocessed_scanned_entries() {
        let dir = tempdir().expect("tempdir");
        let kept = dir.path().join("keep.strm");
        let stale = dir.path().join("stale.strm");
        std::fs::write(&kept, b"url").expect("write kept");
        std::fs::write(&stale, b"url").expect("write stale");

        let config = GcConfig {
            filter: GcFilterKind::Bloom,
            bloom_error_rate: 0.01,
            bloom_initial_capacity: 64,
        };
        let mut filter = GcFilter::build(&config, dir.path(), &media(), &subs());
        let processed: HashSet<PathBuf> = [kept.clone()].into_iter().collect();

        let removed = sweep(&mut filter, &processed, dir.path(), &media(), &subs());
        assert_eq!(removed, 1);
        assert!(kept.exists());
        assert!(!stale.exists());
    }
}
