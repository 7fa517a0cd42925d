//! Typed configuration documents for the removal engine and the materializer.

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_BLOOM_ERROR_RATE, DEFAULT_BLOOM_INITIAL_CAPACITY, DEFAULT_MAX_DOWNLOAD_WORKERS,
    DEFAULT_MAX_LIST_WORKERS, default_media_suffixes, default_subtitle_suffixes,
};

/// Connection details for a single downloader backend instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Stable name used in logs and metrics labels.
    pub name: String,
    /// Base URL of the backend's control API.
    pub base_url: String,
    /// Optional username for backends that require authentication.
    pub username: Option<String>,
    /// Optional password for backends that require authentication.
    pub password: Option<String>,
}

/// Connector used to combine condition predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateConnector {
    /// Every enabled predicate must hold.
    And,
    /// At least one enabled predicate must hold.
    Or,
}

/// Optional predicates evaluated against each [`torrentkeep_core::TorrentView`].
///
/// Every field is independently optional; disabled predicates do not
/// participate in the [`PredicateConnector`] evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionPredicates {
    /// Remove torrents whose `date_done` is older than this many seconds.
    #[serde(default)]
    pub min_seeding_seconds: Option<i64>,
    /// Remove torrents whose ratio is at least this value.
    #[serde(default)]
    pub min_ratio: Option<f64>,
    /// Remove torrents whose upload speed is at or above this many KiB/s.
    #[serde(default)]
    pub min_upspeed_kib: Option<f64>,
    /// Remove torrents whose size in GiB falls within `[min, max]`.
    #[serde(default)]
    pub size_range_gib: Option<(f64, f64)>,
    /// Remove torrents belonging to one of these categories.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Remove torrents carrying at least one of these tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Remove torrents whose site (tracker second-level domain) matches.
    #[serde(default)]
    pub sites: Vec<String>,
    /// Remove torrents that are fully complete (`progress >= 1.0`).
    #[serde(default)]
    pub require_complete: bool,
    /// Remove torrents currently in the paused state.
    #[serde(default)]
    pub require_paused: bool,
    /// Case-insensitive regex matched against `save_path`.
    #[serde(default)]
    pub path_pattern: Option<String>,
    /// Case-insensitive regex matched against any tracker announce URL.
    #[serde(default)]
    pub tracker_pattern: Option<String>,
    /// Case-insensitive regex matched against the backend-reported error
    /// message. Only meaningful for Transmission-backed torrents.
    #[serde(default)]
    pub error_pattern: Option<String>,
    /// Lifecycle states a torrent must be in. Only meaningful for
    /// qBittorrent-backed torrents, which report lifecycle state.
    #[serde(default)]
    pub states: Vec<String>,
}

/// Ranking key used to order torrents before a strategy walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyAction {
    /// Descending `seeding_time_s`: oldest seeds first.
    OldSeeds,
    /// Ascending `size`: smallest torrents first.
    SmallSeeds,
    /// Ascending average upload speed: least active torrents first.
    InactiveSeeds,
}

/// Strategy-mode policy: evaluate torrents by a single ranking strategy
/// instead of by independent predicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPolicy {
    /// Ranking key applied before walking the sorted torrent list.
    pub strategy_action: StrategyAction,
    /// Remove the least-valuable seeding torrents until `path` has at least
    /// this many GiB free.
    #[serde(default)]
    pub freespace_gib: Option<f64>,
    /// Filesystem path used for the free-space check.
    #[serde(default)]
    pub freespace_path: Option<String>,
    /// Keep at most this many seeding torrents, removing the rest by rank.
    #[serde(default)]
    pub maximum_count_seeds: Option<u64>,
    /// Keep at most this many GiB of seeding torrents, removing the rest by rank.
    #[serde(default)]
    pub maximum_size_seeds_gib: Option<f64>,
    /// Only remove torrents that also satisfy `condition` (if present).
    #[serde(default)]
    pub pre_filter_by_condition: bool,
    /// When walking the `freespace` strategy, subtract the estimated
    /// remaining download size of in-progress, condition-passing torrents
    /// from the measured free space before deciding how much to reclaim.
    #[serde(default)]
    pub pre_release: bool,
    /// Condition predicates used as the pre-filter and the `pre_release`
    /// offset filter. Required when `pre_filter_by_condition` or
    /// `pre_release` is set.
    #[serde(default)]
    pub condition: Option<(PredicateConnector, ConditionPredicates)>,
}

/// Selection mode used by a removal pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RemovalMode {
    /// Evaluate each torrent independently against a predicate set.
    Condition {
        /// How enabled predicates combine.
        connector: PredicateConnector,
        /// The predicate set evaluated against each torrent.
        predicates: ConditionPredicates,
    },
    /// Rank torrents by a shared strategy and remove from the bottom.
    Strategy(StrategyPolicy),
}

/// Action dispatched against torrents selected for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalAction {
    /// Pause matching torrents instead of removing them.
    Pause,
    /// Remove matching torrents, keeping on-disk data.
    Delete,
    /// Remove matching torrents and their on-disk data.
    DeleteFiles,
}

/// Full configuration surface for the torrent removal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Backends evaluated on every pass.
    pub backends: Vec<BackendConfig>,
    /// Selection policy applied to each backend's torrent set.
    pub mode: RemovalMode,
    /// Whether cross-seeded duplicates (same name and size) are expanded
    /// and acted upon together.
    #[serde(default)]
    pub cross_seed: bool,
    /// Action dispatched against every torrent selected for removal.
    pub action: RemovalAction,
    /// Run a single pass after a fixed delay instead of on every event.
    #[serde(default)]
    pub onlyonce: bool,
}

/// Which backing implementation a GC pass uses to recognize stale local
/// artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcFilterKind {
    /// Exact in-memory `HashSet` of expected local paths.
    Set,
    /// Stateless filesystem probes (no in-memory index).
    Io,
    /// Scalable counting Bloom filter.
    Bloom,
}

/// Garbage-collection configuration for the materializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    /// Which filter implementation backs the GC pass.
    pub filter: GcFilterKind,
    /// Target false-positive rate for the Bloom filter (ignored otherwise).
    #[serde(default = "default_bloom_error_rate")]
    pub bloom_error_rate: f64,
    /// Expected element count seeding the first Bloom filter layer.
    #[serde(default = "default_bloom_initial_capacity")]
    pub bloom_initial_capacity: usize,
}

const fn default_bloom_error_rate() -> f64 {
    DEFAULT_BLOOM_ERROR_RATE
}

const fn default_bloom_initial_capacity() -> usize {
    DEFAULT_BLOOM_INITIAL_CAPACITY
}

/// Directory walk order used by a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    /// Process the frontier one level at a time.
    Bfs,
    /// Last-in-first-out frontier.
    Dfs,
}

/// Full configuration surface for the remote tree materializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializerConfig {
    /// Base URL of the remote listing API.
    pub base_url: String,
    /// Optional bearer token sent with every listing/download request.
    #[serde(default)]
    pub token: Option<String>,
    /// Remote root paths to traverse.
    pub roots: Vec<String>,
    /// Prefix of each remote path rewritten to `path_replace` before
    /// joining onto `target_dir`.
    pub source_dir: String,
    /// Replacement for the `source_dir` prefix in the target path transform.
    #[serde(default)]
    pub path_replace: String,
    /// Maximum traversal depth below each root; `-1` is unbounded.
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,
    /// Directory walk order.
    #[serde(default = "default_traversal_mode")]
    pub traversal_mode: TraversalMode,
    /// Whether a GC sweep runs after traversal to remove local artifacts no
    /// longer present on the remote tree.
    #[serde(default)]
    pub sync_remote: bool,
    /// Local directory that mirrors the traversed remote tree.
    pub target_dir: String,
    /// File suffixes (without the leading dot) rewritten into `.strm` shortcuts.
    #[serde(default = "default_media_suffixes")]
    pub media_suffixes: Vec<String>,
    /// File suffixes downloaded verbatim alongside their media counterpart.
    #[serde(default = "default_subtitle_suffixes")]
    pub subtitle_suffixes: Vec<String>,
    /// Bounded concurrency for remote listing requests.
    #[serde(default = "default_max_list_workers")]
    pub max_list_workers: usize,
    /// Bounded concurrency for subtitle downloads.
    #[serde(default = "default_max_download_workers")]
    pub max_download_workers: usize,
    /// When set, replaces the `<base_url>/d` prefix of every download URL
    /// stored in a shortcut file with this value.
    #[serde(default)]
    pub url_replace: Option<String>,
    /// Optional garbage-collection pass run after each traversal.
    #[serde(default)]
    pub gc: Option<GcConfig>,
}

const fn default_max_list_workers() -> usize {
    DEFAULT_MAX_LIST_WORKERS
}

const fn default_max_download_workers() -> usize {
    DEFAULT_MAX_DOWNLOAD_WORKERS
}

const fn default_max_depth() -> i64 {
    -1
}

const fn default_traversal_mode() -> TraversalMode {
    TraversalMode::Bfs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_mode_serializes_with_tag() {
        let mode = RemovalMode::Strategy(StrategyPolicy {
            strategy_action: StrategyAction::OldSeeds,
            freespace_gib: Some(50.0),
            freespace_path: Some("/data".into()),
            maximum_count_seeds: None,
            maximum_size_seeds_gib: None,
            pre_filter_by_condition: false,
            pre_release: false,
            condition: None,
        });
        let json = serde_json::to_value(&mode).expect("serialize");
        assert_eq!(json["mode"], "strategy");
    }
}
