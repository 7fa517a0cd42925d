//! Default values shared by configuration constructors.

/// Default delay before a one-shot (`onlyonce`) removal pass runs.
pub const DEFAULT_ONLYONCE_DELAY_SECONDS: u64 = 3;

/// Default bounded concurrency for remote listing traversal.
pub const DEFAULT_MAX_LIST_WORKERS: usize = 8;

/// Default bounded concurrency for subtitle downloads.
pub const DEFAULT_MAX_DOWNLOAD_WORKERS: usize = 4;

/// Default false-positive rate for the scalable counting Bloom GC filter.
pub const DEFAULT_BLOOM_ERROR_RATE: f64 = 0.01;

/// Default expected element count seeding the first Bloom filter layer.
pub const DEFAULT_BLOOM_INITIAL_CAPACITY: usize = 100_000;

/// Default suffixes treated as playable media and rewritten into `.strm` shortcuts.
pub fn default_media_suffixes() -> Vec<String> {
    [
        "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "ts", "m2ts", "iso",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Default suffixes downloaded verbatim alongside their media counterpart.
pub fn default_subtitle_suffixes() -> Vec<String> {
    ["srt", "ass", "ssa", "sub"].into_iter().map(String::from).collect()
}
