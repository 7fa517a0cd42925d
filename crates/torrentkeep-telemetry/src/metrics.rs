//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes counters/gauges relevant to the removal engine and the
//!   materializer rather than a generic HTTP-service set.

use std::convert::TryFrom;
use std::time::Duration;

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across the engines.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    torrents_removed_total: IntCounterVec,
    removal_selection_duration_ms: IntGauge,
    removal_passes_total: IntCounter,
    traversal_entries_emitted_total: IntCounter,
    materializer_runs_total: IntCounter,
    gc_sweeps_total: IntCounter,
    gc_entries_removed_total: IntCounter,
    bloom_filter_layers: IntGauge,
    events_emitted_total: IntCounterVec,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Duration (ms) of the most recent removal-pass selection phase.
    pub removal_selection_duration_ms: i64,
    /// Total removal passes run.
    pub removal_passes_total: u64,
    /// Total traversal entries emitted by the materializer.
    pub traversal_entries_emitted_total: u64,
    /// Total materializer runs completed.
    pub materializer_runs_total: u64,
    /// Total garbage-collection sweeps run.
    pub gc_sweeps_total: u64,
    /// Total local entries removed by garbage collection.
    pub gc_entries_removed_total: u64,
    /// Current number of layers held by the Bloom filter GC implementation.
    pub bloom_filter_layers: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let torrents_removed_total = IntCounterVec::new(
            Opts::new(
                "torrents_removed_total",
                "Torrents actioned by the removal engine, by action kind",
            ),
            &["backend", "action"],
        )?;
        let removal_selection_duration_ms = IntGauge::with_opts(Opts::new(
            "removal_selection_duration_ms",
            "Duration of the most recent removal-pass selection phase (ms)",
        ))?;
        let removal_passes_total = IntCounter::with_opts(Opts::new(
            "removal_passes_total",
            "Total removal passes run",
        ))?;
        let traversal_entries_emitted_total = IntCounter::with_opts(Opts::new(
            "traversal_entries_emitted_total",
            "Remote tree entries emitted by the materializer traversal",
        ))?;
        let materializer_runs_total = IntCounter::with_opts(Opts::new(
            "materializer_runs_total",
            "Total materializer runs completed",
        ))?;
        let gc_sweeps_total = IntCounter::with_opts(Opts::new(
            "gc_sweeps_total",
            "Total garbage-collection sweeps run by the materializer",
        ))?;
        let gc_entries_removed_total = IntCounter::with_opts(Opts::new(
            "gc_entries_removed_total",
            "Total local entries removed by garbage collection",
        ))?;
        let bloom_filter_layers = IntGauge::with_opts(Opts::new(
            "bloom_filter_layers",
            "Current number of layers held by the Bloom filter GC implementation",
        ))?;
        let events_emitted_total = IntCounterVec::new(
            Opts::new("events_emitted_total", "Domain events emitted by kind"),
            &["kind"],
        )?;

        registry.register(Box::new(torrents_removed_total.clone()))?;
        registry.register(Box::new(removal_selection_duration_ms.clone()))?;
        registry.register(Box::new(removal_passes_total.clone()))?;
        registry.register(Box::new(traversal_entries_emitted_total.clone()))?;
        registry.register(Box::new(materializer_runs_total.clone()))?;
        registry.register(Box::new(gc_sweeps_total.clone()))?;
        registry.register(Box::new(gc_entries_removed_total.clone()))?;
        registry.register(Box::new(bloom_filter_layers.clone()))?;
        registry.register(Box::new(events_emitted_total.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                torrents_removed_total,
                removal_selection_duration_ms,
                removal_passes_total,
                traversal_entries_emitted_total,
                materializer_runs_total,
                gc_sweeps_total,
                gc_entries_removed_total,
                bloom_filter_layers,
                events_emitted_total,
            }),
        })
    }

    /// Increment the torrents-removed counter for a backend/action pair.
    pub fn inc_torrents_removed(&self, backend: &str, action: &str) {
        self.inner
            .torrents_removed_total
            .with_label_values(&[backend, action])
            .inc();
    }

    /// Record the duration of a removal pass's selection phase.
    pub fn observe_removal_selection_duration(&self, duration: Duration) {
        self.inner
            .removal_selection_duration_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Increment the removal-passes counter.
    pub fn inc_removal_pass(&self) {
        self.inner.removal_passes_total.inc();
    }

    /// Increment the traversal-entries-emitted counter by `count`.
    pub fn inc_traversal_entries(&self, count: u64) {
        self.inner.traversal_entries_emitted_total.inc_by(count);
    }

    /// Increment the materializer-runs counter.
    pub fn inc_materializer_run(&self) {
        self.inner.materializer_runs_total.inc();
    }

    /// Increment the GC-sweeps counter.
    pub fn inc_gc_sweep(&self) {
        self.inner.gc_sweeps_total.inc();
    }

    /// Increment the GC-entries-removed counter by `count`.
    pub fn inc_gc_entries_removed(&self, count: u64) {
        self.inner.gc_entries_removed_total.inc_by(count);
    }

    /// Set the current Bloom filter layer-count gauge.
    pub fn set_bloom_filter_layers(&self, layers: i64) {
        self.inner.bloom_filter_layers.set(layers);
    }

    /// Increment the emitted-event counter for the given event kind.
    pub fn inc_event(&self, event_kind: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_kind])
            .inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            removal_selection_duration_ms: self.inner.removal_selection_duration_ms.get(),
            removal_passes_total: Self::counter_as_u64(&self.inner.removal_passes_total),
            traversal_entries_emitted_total: Self::counter_as_u64(
                &self.inner.traversal_entries_emitted_total,
            ),
            materializer_runs_total: Self::counter_as_u64(&self.inner.materializer_runs_total),
            gc_sweeps_total: Self::counter_as_u64(&self.inner.gc_sweeps_total),
            gc_entries_removed_total: Self::counter_as_u64(&self.inner.gc_entries_removed_total),
            bloom_filter_layers: self.inner.bloom_filter_layers.get(),
        }
    }

    fn counter_as_u64(counter: &IntCounter) -> u64 {
        counter.get()
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_torrents_removed("qbittorrent", "delete_files");
        metrics.observe_removal_selection_duration(Duration::from_millis(42));
        metrics.inc_removal_pass();
        metrics.inc_traversal_entries(7);
        metrics.inc_materializer_run();
        metrics.inc_gc_sweep();
        metrics.inc_gc_entries_removed(3);
        metrics.set_bloom_filter_layers(2);
        metrics.inc_event("download_added");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.removal_selection_duration_ms, 42);
        assert_eq!(snapshot.removal_passes_total, 1);
        assert_eq!(snapshot.traversal_entries_emitted_total, 7);
        assert_eq!(snapshot.materializer_runs_total, 1);
        assert_eq!(snapshot.gc_sweeps_total, 1);
        assert_eq!(snapshot.gc_entries_removed_total, 3);
        assert_eq!(snapshot.bloom_filter_layers, 2);

        let rendered = metrics.render()?;
        assert!(rendered.contains("torrents_removed_total"));
        assert!(rendered.contains("bloom_filter_layers"));
        Ok(())
    }
}
