// Detection statistics: lock-free counters, snapshots and periodic reporting

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lexguard_core::entry::{Category, LexiconEntry};
use lexguard_core::enums::DetectionPath;
use serde::Serialize;

use crate::learner::LearnerStats;

/// Process-wide detection counters.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    tokens_checked: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    direct_hits: AtomicU64,
    variation_hits: AtomicU64,
    probe_hits: AtomicU64,
    classifier_hits: AtomicU64,
    negatives: AtomicU64,
    degraded_lookups: AtomicU64,
    candidates_generated: AtomicU64,
    classifier_failures: AtomicU64,
    enrichment_ok: AtomicU64,
    enrichment_failed: AtomicU64,
    enrichment_dropped: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn load(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_token(&self) {
        bump(&self.tokens_checked);
    }

    pub fn record_cache(&self, hit: bool) {
        bump(if hit { &self.cache_hits } else { &self.cache_misses });
    }

    /// Count a match by the path that found it. Cache hits are counted by
    /// [`record_cache`](Self::record_cache) instead.
    pub fn record_hit(&self, path: DetectionPath) {
        match path {
            DetectionPath::Cache => {}
            DetectionPath::Direct => bump(&self.direct_hits),
            DetectionPath::KnownVariation => bump(&self.variation_hits),
            DetectionPath::AlgorithmicProbe => bump(&self.probe_hits),
            DetectionPath::Classifier => bump(&self.classifier_hits),
        }
    }

    pub fn record_negative(&self) {
        bump(&self.negatives);
    }

    pub fn record_degraded(&self) {
        bump(&self.degraded_lookups);
    }

    pub fn record_candidates(&self, n: usize) {
        self.candidates_generated.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_classifier_failure(&self) {
        bump(&self.classifier_failures);
    }

    pub fn record_enrichment(&self, ok: bool) {
        bump(if ok { &self.enrichment_ok } else { &self.enrichment_failed });
    }

    pub fn record_enrichment_dropped(&self) {
        bump(&self.enrichment_dropped);
    }

    /// Current counters plus the learner's summary.
    pub fn snapshot(&self, learner: LearnerStats) -> StatsSnapshot {
        let cache_hits = load(&self.cache_hits);
        let cache_misses = load(&self.cache_misses);
        let direct_hits = load(&self.direct_hits);
        let variation_hits = load(&self.variation_hits);
        let probe_hits = load(&self.probe_hits);
        StatsSnapshot {
            taken_at: Utc::now(),
            tokens_checked: load(&self.tokens_checked),
            cache_hits,
            cache_misses,
            cache_hit_rate: ratio(cache_hits, cache_hits + cache_misses),
            direct_hits,
            variation_hits,
            probe_hits,
            store_hit_rate: ratio(direct_hits + variation_hits + probe_hits, cache_misses),
            classifier_hits: load(&self.classifier_hits),
            classifier_failures: load(&self.classifier_failures),
            negatives: load(&self.negatives),
            degraded_lookups: load(&self.degraded_lookups),
            candidates_generated: load(&self.candidates_generated),
            enrichment_ok: load(&self.enrichment_ok),
            enrichment_failed: load(&self.enrichment_failed),
            enrichment_dropped: load(&self.enrichment_dropped),
            learned_rules: learner.rule_count,
            unique_patterns: learner.unique_patterns,
            top_learned_bases: learner.top_base_words,
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub tokens_checked: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// `cache_hits / (cache_hits + cache_misses)`.
    pub cache_hit_rate: f64,
    pub direct_hits: u64,
    pub variation_hits: u64,
    pub probe_hits: u64,
    /// Share of cache misses the lexicon resolved to a match.
    pub store_hit_rate: f64,
    pub classifier_hits: u64,
    pub classifier_failures: u64,
    pub negatives: u64,
    pub degraded_lookups: u64,
    pub candidates_generated: u64,
    pub enrichment_ok: u64,
    pub enrichment_failed: u64,
    pub enrichment_dropped: u64,
    pub learned_rules: usize,
    pub unique_patterns: usize,
    pub top_learned_bases: Vec<(String, u64)>,
}

/// Lexicon-side report: most detected entries and active entries per
/// category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LexiconSummary {
    pub most_detected: Vec<LexiconEntry>,
    pub category_counts: Vec<(Category, usize)>,
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver of periodic snapshots. Transport and persistence are the
/// sink's business.
pub trait StatsSink: Send + Sync {
    fn emit(&self, snapshot: &StatsSnapshot);
}

/// Logs each snapshot at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatsSink for TracingSink {
    fn emit(&self, s: &StatsSnapshot) {
        tracing::info!(
            tokens = s.tokens_checked,
            cache_hit_rate = s.cache_hit_rate,
            store_hit_rate = s.store_hit_rate,
            probe_hits = s.probe_hits,
            classifier_hits = s.classifier_hits,
            degraded = s.degraded_lookups,
            learned_rules = s.learned_rules,
            unique_patterns = s.unique_patterns,
            "detection stats"
        );
    }
}

/// Emit `source()` to `sink` every `period` until aborted.
pub fn spawn_reporter<F>(
    period: Duration,
    source: F,
    sink: Arc<dyn StatsSink>,
    runtime: &tokio::runtime::Handle,
) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> StatsSnapshot + Send + Sync + 'static,
{
    let period = period.max(Duration::from_millis(1));
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            sink.emit(&source());
        }
    })
}
