// Background enrichment: store confirmed variants and learn from them
// without holding up the detection that found them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashSet;
use lexguard_core::entry::EntryId;
use lexguard_core::error::LexiconError;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use crate::config::EnrichmentOptions;
use crate::learner::PatternLearner;
use crate::lexicon::{LexiconStore, retry_write};
use crate::stats::StatsAggregator;

/// A confirmed variant of an entry, found by the algorithmic probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentTask {
    pub entry_id: EntryId,
    pub base_word: String,
    pub variant: String,
}

/// Why a task was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// The same (entry, variant) pair is already queued.
    Duplicate,
    /// The queue is at capacity.
    Full,
    /// The worker has stopped.
    Closed,
}

struct Shared {
    store: Arc<dyn LexiconStore>,
    learner: Arc<PatternLearner>,
    stats: Arc<StatsAggregator>,
    in_flight: DashSet<(EntryId, String)>,
    pending: AtomicUsize,
    idle: Notify,
    write_retries: u32,
}

impl Shared {
    fn finish(&self, task: &EnrichmentTask) {
        self.in_flight.remove(&(task.entry_id, task.variant.clone()));
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn process(&self, task: &EnrichmentTask) {
        let result = retry_write("learn_variation", self.write_retries, || {
            self.store.learn_variation(task.entry_id, &task.variant)
        })
        .await;

        match result {
            Ok(added) => {
                self.learner.observe(&task.base_word, &task.variant);
                self.stats.record_enrichment(true);
                tracing::debug!(
                    base = %task.base_word,
                    variant = %task.variant,
                    added,
                    "stored learned variation"
                );
            }
            Err(e @ LexiconError::Conflict(_)) => {
                self.stats.record_enrichment(false);
                tracing::debug!(variant = %task.variant, error = %e, "variation not stored");
            }
            Err(e) => {
                self.stats.record_enrichment(false);
                tracing::warn!(
                    base = %task.base_word,
                    variant = %task.variant,
                    error = %e,
                    "dropping variation enrichment"
                );
            }
        }
    }
}

/// Bounded queue drained by one worker task.
///
/// Submission never blocks and never fails the caller; the worker owns the
/// retry policy and logs failures.
pub struct EnrichmentQueue {
    tx: mpsc::Sender<EnrichmentTask>,
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

impl EnrichmentQueue {
    /// Start the worker on `runtime`.
    pub fn spawn(
        store: Arc<dyn LexiconStore>,
        learner: Arc<PatternLearner>,
        stats: Arc<StatsAggregator>,
        options: &EnrichmentOptions,
        runtime: &tokio::runtime::Handle,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<EnrichmentTask>(options.queue_capacity.max(1));
        let shared = Arc::new(Shared {
            store,
            learner,
            stats,
            in_flight: DashSet::new(),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            write_retries: options.write_retries,
        });

        let worker_shared = shared.clone();
        let worker = runtime.spawn(async move {
            while let Some(task) = rx.recv().await {
                worker_shared.process(&task).await;
                worker_shared.finish(&task);
            }
            tracing::debug!("enrichment worker stopped");
        });

        Self { tx, shared, worker }
    }

    /// Queue a task without waiting.
    pub fn submit(&self, task: EnrichmentTask) -> Result<(), Rejected> {
        let key = (task.entry_id, task.variant.clone());
        if !self.shared.in_flight.insert(key.clone()) {
            return Err(Rejected::Duplicate);
        }
        self.shared.pending.fetch_add(1, Ordering::AcqRel);

        if let Err(e) = self.tx.try_send(task) {
            self.shared.in_flight.remove(&key);
            if self.shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.shared.idle.notify_waiters();
            }
            self.shared.stats.record_enrichment_dropped();
            return Err(match e {
                mpsc::error::TrySendError::Full(t) => {
                    tracing::warn!(variant = %t.variant, "enrichment queue full, task dropped");
                    Rejected::Full
                }
                mpsc::error::TrySendError::Closed(_) => Rejected::Closed,
            });
        }
        Ok(())
    }

    /// Tasks queued or being processed.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Wait until every submitted task has been processed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 || self.worker.is_finished() {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for EnrichmentQueue {
    fn drop(&mut self) {
        // Queued tasks are abandoned along with the engine.
        self.worker.abort();
    }
}
