// Time-bounded token -> match-result cache shared across detections

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use lexguard_core::entry::{EntryId, LexiconEntry};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" for cache ageing.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. For tests.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// What the cache remembers about a token.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedOutcome {
    /// The token matched this entry (snapshot at caching time).
    Hit(LexiconEntry),
    /// The token matched nothing.
    Miss,
}

impl CachedOutcome {
    pub fn entry_id(&self) -> Option<EntryId> {
        match self {
            CachedOutcome::Hit(e) => Some(e.id),
            CachedOutcome::Miss => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    outcome: CachedOutcome,
    inserted_at: Instant,
}

/// Token -> outcome memo with a fixed TTL.
///
/// Both hits and misses are cached. An entry at least `ttl` old is a miss
/// on `get` even if the sweep has not removed it yet.
pub struct MatchCache {
    slots: DashMap<String, Slot>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MatchCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        now.saturating_duration_since(slot.inserted_at) >= self.ttl
    }

    /// Fresh outcome for `token`, if any. Stale entries are evicted.
    pub fn get(&self, token: &str) -> Option<CachedOutcome> {
        let now = self.clock.now();
        {
            let slot = self.slots.get(token)?;
            if !self.is_expired(&slot, now) {
                return Some(slot.outcome.clone());
            }
        }
        // The read guard must be released before removing.
        self.slots.remove_if(token, |_, s| self.is_expired(s, now));
        None
    }

    pub fn put(&self, token: &str, outcome: CachedOutcome) {
        self.slots.insert(
            token.to_string(),
            Slot {
                outcome,
                inserted_at: self.clock.now(),
            },
        );
    }

    /// Store `outcome` unless a fresh entry for `token` already exists.
    pub fn put_if_absent(&self, token: &str, outcome: CachedOutcome) {
        let now = self.clock.now();
        let mut slot = self.slots.entry(token.to_string()).or_insert_with(|| Slot {
            outcome: outcome.clone(),
            inserted_at: now,
        });
        if self.is_expired(&slot, now) {
            *slot = Slot {
                outcome,
                inserted_at: now,
            };
        }
    }

    pub fn remove(&self, token: &str) {
        self.slots.remove(token);
    }

    /// Drop every cached hit that points at `id`.
    pub fn invalidate_entry(&self, id: EntryId) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, s| s.outcome.entry_id() != Some(id));
        before.saturating_sub(self.slots.len())
    }

    /// Remove stale entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.slots.len();
        self.slots.retain(|_, s| !self.is_expired(s, now));
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.slots.len(), "swept match cache");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}

/// Sweep `cache` once per TTL on the given runtime until the handle is
/// aborted or the runtime shuts down.
pub fn spawn_sweeper(
    cache: Arc<MatchCache>,
    runtime: &tokio::runtime::Handle,
) -> tokio::task::JoinHandle<()> {
    let period = cache.ttl().max(Duration::from_millis(1));
    runtime.spawn(async move {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            cache.sweep();
        }
    })
}
