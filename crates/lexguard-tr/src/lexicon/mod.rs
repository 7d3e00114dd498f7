// Lexicon store contract: lookup and mutation of restricted terms.
//
// The engine only depends on this trait. `memory` provides an in-process
// implementation; persistent backends implement the same contract and own
// their own consistency.

pub mod memory;

use std::future::Future;

use async_trait::async_trait;
use lexguard_core::entry::{Category, EntryId, LexiconEntry, NewEntry, Severity};
use lexguard_core::error::LexiconError;

use crate::classifier::ClassifierVerdict;

pub use memory::{InMemoryLexicon, SeedEntry, SeedError};

/// Confidence gained each time the classifier confirms an entry.
pub const CLASSIFIER_CONFIDENCE_STEP: f64 = 0.05;

/// Classifier confirmations never push confidence past this.
pub const CLASSIFIER_CONFIDENCE_CEILING: f64 = 0.95;

#[async_trait]
pub trait LexiconStore: Send + Sync {
    /// Active entry whose base word or a stored variation equals `token`.
    async fn find_by_word_or_variation(
        &self,
        token: &str,
    ) -> Result<Option<LexiconEntry>, LexiconError>;

    /// The first candidate, in order, that matches an active entry, with its
    /// index into `candidates`.
    async fn find_first_of(
        &self,
        candidates: &[String],
    ) -> Result<Option<(usize, LexiconEntry)>, LexiconError> {
        for (i, c) in candidates.iter().enumerate() {
            if let Some(entry) = self.find_by_word_or_variation(c).await? {
                return Ok(Some((i, entry)));
            }
        }
        Ok(None)
    }

    /// Entry by id, active or not.
    async fn get(&self, id: EntryId) -> Result<Option<LexiconEntry>, LexiconError>;

    /// Count a detection and stamp the last-seen time.
    async fn record_detection(&self, id: EntryId) -> Result<(), LexiconError>;

    /// Store `variant` on the entry if absent and count a variation
    /// detection. Returns `true` if the variant was new.
    async fn learn_variation(&self, id: EntryId, variant: &str) -> Result<bool, LexiconError>;

    /// Store every spelling in `variants` the entry does not already have,
    /// skipping spellings owned by another entry. Counts no detections.
    /// Returns how many were added.
    async fn add_variations(&self, id: EntryId, variants: &[String]) -> Result<usize, LexiconError>;

    /// Insert a new entry for `word`. If the word is already known, the
    /// existing entry gets a detection instead and is returned.
    async fn create_from_detection(
        &self,
        word: &str,
        attrs: NewEntry,
    ) -> Result<LexiconEntry, LexiconError>;

    /// Count a false-positive report and apply the deactivation policy.
    async fn report_false_positive(&self, id: EntryId) -> Result<LexiconEntry, LexiconError>;

    /// Fold a classifier confirmation into an existing entry: fill an
    /// `Other` category, take the severity, append suggested variations and
    /// new alternatives, and raise confidence by a fixed step up to a
    /// ceiling.
    async fn merge_classifier_data(
        &self,
        id: EntryId,
        verdict: &ClassifierVerdict,
    ) -> Result<LexiconEntry, LexiconError>;

    /// Active entries in `category`, most detected first. With `severity`
    /// set, only entries at exactly that level.
    async fn find_by_category(
        &self,
        category: Category,
        severity: Option<Severity>,
    ) -> Result<Vec<LexiconEntry>, LexiconError>;

    /// Active entries ordered by detection count, highest first.
    async fn most_detected(&self, limit: usize) -> Result<Vec<LexiconEntry>, LexiconError>;

    /// Active entries ordered by number of stored variations, highest first.
    async fn most_varied(&self, limit: usize) -> Result<Vec<LexiconEntry>, LexiconError>;

    /// Every spelling (base word first) of the entry matching `token`.
    async fn all_spellings(&self, token: &str) -> Result<Vec<String>, LexiconError> {
        Ok(self
            .find_by_word_or_variation(token)
            .await?
            .map(|e| e.spellings().map(str::to_string).collect())
            .unwrap_or_default())
    }
}

/// Run a lexicon write, retrying up to `retries` times while the store
/// reports itself unavailable. Other errors are returned at once.
pub async fn retry_write<T, F, Fut>(
    op: &'static str,
    retries: u32,
    mut write: F,
) -> Result<T, LexiconError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LexiconError>>,
{
    let mut attempt = 0;
    loop {
        match write().await {
            Err(LexiconError::Unavailable(reason)) if attempt < retries => {
                attempt += 1;
                tracing::warn!(op, attempt, %reason, "lexicon write failed, retrying");
            }
            result => return result,
        }
    }
}
