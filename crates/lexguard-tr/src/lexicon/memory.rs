// In-process lexicon store with an exact-match spelling index

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use hashbrown::HashMap;
use lexguard_core::entry::{
    Category, Confidence, EntryId, EntrySource, FalsePositivePolicy, LexiconEntry, NewEntry,
    Severity,
};
use lexguard_core::error::{LexiconError, ValidationError};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{CLASSIFIER_CONFIDENCE_CEILING, CLASSIFIER_CONFIDENCE_STEP, LexiconStore};
use crate::classifier::ClassifierVerdict;
use crate::normalizer::normalize_word;

/// Error type for loading seed data.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid seed entry: {0}")]
    Lexicon(#[from] LexiconError),
}

/// One entry of a JSON seed file.
///
/// ```json
/// [{ "word": "amk", "variations": ["@mk", "a.m.k"], "category": "insult", "severity": 4 }]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    #[serde(alias = "baseWord", alias = "base_word")]
    pub word: String,
    #[serde(default)]
    pub variations: Vec<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default, alias = "severityLevel")]
    pub severity: Severity,
    #[serde(default, alias = "confidenceScore")]
    pub confidence: Confidence,
}

impl SeedEntry {
    pub fn new(word: &str, variations: &[&str]) -> Self {
        Self {
            word: word.to_string(),
            variations: variations.iter().map(|v| v.to_string()).collect(),
            category: Category::default(),
            severity: Severity::default(),
            confidence: Confidence::default(),
        }
    }

    fn into_new_entry(self) -> (String, NewEntry) {
        (
            self.word,
            NewEntry {
                category: self.category,
                severity: self.severity,
                confidence: self.confidence,
                source: EntrySource::Manual,
                variations: self.variations,
                alternatives: Vec::new(),
            },
        )
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<EntryId, LexiconEntry>,
    /// Every spelling (base word and variations) to its owning entry.
    index: HashMap<String, EntryId>,
}

impl Inner {
    /// Insert a new entry. Variations already owned by another entry are
    /// dropped; a base word already in the index is a conflict.
    fn insert_new(&mut self, word: &str, attrs: NewEntry) -> Result<LexiconEntry, LexiconError> {
        let key = normalize_word(word).ok_or(ValidationError::EmptyWord)?;
        if self.index.contains_key(&key) {
            return Err(LexiconError::Conflict(format!("'{key}' is already in the lexicon")));
        }

        let mut variations = Vec::with_capacity(attrs.variations.len());
        for v in &attrs.variations {
            match normalize_word(v) {
                Some(v) if !self.index.contains_key(&v) => variations.push(v),
                Some(v) => tracing::debug!(word = %key, variant = %v, "variation owned by another entry, skipped"),
                None => {}
            }
        }

        let entry = LexiconEntry::new(&key, NewEntry { variations, ..attrs })?;
        for spelling in entry.spellings() {
            self.index.insert(spelling.to_string(), entry.id);
        }
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn active(&self, token: &str) -> Option<&LexiconEntry> {
        let id = self.index.get(token)?;
        self.entries.get(id).filter(|e| e.is_active)
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut LexiconEntry, LexiconError> {
        self.entries.get_mut(&id).ok_or(LexiconError::NotFound(id))
    }

    fn ranked<K: Ord>(&self, key: impl Fn(&LexiconEntry) -> K, limit: usize) -> Vec<LexiconEntry> {
        let mut out: Vec<&LexiconEntry> = self.entries.values().filter(|e| e.is_active).collect();
        out.sort_by(|a, b| key(b).cmp(&key(a)).then_with(|| a.base_word.cmp(&b.base_word)));
        out.into_iter().take(limit).cloned().collect()
    }
}

/// Lexicon held in memory behind an async read-write lock.
///
/// Lookups are exact and O(1) through the spelling index. All counter
/// updates happen under the write lock.
pub struct InMemoryLexicon {
    inner: RwLock<Inner>,
    policy: FalsePositivePolicy,
}

impl InMemoryLexicon {
    pub fn new() -> Self {
        Self::with_policy(FalsePositivePolicy::default())
    }

    pub fn with_policy(policy: FalsePositivePolicy) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            policy,
        }
    }

    /// Build a lexicon from seed entries.
    pub fn from_seed(
        seed: impl IntoIterator<Item = SeedEntry>,
        policy: FalsePositivePolicy,
    ) -> Result<Self, LexiconError> {
        let mut inner = Inner::default();
        for s in seed {
            let (word, attrs) = s.into_new_entry();
            inner.insert_new(&word, attrs)?;
        }
        Ok(Self {
            inner: RwLock::new(inner),
            policy,
        })
    }

    /// Build a lexicon from a JSON array of [`SeedEntry`].
    pub fn from_json_str(json: &str, policy: FalsePositivePolicy) -> Result<Self, SeedError> {
        let seed: Vec<SeedEntry> = serde_json::from_str(json)?;
        Ok(Self::from_seed(seed, policy)?)
    }

    pub fn from_path(path: impl AsRef<Path>, policy: FalsePositivePolicy) -> Result<Self, SeedError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json, policy)
    }

    pub fn policy(&self) -> &FalsePositivePolicy {
        &self.policy
    }

    /// Number of entries, active or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of every entry, ordered by base word.
    pub async fn snapshot(&self) -> Vec<LexiconEntry> {
        let inner = self.inner.read().await;
        let mut out: Vec<LexiconEntry> = inner.entries.values().cloned().collect();
        out.sort_by(|a, b| a.base_word.cmp(&b.base_word));
        out
    }
}

impl Default for InMemoryLexicon {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LexiconStore for InMemoryLexicon {
    async fn find_by_word_or_variation(
        &self,
        token: &str,
    ) -> Result<Option<LexiconEntry>, LexiconError> {
        Ok(self.inner.read().await.active(token).cloned())
    }

    async fn find_first_of(
        &self,
        candidates: &[String],
    ) -> Result<Option<(usize, LexiconEntry)>, LexiconError> {
        let inner = self.inner.read().await;
        Ok(candidates
            .iter()
            .enumerate()
            .find_map(|(i, c)| inner.active(c).map(|e| (i, e.clone()))))
    }

    async fn get(&self, id: EntryId) -> Result<Option<LexiconEntry>, LexiconError> {
        Ok(self.inner.read().await.entries.get(&id).cloned())
    }

    async fn record_detection(&self, id: EntryId) -> Result<(), LexiconError> {
        let mut inner = self.inner.write().await;
        inner.entry_mut(id)?.record_detection(Utc::now());
        Ok(())
    }

    async fn learn_variation(&self, id: EntryId, variant: &str) -> Result<bool, LexiconError> {
        let key = normalize_word(variant).ok_or(ValidationError::EmptyWord)?;
        let mut inner = self.inner.write().await;
        if let Some(&owner) = inner.index.get(&key) {
            if owner != id {
                return Err(LexiconError::Conflict(format!(
                    "'{key}' already belongs to another entry"
                )));
            }
        }

        let entry = inner.entry_mut(id)?;
        let added = entry.add_variation(&key);
        entry.variation_detections += 1;
        entry.updated_at = Utc::now();
        if added {
            inner.index.insert(key, id);
        }
        Ok(added)
    }

    async fn add_variations(&self, id: EntryId, variants: &[String]) -> Result<usize, LexiconError> {
        let mut guard = self.inner.write().await;
        let Inner { entries, index } = &mut *guard;
        let entry = entries.get_mut(&id).ok_or(LexiconError::NotFound(id))?;

        let mut added = 0;
        for v in variants {
            let Some(key) = normalize_word(v) else { continue };
            if index.contains_key(&key) {
                continue;
            }
            if entry.add_variation(&key) {
                index.insert(key, id);
                added += 1;
            }
        }
        if added > 0 {
            entry.updated_at = Utc::now();
        }
        Ok(added)
    }

    async fn create_from_detection(
        &self,
        word: &str,
        attrs: NewEntry,
    ) -> Result<LexiconEntry, LexiconError> {
        let key = normalize_word(word).ok_or(ValidationError::EmptyWord)?;
        let mut inner = self.inner.write().await;
        if let Some(&id) = inner.index.get(&key) {
            let entry = inner.entry_mut(id)?;
            entry.record_detection(Utc::now());
            return Ok(entry.clone());
        }
        let entry = inner.insert_new(&key, attrs)?;
        tracing::info!(word = %entry.base_word, source = ?entry.source, "added lexicon entry");
        Ok(entry)
    }

    async fn report_false_positive(&self, id: EntryId) -> Result<LexiconEntry, LexiconError> {
        let mut inner = self.inner.write().await;
        let entry = inner.entry_mut(id)?;
        if entry.record_false_positive(&self.policy, Utc::now()) {
            tracing::info!(
                word = %entry.base_word,
                reports = entry.false_positive_reports,
                detections = entry.detection_count,
                "lexicon entry deactivated"
            );
        }
        Ok(entry.clone())
    }

    async fn merge_classifier_data(
        &self,
        id: EntryId,
        verdict: &ClassifierVerdict,
    ) -> Result<LexiconEntry, LexiconError> {
        let mut guard = self.inner.write().await;
        let Inner { entries, index } = &mut *guard;
        let entry = entries.get_mut(&id).ok_or(LexiconError::NotFound(id))?;

        if entry.category == Category::Other {
            entry.category = verdict.category;
        }
        entry.severity = verdict.severity;
        for v in &verdict.suggested_variations {
            let Some(key) = normalize_word(v) else { continue };
            if index.get(&key).is_some_and(|owner| *owner != id) {
                continue;
            }
            if entry.add_variation(&key) {
                index.insert(key, id);
            }
        }
        for alt in &verdict.alternatives {
            entry.add_alternative(alt.clone());
        }
        entry.confidence = entry
            .confidence
            .raised(CLASSIFIER_CONFIDENCE_STEP, CLASSIFIER_CONFIDENCE_CEILING);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn find_by_category(
        &self,
        category: Category,
        severity: Option<Severity>,
    ) -> Result<Vec<LexiconEntry>, LexiconError> {
        let inner = self.inner.read().await;
        let mut out: Vec<LexiconEntry> = inner
            .entries
            .values()
            .filter(|e| e.is_active && e.category == category)
            .filter(|e| severity.is_none_or(|level| e.severity == level))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.detection_count
                .cmp(&a.detection_count)
                .then_with(|| a.base_word.cmp(&b.base_word))
        });
        Ok(out)
    }

    async fn most_detected(&self, limit: usize) -> Result<Vec<LexiconEntry>, LexiconError> {
        Ok(self.inner.read().await.ranked(|e| e.detection_count, limit))
    }

    async fn most_varied(&self, limit: usize) -> Result<Vec<LexiconEntry>, LexiconError> {
        Ok(self.inner.read().await.ranked(|e| e.variations.len(), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexguard_core::entry::Alternative;

    fn lexicon() -> InMemoryLexicon {
        InMemoryLexicon::from_seed(
            [
                SeedEntry::new("amk", &["@mk", "a.m.k", "amq"]),
                SeedEntry::new("mal", &["m@l"]),
            ],
            FalsePositivePolicy::default(),
        )
        .unwrap()
    }

    async fn id_of(lex: &InMemoryLexicon, word: &str) -> EntryId {
        lex.find_by_word_or_variation(word).await.unwrap().unwrap().id
    }

    #[tokio::test]
    async fn finds_base_and_variations() {
        let lex = lexicon();
        for token in ["amk", "@mk", "a.m.k", "amq"] {
            let e = lex.find_by_word_or_variation(token).await.unwrap().unwrap();
            assert_eq!(e.base_word, "amk");
        }
        assert!(lex.find_by_word_or_variation("temiz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seed_keys_are_normalized() {
        let lex = InMemoryLexicon::from_seed(
            [SeedEntry::new("  AMK ", &["@MK"])],
            FalsePositivePolicy::default(),
        )
        .unwrap();
        assert!(lex.find_by_word_or_variation("amk").await.unwrap().is_some());
        assert!(lex.find_by_word_or_variation("@mk").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_seed_word_is_a_conflict() {
        let result = InMemoryLexicon::from_seed(
            [SeedEntry::new("amk", &[]), SeedEntry::new("amk", &[])],
            FalsePositivePolicy::default(),
        );
        assert!(matches!(result, Err(LexiconError::Conflict(_))));
    }

    #[tokio::test]
    async fn find_first_of_keeps_candidate_order() {
        let lex = lexicon();
        let candidates: Vec<String> =
            ["xyz", "m@l", "amk"].iter().map(|s| s.to_string()).collect();
        let (i, e) = lex.find_first_of(&candidates).await.unwrap().unwrap();
        assert_eq!(i, 1);
        assert_eq!(e.base_word, "mal");
    }

    #[tokio::test]
    async fn record_detection_increments_counter() {
        let lex = lexicon();
        let id = id_of(&lex, "amk").await;
        lex.record_detection(id).await.unwrap();
        assert_eq!(lex.get(id).await.unwrap().unwrap().detection_count, 2);
        assert!(matches!(
            lex.record_detection(EntryId::new()).await,
            Err(LexiconError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn learn_variation_appends_once_and_indexes() {
        let lex = lexicon();
        let id = id_of(&lex, "amk").await;
        assert!(lex.learn_variation(id, "4mk").await.unwrap());
        assert!(!lex.learn_variation(id, "4mk").await.unwrap());
        assert!(!lex.learn_variation(id, "amk").await.unwrap());

        let e = lex.get(id).await.unwrap().unwrap();
        assert_eq!(e.variations.iter().filter(|v| *v == "4mk").count(), 1);
        assert_eq!(e.variation_detections, 3);
        assert_eq!(id_of(&lex, "4mk").await, id);
    }

    #[tokio::test]
    async fn learn_variation_rejects_other_entries_spellings() {
        let lex = lexicon();
        let id = id_of(&lex, "amk").await;
        assert!(matches!(
            lex.learn_variation(id, "m@l").await,
            Err(LexiconError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn add_variations_skips_known_and_foreign_spellings() {
        let lex = lexicon();
        let id = id_of(&lex, "amk").await;
        let before = lex.get(id).await.unwrap().unwrap();

        let variants: Vec<String> = ["@mk", "4mk", "m@l", "4mk", "a_m_k"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(lex.add_variations(id, &variants).await.unwrap(), 2);

        let after = lex.get(id).await.unwrap().unwrap();
        assert_eq!(after.variations, vec!["@mk", "a.m.k", "amq", "4mk", "a_m_k"]);
        assert_eq!(after.detection_count, before.detection_count);
        assert_eq!(after.variation_detections, before.variation_detections);
        assert_eq!(lex.find_by_word_or_variation("4mk").await.unwrap().unwrap().id, id);
        assert!(matches!(
            lex.add_variations(EntryId::new(), &variants).await,
            Err(LexiconError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_from_detection_inserts_or_bumps() {
        let lex = lexicon();
        let created = lex
            .create_from_detection(
                "Salak",
                NewEntry {
                    category: Category::Insult,
                    variations: vec!["s@lak".into(), "m@l".into()],
                    ..NewEntry::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.base_word, "salak");
        assert_eq!(created.variations, vec!["s@lak"]);
        assert_eq!(lex.len().await, 3);

        let again = lex.create_from_detection("salak", NewEntry::default()).await.unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.detection_count, 2);
        assert_eq!(lex.len().await, 3);
    }

    #[tokio::test]
    async fn false_positive_policy_deactivates() {
        let lex = lexicon();
        let id = id_of(&lex, "mal").await;
        // detection_count stays at 1, so the relative bound is trivially met.
        for _ in 0..20 {
            assert!(lex.report_false_positive(id).await.unwrap().is_active);
        }
        let e = lex.report_false_positive(id).await.unwrap();
        assert!(!e.is_active);
        assert_eq!(e.false_positive_reports, 21);
        assert!(lex.find_by_word_or_variation("mal").await.unwrap().is_none());
        assert!(lex.find_by_word_or_variation("m@l").await.unwrap().is_none());
        assert!(lex.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn merge_classifier_data_updates_entry() {
        let lex = lexicon();
        let id = id_of(&lex, "amk").await;
        let verdict = ClassifierVerdict {
            is_restricted: true,
            canonical_word: Some("amk".into()),
            category: Category::Insult,
            severity: Severity::new(5),
            suggested_variations: vec!["amına".into(), "m@l".into(), "@mk".into()],
            alternatives: vec![Alternative::new("vay be", 3)],
            confidence: None,
        };
        let e = lex.merge_classifier_data(id, &verdict).await.unwrap();
        assert_eq!(e.category, Category::Insult);
        assert_eq!(e.severity.level(), 5);
        assert!(e.variations.contains(&"amına".to_string()));
        assert!(!e.variations.contains(&"m@l".to_string()));
        assert!((e.confidence.value() - 0.90).abs() < 1e-9);
        assert_eq!(e.alternatives, vec![Alternative::new("vay be", 3)]);

        // An assigned category is kept; known alternatives are not repeated.
        let other = ClassifierVerdict {
            category: Category::Slang,
            alternatives: vec![Alternative::new("vay be", 5), Alternative::new("hay aksi", 4)],
            ..verdict
        };
        let e = lex.merge_classifier_data(id, &other).await.unwrap();
        assert_eq!(e.category, Category::Insult);
        assert_eq!(
            e.alternatives,
            vec![Alternative::new("vay be", 3), Alternative::new("hay aksi", 4)]
        );
        assert!((e.confidence.value() - 0.95).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rankings() {
        let lex = lexicon();
        let mal = id_of(&lex, "mal").await;
        lex.record_detection(mal).await.unwrap();

        let top = lex.most_detected(1).await.unwrap();
        assert_eq!(top[0].base_word, "mal");

        let varied = lex.most_varied(5).await.unwrap();
        assert_eq!(varied[0].base_word, "amk");
        assert_eq!(varied.len(), 2);

        assert_eq!(lex.find_by_category(Category::Other, None).await.unwrap().len(), 2);
        assert!(
            lex.find_by_category(Category::Other, Some(Severity::new(4)))
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            lex.all_spellings("@mk").await.unwrap(),
            vec!["amk", "@mk", "a.m.k", "amq"]
        );
    }

    #[tokio::test]
    async fn find_by_category_matches_exact_severity() {
        let seed = [("aptal", 2), ("salak", 3), ("gerizekalı", 4)].map(|(word, level)| SeedEntry {
            category: Category::Insult,
            severity: Severity::new(level),
            ..SeedEntry::new(word, &[])
        });
        let lex = InMemoryLexicon::from_seed(seed, FalsePositivePolicy::default()).unwrap();

        let found = lex
            .find_by_category(Category::Insult, Some(Severity::new(3)))
            .await
            .unwrap();
        let words: Vec<&str> = found.iter().map(|e| e.base_word.as_str()).collect();
        assert_eq!(words, vec!["salak"]);
        assert_eq!(lex.find_by_category(Category::Insult, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn loads_json_seed() {
        let lex = InMemoryLexicon::from_json_str(
            r#"[{"word": "amk", "variations": ["@mk"], "category": "insult", "severity": 4},
                {"baseWord": "mal"}]"#,
            FalsePositivePolicy::default(),
        )
        .unwrap();
        let e = lex.find_by_word_or_variation("@mk").await.unwrap().unwrap();
        assert_eq!(e.category, Category::Insult);
        assert_eq!(e.severity.level(), 4);
        assert!(lex.find_by_word_or_variation("mal").await.unwrap().is_some());

        assert!(matches!(
            InMemoryLexicon::from_json_str("{", FalsePositivePolicy::default()),
            Err(SeedError::Parse(_))
        ));
    }
}
