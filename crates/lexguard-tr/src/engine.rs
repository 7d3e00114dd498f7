// DetectionEngine: top-level integration point for restricted-term detection.
//
// Owns the match cache, pattern learner, variation generator, enrichment
// queue and statistics, and drives them against an injected lexicon store
// and optional classifier.
//
// Per token the engine walks:
//   cache -> direct / known-variation lookup -> algorithmic probe -> negative
// A probe hit schedules enrichment (store the variant, learn the rule) on
// the queue and returns without waiting for it.

use std::sync::Arc;
use std::time::Duration;

use lexguard_core::detection::{Detection, MatchedToken, TokenOutcome};
use lexguard_core::entry::{Category, EntryId, LexiconEntry, NewEntry};
use lexguard_core::enums::{DetectionPath, VariantOrigin};
use lexguard_core::error::{ClassifierError, LexiconError, ValidationError};
use tokio::task::JoinHandle;

use crate::cache::{CachedOutcome, Clock, MatchCache, SystemClock, spawn_sweeper};
use crate::classifier::{Classifier, ClassifierVerdict};
use crate::config::{ClassifierOptions, EngineOptions, VariationOptions};
use crate::enrichment::{EnrichmentQueue, EnrichmentTask, Rejected};
use crate::learner::PatternLearner;
use crate::lexicon::{LexiconStore, retry_write};
use crate::normalizer::{normalize, normalize_word};
use crate::stats::{LexiconSummary, StatsAggregator, StatsSink, StatsSnapshot, spawn_reporter};
use crate::variation::{VariationCandidate, VariationGenerator};

/// Error type for engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Background tasks need a Tokio runtime to run on.
    #[error("no Tokio runtime available to run background tasks")]
    NoRuntime,
}

/// Builder for [`DetectionEngine`].
pub struct DetectionEngineBuilder {
    store: Arc<dyn LexiconStore>,
    options: EngineOptions,
    classifier: Option<Arc<dyn Classifier>>,
    clock: Arc<dyn Clock>,
}

impl DetectionEngineBuilder {
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Clock used to age cache entries.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the engine and start its background tasks on the current
    /// Tokio runtime.
    pub fn build(self) -> Result<DetectionEngine, EngineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let options = self.options;

        let learner = Arc::new(
            PatternLearner::new(options.learner.similarity_threshold)
                .with_top_bases(options.learner.top_bases),
        );
        let cache = Arc::new(MatchCache::with_clock(options.cache.ttl(), self.clock));
        let stats = Arc::new(StatsAggregator::new());
        let generator = VariationGenerator::new(options.variation.clone(), Some(learner.clone()));
        let enrichment = EnrichmentQueue::spawn(
            self.store.clone(),
            learner.clone(),
            stats.clone(),
            &options.enrichment,
            &runtime,
        );
        let sweeper = options
            .cache
            .sweep
            .then(|| spawn_sweeper(cache.clone(), &runtime));

        tracing::debug!(
            ttl_secs = options.cache.ttl_secs,
            max_candidates = options.variation.max_candidates,
            classifier = self.classifier.is_some(),
            "detection engine ready"
        );

        Ok(DetectionEngine {
            store: self.store,
            cache,
            learner,
            generator,
            classifier: self.classifier,
            enrichment,
            stats,
            options,
            runtime,
            sweeper,
        })
    }
}

/// Detects restricted terms in free text, including obfuscated spellings.
///
/// Public detection calls never fail: store and classifier errors are
/// logged and degrade to "no match".
pub struct DetectionEngine {
    store: Arc<dyn LexiconStore>,
    cache: Arc<MatchCache>,
    learner: Arc<PatternLearner>,
    generator: VariationGenerator,
    classifier: Option<Arc<dyn Classifier>>,
    enrichment: EnrichmentQueue,
    stats: Arc<StatsAggregator>,
    options: EngineOptions,
    runtime: tokio::runtime::Handle,
    sweeper: Option<JoinHandle<()>>,
}

impl DetectionEngine {
    pub fn builder(store: Arc<dyn LexiconStore>) -> DetectionEngineBuilder {
        DetectionEngineBuilder {
            store,
            options: EngineOptions::default(),
            classifier: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Engine with default options and no classifier.
    pub fn new(store: Arc<dyn LexiconStore>) -> Result<Self, EngineError> {
        Self::builder(store).build()
    }

    // =========================================================================
    // Detection
    // =========================================================================

    /// Detect restricted terms in `text` using the lexicon only.
    ///
    /// Tokens are checked left to right; the first match is primary and
    /// every match is listed.
    pub async fn detect(&self, text: &str) -> Detection {
        let tokens = match tokenize(text) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::debug!(error = %e, "nothing to detect");
                return Detection::NoMatch;
            }
        };

        let mut primary: Option<LexiconEntry> = None;
        let mut matched = Vec::new();
        for token in tokens {
            if let TokenOutcome::Hit { entry, path } = self.check_token(&token).await {
                matched.push(MatchedToken {
                    original: token,
                    entry_id: entry.id,
                    base_word: entry.base_word.clone(),
                    path,
                });
                if primary.is_none() {
                    primary = Some(entry);
                }
            }
        }
        Detection::from_matches(matched, primary)
    }

    /// Like [`detect`](Self::detect), then ask the classifier (if any) when
    /// the lexicon found nothing. A restricted verdict adds or updates the
    /// lexicon entry.
    pub async fn analyze(&self, text: &str) -> Detection {
        let detection = self.detect(text).await;
        if detection.is_match() {
            return detection;
        }
        let Some(classifier) = &self.classifier else {
            return detection;
        };
        if text.trim().chars().count() < self.options.classifier.min_text_len {
            return detection;
        }
        self.classify(classifier.as_ref(), text)
            .await
            .unwrap_or(Detection::NoMatch)
    }

    /// Run one normalized token through the lookup chain.
    pub async fn check_token(&self, token: &str) -> TokenOutcome {
        self.stats.record_token();

        if let Some(cached) = self.cache.get(token) {
            self.stats.record_cache(true);
            return match cached {
                CachedOutcome::Hit(entry) => {
                    self.record_detection(entry.id).await;
                    TokenOutcome::Hit {
                        entry,
                        path: DetectionPath::Cache,
                    }
                }
                CachedOutcome::Miss => TokenOutcome::Miss,
            };
        }
        self.stats.record_cache(false);

        // Direct and known-variation lookup.
        match self.store.find_by_word_or_variation(token).await {
            Ok(Some(entry)) => {
                let path = if entry.base_word == token {
                    DetectionPath::Direct
                } else {
                    DetectionPath::KnownVariation
                };
                return self.hit(token, entry, path).await;
            }
            Ok(None) => {}
            Err(e) => return self.degraded(token, &e),
        }

        // Algorithmic probe.
        let candidates: Vec<String> = self
            .generator
            .generate_for_token(token)
            .into_iter()
            .filter(|c| c.origin != VariantOrigin::Base)
            .map(|c| c.text)
            .collect();
        self.stats.record_candidates(candidates.len());

        match self.store.find_first_of(&candidates).await {
            Ok(Some((i, entry))) => {
                tracing::debug!(
                    token,
                    candidate = %candidates[i],
                    base = %entry.base_word,
                    "matched through generated variation"
                );
                self.schedule_enrichment(&entry, token);
                self.hit(token, entry, DetectionPath::AlgorithmicProbe).await
            }
            Ok(None) => {
                self.stats.record_negative();
                self.cache.put(token, CachedOutcome::Miss);
                TokenOutcome::Miss
            }
            Err(e) => self.degraded(token, &e),
        }
    }

    async fn hit(&self, token: &str, entry: LexiconEntry, path: DetectionPath) -> TokenOutcome {
        self.stats.record_hit(path);
        self.record_detection(entry.id).await;
        self.cache.put(token, CachedOutcome::Hit(entry.clone()));
        if entry.base_word != token {
            self.cache
                .put_if_absent(&entry.base_word, CachedOutcome::Hit(entry.clone()));
        }
        TokenOutcome::Hit { entry, path }
    }

    fn degraded(&self, token: &str, error: &LexiconError) -> TokenOutcome {
        self.stats.record_degraded();
        tracing::warn!(token, %error, "lexicon lookup failed, treating token as clean");
        TokenOutcome::Miss
    }

    async fn record_detection(&self, id: EntryId) {
        let retries = self.options.enrichment.write_retries;
        if let Err(e) = retry_write("record_detection", retries, || self.store.record_detection(id)).await {
            tracing::warn!(entry = %id, error = %e, "failed to record detection");
        }
    }

    fn schedule_enrichment(&self, entry: &LexiconEntry, token: &str) {
        let task = EnrichmentTask {
            entry_id: entry.id,
            base_word: entry.base_word.clone(),
            variant: token.to_string(),
        };
        match self.enrichment.submit(task) {
            Ok(()) | Err(Rejected::Duplicate) => {}
            Err(reason) => {
                tracing::debug!(token, ?reason, "variation enrichment not scheduled");
            }
        }
    }

    // =========================================================================
    // Classifier fallback
    // =========================================================================

    async fn classify(&self, classifier: &dyn Classifier, text: &str) -> Option<Detection> {
        let verdict = match classify_within(classifier, text, &self.options.classifier).await {
            Ok(verdict) => verdict,
            Err(e) => {
                self.stats.record_classifier_failure();
                tracing::warn!(error = %e, "classifier failed, treating text as clean");
                return None;
            }
        };
        if !verdict.is_restricted {
            return None;
        }
        self.adopt_verdict(text, &verdict).await
    }

    /// Store a restricted verdict and turn it into a detection.
    async fn adopt_verdict(&self, text: &str, verdict: &ClassifierVerdict) -> Option<Detection> {
        let word = verdict
            .canonical_word
            .as_deref()
            .and_then(normalize_word)
            .or_else(|| normalize(text).into_iter().next())?;
        let retries = self.options.enrichment.write_retries;

        let entry = match self.store.find_by_word_or_variation(&word).await {
            Ok(Some(existing)) => {
                self.record_detection(existing.id).await;
                retry_write("merge_classifier_data", retries, || {
                    self.store.merge_classifier_data(existing.id, verdict)
                })
                .await
            }
            Ok(None) => {
                retry_write("create_from_detection", retries, || {
                    self.store.create_from_detection(&word, verdict.to_new_entry())
                })
                .await
            }
            Err(e) => Err(e),
        };
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(word = %word, error = %e, "failed to store classifier verdict");
                return None;
            }
        };

        // Earlier misses for these spellings are now wrong.
        for spelling in entry.spellings() {
            self.cache.remove(spelling);
        }
        self.stats.record_hit(DetectionPath::Classifier);
        tracing::info!(word = %entry.base_word, category = %entry.category, "classifier flagged text");

        let matched = vec![MatchedToken {
            original: word,
            entry_id: entry.id,
            base_word: entry.base_word.clone(),
            path: DetectionPath::Classifier,
        }];
        Some(Detection::from_matches(matched, Some(entry)))
    }

    // =========================================================================
    // Lexicon maintenance
    // =========================================================================

    /// Report a false positive for `id` and forget cached matches of it.
    pub async fn report_false_positive(&self, id: EntryId) -> Result<LexiconEntry, LexiconError> {
        let entry = self.store.report_false_positive(id).await?;
        let dropped = self.cache.invalidate_entry(id);
        tracing::debug!(entry = %id, dropped, active = entry.is_active, "false positive reported");
        Ok(entry)
    }

    /// Generate spellings of `word` and store the new ones on its entry,
    /// creating the entry when the word is unknown.
    ///
    /// Returns how many spellings were added.
    pub async fn enrich_variations(&self, word: &str) -> Result<usize, LexiconError> {
        let word = normalize_word(word).ok_or(ValidationError::EmptyWord)?;
        let retries = self.options.enrichment.write_retries;
        let entry = match self.store.find_by_word_or_variation(&word).await? {
            Some(entry) => entry,
            None => {
                retry_write("create_from_detection", retries, || {
                    self.store.create_from_detection(&word, NewEntry::default())
                })
                .await?
            }
        };

        // Only spellings that survive normalization as a single token can match.
        let variants: Vec<String> = self
            .generator
            .generate(&entry.base_word)
            .into_iter()
            .filter(|c| c.origin != VariantOrigin::Base)
            .map(|c| c.text)
            .filter(|t| normalize_word(t).as_deref() == Some(t.as_str()))
            .collect();
        let added = retry_write("add_variations", retries, || {
            self.store.add_variations(entry.id, &variants)
        })
        .await?;

        for v in &variants {
            self.cache.remove(v);
        }
        tracing::info!(word = %entry.base_word, generated = variants.len(), added, "enriched variations");
        Ok(added)
    }

    /// Every known spelling of the entry matching `word`.
    pub async fn all_spellings(&self, word: &str) -> Result<Vec<String>, LexiconError> {
        let Some(word) = normalize_word(word) else {
            return Ok(Vec::new());
        };
        self.store.all_spellings(&word).await
    }

    /// Most detected entries and active entry counts per category.
    pub async fn lexicon_summary(&self, limit: usize) -> Result<LexiconSummary, LexiconError> {
        let most_detected = self.store.most_detected(limit).await?;
        let mut category_counts = Vec::new();
        for category in Category::ALL {
            let n = self.store.find_by_category(category, None).await?.len();
            if n > 0 {
                category_counts.push((category, n));
            }
        }
        category_counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(LexiconSummary {
            most_detected,
            category_counts,
        })
    }

    // =========================================================================
    // Generation, statistics and accessors
    // =========================================================================

    /// Candidate spellings of `word` under the current options.
    pub fn generate_variations(&self, word: &str) -> Vec<VariationCandidate> {
        self.generator.generate(word)
    }

    /// Replace the variation options, e.g. to switch passes off under load.
    pub fn set_variation_options(&mut self, options: VariationOptions) {
        self.generator = VariationGenerator::new(options.clone(), Some(self.learner.clone()));
        self.options.variation = options;
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.learner.stats())
    }

    /// Emit [`stats`](Self::stats) to `sink` at the configured interval.
    pub fn spawn_stats_reporter(&self, sink: Arc<dyn StatsSink>) -> JoinHandle<()> {
        let stats = self.stats.clone();
        let learner = self.learner.clone();
        spawn_reporter(
            Duration::from_secs(self.options.stats.report_interval_secs),
            move || stats.snapshot(learner.stats()),
            sink,
            &self.runtime,
        )
    }

    /// Wait for queued enrichment work to finish.
    pub async fn wait_for_enrichment(&self) {
        self.enrichment.wait_idle().await;
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn cache(&self) -> &MatchCache {
        &self.cache
    }

    pub fn learner(&self) -> &PatternLearner {
        &self.learner
    }

    pub fn store(&self) -> &Arc<dyn LexiconStore> {
        &self.store
    }
}

impl Drop for DetectionEngine {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

/// Normalize `text`, rejecting input that yields no tokens.
fn tokenize(text: &str) -> Result<Vec<String>, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    let tokens = normalize(text);
    if tokens.is_empty() {
        return Err(ValidationError::NoTokens);
    }
    Ok(tokens)
}

/// Ask `classifier` about `text`, giving up after the configured timeout.
async fn classify_within(
    classifier: &dyn Classifier,
    text: &str,
    options: &ClassifierOptions,
) -> Result<ClassifierVerdict, ClassifierError> {
    tokio::time::timeout(options.timeout(), classifier.classify(text))
        .await
        .unwrap_or(Err(ClassifierError::Timeout(options.timeout_ms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::lexicon::{InMemoryLexicon, SeedEntry};
    use async_trait::async_trait;
    use lexguard_core::entry::FalsePositivePolicy;

    fn lexicon() -> Arc<InMemoryLexicon> {
        Arc::new(
            InMemoryLexicon::from_seed(
                [
                    SeedEntry::new("amk", &["@mk", "a.m.k", "amq"]),
                    SeedEntry::new("mal", &["m@l"]),
                ],
                FalsePositivePolicy::default(),
            )
            .unwrap(),
        )
    }

    fn paths_of(d: &Detection) -> Vec<DetectionPath> {
        d.matched_tokens().iter().map(|m| m.path).collect()
    }

    #[test]
    fn tokenize_rejects_empty_input() {
        assert_eq!(tokenize("   "), Err(ValidationError::EmptyInput));
        assert_eq!(tokenize("? !"), Err(ValidationError::NoTokens));
        assert_eq!(tokenize("Bu AMK"), Ok(vec!["bu".to_string(), "amk".to_string()]));
    }

    #[test]
    fn build_outside_runtime_fails() {
        let result = DetectionEngine::new(lexicon());
        assert!(matches!(result, Err(EngineError::NoRuntime)));
    }

    #[tokio::test]
    async fn direct_and_known_variation_paths() {
        let engine = DetectionEngine::new(lexicon()).unwrap();
        let d = engine.detect("amk ve m@l").await;
        let paths: Vec<DetectionPath> = d.matched_tokens().iter().map(|m| m.path).collect();
        assert_eq!(paths, vec![DetectionPath::Direct, DetectionPath::KnownVariation]);
        assert_eq!(d.primary_entry().unwrap().base_word, "amk");
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let engine = DetectionEngine::new(lexicon()).unwrap();
        engine.detect("amk").await;
        let d = engine.detect("amk").await;
        assert_eq!(d.matched_tokens()[0].path, DetectionPath::Cache);

        let snap = engine.stats();
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.direct_hits, 1);
    }

    #[tokio::test]
    async fn cache_hit_still_counts_detection() {
        let store = lexicon();
        let engine = DetectionEngine::new(store.clone()).unwrap();
        engine.detect("amk").await;
        engine.detect("amk").await;
        let e = store.find_by_word_or_variation("amk").await.unwrap().unwrap();
        assert_eq!(e.detection_count, 3);
    }

    #[tokio::test]
    async fn clean_tokens_are_cached_as_misses() {
        let engine = DetectionEngine::new(lexicon()).unwrap();
        assert!(!engine.detect("merhaba").await.is_match());
        assert_eq!(engine.cache().get("merhaba"), Some(CachedOutcome::Miss));
        assert_eq!(engine.stats().negatives, 1);
    }

    #[tokio::test]
    async fn expired_cache_entry_is_looked_up_again() {
        let clock = Arc::new(ManualClock::new());
        let engine = DetectionEngine::builder(lexicon())
            .clock(clock.clone())
            .build()
            .unwrap();
        engine.detect("amk").await;
        clock.advance(Duration::from_secs(3600));
        let d = engine.detect("amk").await;
        assert_eq!(d.matched_tokens()[0].path, DetectionPath::Direct);
    }

    #[tokio::test]
    async fn false_positive_invalidates_cache() {
        let engine = DetectionEngine::new(lexicon()).unwrap();
        let d = engine.detect("mal").await;
        let id = d.primary_entry().unwrap().id;
        assert!(engine.cache().get("mal").is_some());

        let e = engine.report_false_positive(id).await.unwrap();
        assert_eq!(e.false_positive_reports, 1);
        assert!(engine.cache().get("mal").is_none());
    }

    #[tokio::test]
    async fn summary_and_spellings() {
        let engine = DetectionEngine::new(lexicon()).unwrap();
        engine.detect("mal mal mal").await;
        let summary = engine.lexicon_summary(1).await.unwrap();
        assert_eq!(summary.most_detected[0].base_word, "mal");
        assert_eq!(summary.category_counts, vec![(Category::Other, 2)]);
        assert_eq!(engine.all_spellings("M@L").await.unwrap(), vec!["mal", "m@l"]);
    }

    #[tokio::test]
    async fn enrich_variations_stores_generated_spellings() {
        let store = lexicon();
        let engine = DetectionEngine::new(store.clone()).unwrap();

        let added = engine.enrich_variations("mal").await.unwrap();
        assert!(added > 0);
        let entry = store.find_by_word_or_variation("mal").await.unwrap().unwrap();
        assert_eq!(entry.variations.len(), added + 1);
        assert_eq!(entry.detection_count, 1);
        assert_eq!(paths_of(&engine.detect("m4l").await), vec![DetectionPath::KnownVariation]);

        assert_eq!(engine.enrich_variations("MAL").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn enrich_variations_creates_unknown_words() {
        let store = lexicon();
        let engine = DetectionEngine::new(store.clone()).unwrap();
        assert!(!engine.detect("s4lak").await.is_match());

        assert!(engine.enrich_variations("salak").await.unwrap() > 0);
        assert!(store.find_by_word_or_variation("salak").await.unwrap().is_some());
        // The cached miss was dropped.
        assert_eq!(paths_of(&engine.detect("s4lak").await), vec![DetectionPath::KnownVariation]);
        assert!(engine.enrich_variations("  ").await.is_err());
    }

    #[tokio::test]
    async fn disabling_passes_narrows_generated_lookup() {
        let mut engine = DetectionEngine::new(lexicon()).unwrap();
        engine.set_variation_options(VariationOptions {
            substitution: false,
            multi_substitution: false,
            ..VariationOptions::default()
        });
        assert!(!engine.detect("4mk").await.is_match());
    }

    struct SlowClassifier;

    #[async_trait]
    impl Classifier for SlowClassifier {
        async fn classify(&self, _text: &str) -> Result<ClassifierVerdict, ClassifierError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ClassifierVerdict::not_restricted())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_classifier_reports_timeout() {
        let options = ClassifierOptions {
            timeout_ms: 250,
            ..ClassifierOptions::default()
        };
        let result = classify_within(&SlowClassifier, "sen tam bir salak", &options).await;
        assert_eq!(result, Err(ClassifierError::Timeout(250)));
    }
}
