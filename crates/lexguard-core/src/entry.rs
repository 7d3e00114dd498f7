// Lexicon entry model: canonical word, stored variations, metadata, counters

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Identifiers and bounded scores
// ---------------------------------------------------------------------------

/// Stable identifier of a lexicon entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Severity level, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a severity, clamping out-of-range values.
    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self(3)
    }
}

impl From<u8> for Severity {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

impl From<Severity> for u8 {
    fn from(s: Severity) -> u8 {
        s.0
    }
}

/// Confidence score, always within `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Create a confidence, clamping out-of-range values. NaN becomes 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Raise by `step`, never past `ceiling`. A score already above the
    /// ceiling is left alone.
    pub fn raised(self, step: f64, ceiling: f64) -> Self {
        if self.0 >= ceiling {
            return self;
        }
        Self::new((self.0 + step).min(ceiling))
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(0.85)
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

// ---------------------------------------------------------------------------
// Category and source
// ---------------------------------------------------------------------------

/// Kind of restricted term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Insult,
    Sexual,
    Religious,
    Slang,
    Racist,
    Sexist,
    Homophobic,
    Threat,
    Political,
    Discriminatory,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Insult,
        Category::Sexual,
        Category::Religious,
        Category::Slang,
        Category::Racist,
        Category::Sexist,
        Category::Homophobic,
        Category::Threat,
        Category::Political,
        Category::Discriminatory,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Insult => "insult",
            Category::Sexual => "sexual",
            Category::Religious => "religious",
            Category::Slang => "slang",
            Category::Racist => "racist",
            Category::Sexist => "sexist",
            Category::Homophobic => "homophobic",
            Category::Threat => "threat",
            Category::Political => "political",
            Category::Discriminatory => "discriminatory",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    /// Parses a category name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    #[default]
    Manual,
    Classifier,
    UserReport,
    Automatic,
    VariationMatch,
}

/// A milder word suggested in place of a restricted one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alternative {
    pub word: String,
    /// How well it fits, `1..=5`.
    #[serde(default = "Alternative::default_suitability")]
    pub suitability: u8,
}

impl Alternative {
    pub const DEFAULT_SUITABILITY: u8 = 3;

    /// Create an alternative, clamping `suitability` into `1..=5`.
    pub fn new(word: &str, suitability: u8) -> Self {
        Self {
            word: word.trim().to_string(),
            suitability: suitability.clamp(1, 5),
        }
    }

    fn default_suitability() -> u8 {
        Self::DEFAULT_SUITABILITY
    }
}

// ---------------------------------------------------------------------------
// False-positive policy
// ---------------------------------------------------------------------------

/// Deactivation rule for entries that keep getting reported.
///
/// An entry is deactivated only when its report count exceeds `min_reports`
/// **and** exceeds `ratio` times its detection count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FalsePositivePolicy {
    pub min_reports: u64,
    pub ratio: f64,
}

impl Default for FalsePositivePolicy {
    fn default() -> Self {
        Self {
            min_reports: 20,
            ratio: 0.3,
        }
    }
}

impl FalsePositivePolicy {
    pub fn should_deactivate(&self, reports: u64, detections: u64) -> bool {
        reports > self.min_reports && (reports as f64) > self.ratio * detections as f64
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Attributes for a new entry. Everything except the word itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEntry {
    pub category: Category,
    pub severity: Severity,
    pub confidence: Confidence,
    pub source: EntrySource,
    pub variations: Vec<String>,
    pub alternatives: Vec<Alternative>,
}

/// A restricted term together with its known spellings and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub id: EntryId,
    pub base_word: String,
    /// Alternate spellings; never contains `base_word`, never repeats.
    pub variations: Vec<String>,
    pub category: Category,
    pub severity: Severity,
    pub confidence: Confidence,
    pub source: EntrySource,
    /// Suggested replacements, unique by word.
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    pub is_active: bool,
    pub detection_count: u64,
    pub variation_detections: u64,
    pub false_positive_reports: u64,
    pub created_at: DateTime<Utc>,
    pub last_detected_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LexiconEntry {
    /// Build an entry for `base_word`.
    ///
    /// The word is trimmed; variations equal to it, empty or repeated are
    /// dropped. A created entry counts as detected once.
    pub fn new(base_word: &str, attrs: NewEntry) -> Result<Self, ValidationError> {
        let base_word = base_word.trim();
        if base_word.is_empty() {
            return Err(ValidationError::EmptyWord);
        }
        let now = Utc::now();
        let mut entry = Self {
            id: EntryId::new(),
            base_word: base_word.to_string(),
            variations: Vec::new(),
            category: attrs.category,
            severity: attrs.severity,
            confidence: attrs.confidence,
            source: attrs.source,
            alternatives: Vec::new(),
            is_active: true,
            detection_count: 1,
            variation_detections: 0,
            false_positive_reports: 0,
            created_at: now,
            last_detected_at: Some(now),
            updated_at: now,
        };
        for v in attrs.variations {
            entry.add_variation(&v);
        }
        for alt in attrs.alternatives {
            entry.add_alternative(alt);
        }
        Ok(entry)
    }

    /// Base word followed by every stored variation.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.base_word.as_str()).chain(self.variations.iter().map(String::as_str))
    }

    /// Returns `true` if `token` is the base word or a stored variation.
    pub fn matches(&self, token: &str) -> bool {
        self.spellings().any(|s| s == token)
    }

    /// Append a variation. Returns `false` for the base word itself, an
    /// empty string or a duplicate.
    pub fn add_variation(&mut self, variant: &str) -> bool {
        let variant = variant.trim();
        if variant.is_empty() || self.matches(variant) {
            return false;
        }
        self.variations.push(variant.to_string());
        true
    }

    /// Append an alternative unless one with the same word is already
    /// listed. Returns `false` for an empty or repeated word.
    pub fn add_alternative(&mut self, alt: Alternative) -> bool {
        if alt.word.is_empty() || self.alternatives.iter().any(|a| a.word == alt.word) {
            return false;
        }
        self.alternatives.push(alt);
        true
    }

    pub fn record_detection(&mut self, now: DateTime<Utc>) {
        self.detection_count += 1;
        self.last_detected_at = Some(now);
        self.updated_at = now;
    }

    /// Count a false-positive report and apply `policy`.
    ///
    /// Returns `true` if this report deactivated the entry.
    pub fn record_false_positive(&mut self, policy: &FalsePositivePolicy, now: DateTime<Utc>) -> bool {
        self.false_positive_reports += 1;
        self.updated_at = now;
        if self.is_active && policy.should_deactivate(self.false_positive_reports, self.detection_count) {
            self.is_active = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(word: &str, variations: &[&str]) -> LexiconEntry {
        LexiconEntry::new(
            word,
            NewEntry {
                variations: variations.iter().map(|s| s.to_string()).collect(),
                ..NewEntry::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn new_entry_drops_self_and_duplicate_variations() {
        let e = entry("amk", &["@mk", "amk", "@mk", "", "a.m.k"]);
        assert_eq!(e.variations, vec!["@mk", "a.m.k"]);
        assert_eq!(e.detection_count, 1);
        assert!(e.is_active);
    }

    #[test]
    fn empty_word_is_rejected() {
        assert_eq!(
            LexiconEntry::new("   ", NewEntry::default()),
            Err(ValidationError::EmptyWord)
        );
    }

    #[test]
    fn matches_base_and_variations() {
        let e = entry("amk", &["@mk"]);
        assert!(e.matches("amk"));
        assert!(e.matches("@mk"));
        assert!(!e.matches("4mk"));
    }

    #[test]
    fn alternatives_are_unique_by_word() {
        let mut e = entry("salak", &[]);
        assert!(e.add_alternative(Alternative::new("akılsız", 4)));
        assert!(!e.add_alternative(Alternative::new(" akılsız ", 2)));
        assert!(!e.add_alternative(Alternative::new("  ", 3)));
        assert_eq!(e.alternatives, vec![Alternative::new("akılsız", 4)]);
        assert_eq!(Alternative::new("x", 9).suitability, 5);

        let parsed: Alternative = serde_json::from_str(r#"{"word": "saf"}"#).unwrap();
        assert_eq!(parsed.suitability, Alternative::DEFAULT_SUITABILITY);
    }

    #[test]
    fn severity_and_confidence_are_clamped() {
        assert_eq!(Severity::new(0).level(), 1);
        assert_eq!(Severity::new(9).level(), 5);
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
    }

    #[test]
    fn confidence_raise_stops_at_ceiling() {
        let c = Confidence::new(0.93).raised(0.05, 0.95);
        assert!((c.value() - 0.95).abs() < 1e-9);
        let high = Confidence::new(0.99).raised(0.05, 0.95);
        assert!((high.value() - 0.99).abs() < 1e-9);
    }

    #[test]
    fn deactivates_when_both_thresholds_exceeded() {
        let policy = FalsePositivePolicy::default();
        let mut e = entry("amk", &[]);
        e.detection_count = 10;
        e.false_positive_reports = 20;
        assert!(e.record_false_positive(&policy, Utc::now()));
        assert_eq!(e.false_positive_reports, 21);
        assert!(!e.is_active);
    }

    #[test]
    fn stays_active_under_relative_threshold() {
        let policy = FalsePositivePolicy::default();
        let mut e = entry("amk", &[]);
        e.detection_count = 100;
        e.false_positive_reports = 24;
        assert!(!e.record_false_positive(&policy, Utc::now()));
        assert_eq!(e.false_positive_reports, 25);
        assert!(e.is_active);
    }

    #[test]
    fn stays_active_under_absolute_threshold() {
        let policy = FalsePositivePolicy::default();
        assert!(!policy.should_deactivate(20, 0));
        assert!(policy.should_deactivate(21, 0));
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Insult".parse::<Category>(), Ok(Category::Insult));
        assert_eq!(" sexual ".parse::<Category>(), Ok(Category::Sexual));
        assert!("unknown".parse::<Category>().is_err());
    }

    #[test]
    fn severity_serializes_as_number() {
        let json = serde_json::to_string(&Severity::new(4)).unwrap();
        assert_eq!(json, "4");
        let s: Severity = serde_json::from_str("12").unwrap();
        assert_eq!(s.level(), 5);
    }
}
