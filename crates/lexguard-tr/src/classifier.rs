// Fallback classifier extension point and verdict parsing

use async_trait::async_trait;
use lexguard_core::entry::{Alternative, Category, Confidence, EntrySource, NewEntry, Severity};
use lexguard_core::error::ClassifierError;
use serde::Deserialize;

/// A heavier, non-deterministic judge consulted after every lexicon lookup
/// has failed. Implementations wrap a model or a remote service.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassifierVerdict, ClassifierError>;
}

/// What the classifier decided about a text.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierVerdict {
    pub is_restricted: bool,
    /// Canonical form of the offending word, if the classifier named one.
    pub canonical_word: Option<String>,
    pub category: Category,
    pub severity: Severity,
    pub suggested_variations: Vec<String>,
    /// Milder words the classifier proposed in place of the flagged one.
    pub alternatives: Vec<Alternative>,
    pub confidence: Option<Confidence>,
}

/// Wire shape of a verdict. Accepts both snake_case and camelCase keys.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "isRestricted", alias = "isSwear", alias = "is_swear")]
    is_restricted: bool,
    #[serde(default, alias = "canonicalWord", alias = "word")]
    canonical_word: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "severityLevel", alias = "severity_level")]
    severity: Option<u8>,
    #[serde(default, alias = "suggestedVariations", alias = "variations")]
    suggested_variations: Vec<String>,
    #[serde(default)]
    alternatives: Vec<RawAlternative>,
    #[serde(default, alias = "confidenceScore")]
    confidence: Option<f64>,
}

/// An alternative is either a bare word or `{ "word", "suitability" }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAlternative {
    Word(String),
    Rated { word: String, suitability: Option<u8> },
}

impl From<RawAlternative> for Alternative {
    fn from(raw: RawAlternative) -> Self {
        match raw {
            RawAlternative::Word(word) => Alternative::new(&word, Alternative::DEFAULT_SUITABILITY),
            RawAlternative::Rated { word, suitability } => {
                Alternative::new(&word, suitability.unwrap_or(Alternative::DEFAULT_SUITABILITY))
            }
        }
    }
}

impl ClassifierVerdict {
    /// A negative verdict.
    pub fn not_restricted() -> Self {
        Self {
            is_restricted: false,
            canonical_word: None,
            category: Category::Other,
            severity: Severity::default(),
            suggested_variations: Vec::new(),
            alternatives: Vec::new(),
            confidence: None,
        }
    }

    /// Parse a verdict out of a model response.
    ///
    /// The JSON object may be wrapped in prose or a fenced block; the text
    /// between the first `{` and the last `}` is parsed. Unknown categories
    /// become [`Category::Other`]; out-of-range severity is clamped.
    pub fn from_json(response: &str) -> Result<Self, ClassifierError> {
        let start = response.find('{');
        let end = response.rfind('}');
        let body = match (start, end) {
            (Some(s), Some(e)) if s < e => &response[s..=e],
            _ => return Err(ClassifierError::Malformed("no JSON object in response".into())),
        };
        let raw: RawVerdict =
            serde_json::from_str(body).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        Ok(Self {
            is_restricted: raw.is_restricted,
            canonical_word: raw
                .canonical_word
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty()),
            category: raw
                .category
                .as_deref()
                .and_then(|c| c.parse().ok())
                .unwrap_or_default(),
            severity: raw.severity.map(Severity::new).unwrap_or_default(),
            suggested_variations: raw.suggested_variations,
            alternatives: raw
                .alternatives
                .into_iter()
                .map(Alternative::from)
                .filter(|a| !a.word.is_empty())
                .collect(),
            confidence: raw.confidence.map(Confidence::new),
        })
    }

    /// Attributes for a lexicon entry created from this verdict.
    pub fn to_new_entry(&self) -> NewEntry {
        NewEntry {
            category: self.category,
            severity: self.severity,
            confidence: self.confidence.unwrap_or_default(),
            source: EntrySource::Classifier,
            variations: self.suggested_variations.clone(),
            alternatives: self.alternatives.clone(),
        }
    }
}
