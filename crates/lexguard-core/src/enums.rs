// Shared enums: variation origins and detection paths

use serde::{Deserialize, Serialize};

/// The transformation pass that produced a variation candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantOrigin {
    /// The input word itself.
    Base,
    /// One confusable glyph swapped in.
    Substitution,
    /// A second substitution on top of a first-level one.
    MultiSubstitution,
    /// Repeated-letter collapse or vowel stretching.
    Repetition,
    /// One interior character deleted or a filler inserted.
    InsertionDeletion,
    /// Separators inserted or removed.
    Spacing,
    /// Reversed or shuffled letters.
    Reversal,
    /// Digraph or consonant-pair respelling.
    Phonetic,
    /// Replay of a rule learned from a confirmed variant.
    Learned,
}

impl VariantOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            VariantOrigin::Base => "base",
            VariantOrigin::Substitution => "substitution",
            VariantOrigin::MultiSubstitution => "multi_substitution",
            VariantOrigin::Repetition => "repetition",
            VariantOrigin::InsertionDeletion => "insertion_deletion",
            VariantOrigin::Spacing => "spacing",
            VariantOrigin::Reversal => "reversal",
            VariantOrigin::Phonetic => "phonetic",
            VariantOrigin::Learned => "learned",
        }
    }
}

/// How a token was matched to a lexicon entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPath {
    /// Served from the match cache.
    Cache,
    /// The token equals an entry's base word.
    Direct,
    /// The token equals a stored variation.
    KnownVariation,
    /// A generated candidate of the token matched the lexicon.
    AlgorithmicProbe,
    /// The fallback classifier flagged the text.
    Classifier,
}

impl DetectionPath {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionPath::Cache => "cache",
            DetectionPath::Direct => "direct",
            DetectionPath::KnownVariation => "known_variation",
            DetectionPath::AlgorithmicProbe => "algorithmic_probe",
            DetectionPath::Classifier => "classifier",
        }
    }
}

impl std::fmt::Display for DetectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
