// Engine configuration: per-component options with defaults, loadable from TOML

use std::path::Path;
use std::time::Duration;

use lexguard_core::entry::FalsePositivePolicy;
use serde::{Deserialize, Serialize};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`EngineOptions`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options for the variation generator. Every pass can be switched off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariationOptions {
    pub substitution: bool,
    pub multi_substitution: bool,
    pub repetition: bool,
    pub insertion_deletion: bool,
    pub spacing: bool,
    pub reversal: bool,
    pub phonetic: bool,
    pub learned: bool,
    /// Generation stops once this many candidates exist.
    pub max_candidates: usize,
    /// Fraction of second-level substitutions kept.
    pub multi_substitution_rate: f64,
    /// Positions touched by vowel stretching and filler insertion.
    pub max_expansions: usize,
    /// Longest word that still gets a shuffled candidate.
    pub shuffle_max_len: usize,
    /// Seed for the sampled passes.
    pub seed: u64,
}

impl Default for VariationOptions {
    fn default() -> Self {
        Self {
            substitution: true,
            multi_substitution: true,
            repetition: true,
            insertion_deletion: true,
            spacing: true,
            reversal: true,
            phonetic: true,
            learned: true,
            max_candidates: 2000,
            multi_substitution_rate: 0.3,
            max_expansions: 3,
            shuffle_max_len: 6,
            seed: 0x5EED_1E55,
        }
    }
}

/// Options for the match cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    pub ttl_secs: u64,
    /// Run the periodic sweep task.
    pub sweep: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep: true,
        }
    }
}

impl CacheOptions {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Options for the pattern learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerOptions {
    /// Minimum similarity between an input and a rule's origin word for
    /// the rule to be replayed.
    pub similarity_threshold: f64,
    /// How many base words [`crate::learner::LearnerStats`] reports.
    pub top_bases: usize,
}

impl Default for LearnerOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            top_bases: 10,
        }
    }
}

/// Options for the enrichment queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentOptions {
    pub queue_capacity: usize,
    /// Retries after a failed lexicon write.
    pub write_retries: u32,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            write_retries: 1,
        }
    }
}

/// Options for the fallback classifier call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    pub timeout_ms: u64,
    /// Texts shorter than this (in characters, trimmed) skip the classifier.
    pub min_text_len: usize,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            min_text_len: 3,
        }
    }
}

impl ClassifierOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Options for periodic statistics reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsOptions {
    pub report_interval_secs: u64,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// All engine options. Missing TOML tables and keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub variation: VariationOptions,
    pub cache: CacheOptions,
    pub learner: LearnerOptions,
    pub enrichment: EnrichmentOptions,
    pub classifier: ClassifierOptions,
    pub stats: StatsOptions,
    pub false_positive: FalsePositivePolicy,
}

impl EngineOptions {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let opts = EngineOptions::from_toml_str("").unwrap();
        assert_eq!(opts, EngineOptions::default());
        assert_eq!(opts.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(opts.false_positive.min_reports, 20);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let opts = EngineOptions::from_toml_str(
            r#"
            [variation]
            reversal = false
            max_candidates = 50

            [cache]
            ttl_secs = 10

            [false_positive]
            ratio = 0.5
            "#,
        )
        .unwrap();
        assert!(!opts.variation.reversal);
        assert!(opts.variation.spacing);
        assert_eq!(opts.variation.max_candidates, 50);
        assert_eq!(opts.cache.ttl_secs, 10);
        assert!(opts.cache.sweep);
        assert_eq!(opts.false_positive.ratio, 0.5);
        assert_eq!(opts.false_positive.min_reports, 20);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = EngineOptions::from_toml_str("[cache]\nttl_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngineOptions::from_path("/nonexistent/lexguard.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
