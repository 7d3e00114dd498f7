// Variation generation: synthesize obfuscated spellings of a word.
//
// Each pass (passes.rs) covers one obfuscation technique. The strategy
// (strategy.rs) orders the enabled passes, and the status (status.rs)
// deduplicates, enforces the candidate budget and supplies the seeded RNG
// used by the sampled passes.

pub mod passes;
pub mod status;
pub mod strategy;
pub mod tables;

use std::sync::Arc;

use lexguard_core::character::lower_str;
use lexguard_core::enums::VariantOrigin;

use crate::config::VariationOptions;
use crate::learner::PatternLearner;
use status::{Direction, VariationStatus};
use strategy::{VariationStrategy, strategy_from_options};

/// A generated spelling tagged with the pass that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct VariationCandidate {
    pub text: String,
    pub origin: VariantOrigin,
}

/// Generates candidate spellings of a word.
pub struct VariationGenerator {
    strategy: VariationStrategy,
    options: VariationOptions,
}

impl VariationGenerator {
    /// Create a generator. `learner` feeds the learned-replay pass.
    pub fn new(options: VariationOptions, learner: Option<Arc<PatternLearner>>) -> Self {
        Self {
            strategy: strategy_from_options(&options, learner),
            options,
        }
    }

    pub fn options(&self) -> &VariationOptions {
        &self.options
    }

    /// Candidate spellings of `word`, in generation order and deduplicated.
    ///
    /// The lower-cased word itself always comes first, tagged
    /// [`VariantOrigin::Base`]. Output is reproducible for a given seed.
    pub fn generate(&self, word: &str) -> Vec<VariationCandidate> {
        self.run(word, Direction::Forward)
    }

    /// Candidate base spellings of an observed `token`.
    ///
    /// Same passes as [`generate`](Self::generate), except learned rules
    /// are undone instead of applied.
    pub fn generate_for_token(&self, token: &str) -> Vec<VariationCandidate> {
        self.run(token, Direction::Reverse)
    }

    fn run(&self, word: &str, direction: Direction) -> Vec<VariationCandidate> {
        let chars: Vec<char> = lower_str(word).chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        let mut status =
            VariationStatus::new(&chars, self.options.max_candidates.max(1), self.options.seed)
                .with_direction(direction);
        status.add_chars(&chars, VariantOrigin::Base);
        self.strategy.generate(&mut status);
        tracing::trace!(word, ?direction, candidates = status.candidate_count(), "generated variations");
        status.into_candidates()
    }

    /// Like [`generate`](Self::generate), returning only the spellings.
    pub fn generate_strings(&self, word: &str) -> Vec<String> {
        self.generate(word).into_iter().map(|c| c.text).collect()
    }

    /// Like [`generate_for_token`](Self::generate_for_token), returning only
    /// the spellings.
    pub fn generate_strings_for_token(&self, token: &str) -> Vec<String> {
        self.generate_for_token(token).into_iter().map(|c| c.text).collect()
    }
}

impl Default for VariationGenerator {
    fn default() -> Self {
        Self::new(VariationOptions::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tables::SUBSTITUTIONS;

    #[test]
    fn generate_contains_word() {
        let g = VariationGenerator::default();
        for w in ["amk", "mal", "şerefsiz", "ab", "orospu", "x"] {
            let out = g.generate_strings(w);
            assert_eq!(out[0], w);
            assert_eq!(g.generate(w)[0].origin, VariantOrigin::Base);
        }
    }

    #[test]
    fn generate_lowercases_input() {
        let g = VariationGenerator::default();
        assert_eq!(g.generate_strings("AMK")[0], "amk");
    }

    #[test]
    fn every_table_substitution_is_generated() {
        let g = VariationGenerator::default();
        for word in ["amk", "salak", "şerefsiz", "göt", "piç", "yavşak", "ibne"] {
            let out = g.generate_strings(word);
            let chars: Vec<char> = word.chars().collect();
            for (i, &c) in chars.iter().enumerate() {
                let Some(&(_, glyphs)) = SUBSTITUTIONS.iter().find(|(l, _)| *l == c) else {
                    continue;
                };
                for &glyph in glyphs {
                    let mut v = chars.clone();
                    v[i] = glyph;
                    let v: String = v.into_iter().collect();
                    assert!(out.contains(&v), "{word}: missing {v}");
                }
            }
        }
    }

    #[test]
    fn output_has_no_duplicates() {
        let g = VariationGenerator::default();
        let out = g.generate_strings("amk");
        let mut dedup = out.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(out.len(), dedup.len());
    }

    #[test]
    fn same_seed_same_candidates() {
        let a = VariationGenerator::default();
        let b = VariationGenerator::default();
        assert_eq!(a.generate("orospu"), b.generate("orospu"));
    }

    #[test]
    fn disabled_passes_contribute_nothing() {
        let opts = VariationOptions {
            substitution: false,
            multi_substitution: false,
            repetition: false,
            insertion_deletion: false,
            spacing: false,
            phonetic: false,
            learned: false,
            ..VariationOptions::default()
        };
        let g = VariationGenerator::new(opts, None);
        let out = g.generate("amk");
        assert!(
            out.iter()
                .all(|c| matches!(c.origin, VariantOrigin::Base | VariantOrigin::Reversal))
        );
        assert!(out.iter().any(|c| c.text == "kma"));
    }

    #[test]
    fn budget_caps_output() {
        let opts = VariationOptions {
            max_candidates: 10,
            ..VariationOptions::default()
        };
        let g = VariationGenerator::new(opts, None);
        assert_eq!(g.generate("orospu").len(), 10);
    }

    #[test]
    fn learned_rules_feed_generation() {
        let learner = Arc::new(PatternLearner::new(0.7));
        learner.observe("salak", "s@l@k");
        let g = VariationGenerator::new(VariationOptions::default(), Some(learner));
        let out = g.generate("salaq");
        assert!(
            out.iter()
                .any(|c| c.text == "s@l@q" && c.origin == VariantOrigin::Learned)
        );
    }

    #[test]
    fn learned_rules_are_undone_for_tokens() {
        let learner = Arc::new(PatternLearner::new(0.7));
        learner.observe("salak", "s@lak");
        learner.observe("salak", "salakkk");
        let opts = VariationOptions {
            substitution: false,
            multi_substitution: false,
            repetition: false,
            insertion_deletion: false,
            spacing: false,
            reversal: false,
            phonetic: false,
            ..VariationOptions::default()
        };
        let g = VariationGenerator::new(opts, Some(learner));

        assert_eq!(g.generate_for_token("s@lak")[1].text, "salak");
        assert_eq!(g.generate_for_token("s@lak")[1].origin, VariantOrigin::Learned);
        assert!(g.generate_strings_for_token("salakkk").contains(&"salak".to_string()));
        assert!(!g.generate_strings("s@lak").contains(&"salak".to_string()));
    }

    #[test]
    fn empty_word_generates_nothing() {
        assert!(VariationGenerator::default().generate("").is_empty());
    }
}
