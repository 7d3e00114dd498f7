// Individual variation passes: each applies one class of obfuscation to
// the word tracked by the status and adds the resulting candidates.

use std::sync::Arc;

use lexguard_core::enums::VariantOrigin;
use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index::sample;

use super::status::{Direction, VariationStatus};
use super::tables::{
    DIGRAPHS, FILLERS, SEPARATORS, STRETCHABLE, SubstitutionTable, is_separator,
    phonetic_partners,
};
use crate::learner::PatternLearner;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One class of spelling transformation.
///
/// Passes are independent; the strategy runs them in a fixed order and the
/// status deduplicates and enforces the budget.
pub trait VariationPass: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Add candidates derived from `status.word()`.
    fn generate(&self, status: &mut VariationStatus<'_>);
}

// =========================================================================
// Individual passes
// =========================================================================

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Replace one character with each confusable glyph, in both directions of
/// the substitution table.
pub struct Substitution;

impl VariationPass for Substitution {
    fn name(&self) -> &'static str {
        "substitution"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let table = SubstitutionTable::get();
        let word = status.word();
        let mut buf = word.to_vec();
        for i in 0..word.len() {
            for r in table.replacements(word[i]) {
                if status.should_abort() {
                    return;
                }
                buf[i] = r;
                status.add_chars(&buf, VariantOrigin::Substitution);
            }
            buf[i] = word[i];
        }
    }
}

/// Apply a second substitution at a later position on top of each
/// first-level one, keeping a sampled fraction of the combinations.
pub struct MultiSubstitution {
    pub rate: f64,
}

impl VariationPass for MultiSubstitution {
    fn name(&self) -> &'static str {
        "multi_substitution"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let rate = self.rate.clamp(0.0, 1.0);
        if rate == 0.0 {
            return;
        }
        let table = SubstitutionTable::get();
        let word = status.word();
        let mut buf = word.to_vec();
        for i in 0..word.len() {
            for first in table.replacements(word[i]) {
                buf[i] = first;
                for j in (i + 1)..word.len() {
                    for second in table.replacements(word[j]) {
                        if status.should_abort() {
                            return;
                        }
                        if !status.rng().gen_bool(rate) {
                            continue;
                        }
                        buf[j] = second;
                        status.add_chars(&buf, VariantOrigin::MultiSubstitution);
                    }
                    buf[j] = word[j];
                }
            }
            buf[i] = word[i];
        }
    }
}

// ---------------------------------------------------------------------------
// Repetition
// ---------------------------------------------------------------------------

/// Collapse repeated runs to one and to two characters; stretch vowels
/// into runs of three at a bounded number of positions.
pub struct Repetition {
    pub max_expansions: usize,
}

/// Collapse every run of the same character to at most `keep` characters.
pub fn collapse_runs(word: &[char], keep: usize) -> Vec<char> {
    let mut out: Vec<char> = Vec::with_capacity(word.len());
    let mut run = 0;
    for (i, &c) in word.iter().enumerate() {
        if i > 0 && word[i - 1] == c {
            run += 1;
        } else {
            run = 1;
        }
        if run <= keep {
            out.push(c);
        }
    }
    out
}

impl VariationPass for Repetition {
    fn name(&self) -> &'static str {
        "repetition"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let word = status.word();
        status.add_chars(&collapse_runs(word, 1), VariantOrigin::Repetition);
        status.add_chars(&collapse_runs(word, 2), VariantOrigin::Repetition);

        let positions = word
            .iter()
            .enumerate()
            .filter(|&(_, c)| STRETCHABLE.contains(c))
            .map(|(i, _)| i)
            .take(self.max_expansions);
        for i in positions {
            if status.should_abort() {
                return;
            }
            let mut buf: Vec<char> = Vec::with_capacity(word.len() + 2);
            buf.extend_from_slice(&word[..=i]);
            buf.push(word[i]);
            buf.push(word[i]);
            buf.extend_from_slice(&word[i + 1..]);
            status.add_chars(&buf, VariantOrigin::Repetition);
        }
    }
}

// ---------------------------------------------------------------------------
// Insertion / deletion
// ---------------------------------------------------------------------------

/// Delete each interior character; insert a random filler at a bounded,
/// randomly chosen set of interior boundaries.
pub struct InsertionDeletion {
    pub max_expansions: usize,
}

impl VariationPass for InsertionDeletion {
    fn name(&self) -> &'static str {
        "insertion_deletion"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let word = status.word();
        let len = word.len();
        if len < 3 {
            return;
        }

        for i in 1..len - 1 {
            if status.should_abort() {
                return;
            }
            let mut buf = word.to_vec();
            buf.remove(i);
            status.add_chars(&buf, VariantOrigin::InsertionDeletion);
        }

        if len <= 3 {
            return;
        }
        // Interior boundaries are 1..len; sample indices into that range.
        let amount = self.max_expansions.min(len - 1);
        let mut boundaries: Vec<usize> = sample(status.rng(), len - 1, amount)
            .into_iter()
            .map(|b| b + 1)
            .collect();
        boundaries.sort_unstable();
        for at in boundaries {
            if status.should_abort() {
                return;
            }
            let filler = FILLERS[status.rng().gen_range(0..FILLERS.len())];
            let mut buf = word.to_vec();
            buf.insert(at, filler);
            status.add_chars(&buf, VariantOrigin::InsertionDeletion);
        }
    }
}

// ---------------------------------------------------------------------------
// Spacing
// ---------------------------------------------------------------------------

/// Put separators between every pair of letters and at the midpoint; strip
/// separators from a word that already has them.
pub struct Spacing;

impl VariationPass for Spacing {
    fn name(&self) -> &'static str {
        "spacing"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let word = status.word();
        let len = word.len();

        if word.iter().any(|&c| is_separator(c)) {
            let merged: Vec<char> = word.iter().copied().filter(|&c| !is_separator(c)).collect();
            status.add_chars(&merged, VariantOrigin::Spacing);
        }

        if len >= 3 {
            for &sep in SEPARATORS {
                let mut buf: Vec<char> = Vec::with_capacity(len * 2);
                for (i, &c) in word.iter().enumerate() {
                    if i > 0 {
                        buf.push(sep);
                    }
                    buf.push(c);
                }
                status.add_chars(&buf, VariantOrigin::Spacing);
            }
        }

        if len >= 5 {
            let mid = len / 2;
            for &sep in SEPARATORS {
                let mut buf = word.to_vec();
                buf.insert(mid, sep);
                status.add_chars(&buf, VariantOrigin::Spacing);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reversal / shuffle
// ---------------------------------------------------------------------------

/// Full reversal always; a seeded shuffle for short words.
pub struct Reversal {
    pub shuffle_max_len: usize,
}

impl VariationPass for Reversal {
    fn name(&self) -> &'static str {
        "reversal"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let word = status.word();
        let reversed: Vec<char> = word.iter().rev().copied().collect();
        status.add_chars(&reversed, VariantOrigin::Reversal);

        if word.len() >= 2 && word.len() <= self.shuffle_max_len {
            let mut shuffled = word.to_vec();
            shuffled.shuffle(status.rng());
            status.add_chars(&shuffled, VariantOrigin::Reversal);
        }
    }
}

// ---------------------------------------------------------------------------
// Phonetic
// ---------------------------------------------------------------------------

/// Digraph respelling in both directions, then single swaps between
/// confusable consonant pairs.
pub struct Phonetic;

impl VariationPass for Phonetic {
    fn name(&self) -> &'static str {
        "phonetic"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let word = status.word();
        let text: String = word.iter().collect();

        for &(digraph, letter) in DIGRAPHS {
            if status.should_abort() {
                return;
            }
            if text.contains(digraph) {
                status.add(text.replace(digraph, letter), VariantOrigin::Phonetic);
            }
            if text.contains(letter) {
                status.add(text.replace(letter, digraph), VariantOrigin::Phonetic);
            }
        }

        let mut buf = word.to_vec();
        for i in 0..word.len() {
            for partner in phonetic_partners(word[i]) {
                if status.should_abort() {
                    return;
                }
                buf[i] = partner;
                status.add_chars(&buf, VariantOrigin::Phonetic);
            }
            buf[i] = word[i];
        }
    }
}

// ---------------------------------------------------------------------------
// Learned-pattern replay
// ---------------------------------------------------------------------------

/// Replay rules the learner derived from confirmed variants of similar words.
///
/// Forward generation applies the rules; reverse generation (an observed
/// token looking for its base word) applies their inverses.
pub struct LearnedReplay {
    pub learner: Arc<PatternLearner>,
}

impl VariationPass for LearnedReplay {
    fn name(&self) -> &'static str {
        "learned"
    }

    fn generate(&self, status: &mut VariationStatus<'_>) {
        let word: String = status.word().iter().collect();
        let candidates = match status.direction() {
            Direction::Forward => self.learner.replay(&word),
            Direction::Reverse => self.learner.revert(&word),
        };
        for candidate in candidates {
            if status.should_abort() {
                return;
            }
            status.add(candidate, VariantOrigin::Learned);
        }
    }
}
