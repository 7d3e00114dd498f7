// Variation generation status: candidate budget, deduplication, seeded RNG

use std::collections::HashSet;

use lexguard_core::enums::VariantOrigin;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::VariationCandidate;

/// Which way generation runs relative to the lexicon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// From a base word towards obfuscated spellings.
    #[default]
    Forward,
    /// From an observed token back towards base words.
    Reverse,
}

/// Tracks the state of one `generate` call: the word, the candidates found
/// so far, the budget and the random source shared by sampled passes.
pub struct VariationStatus<'a> {
    word: &'a [char],
    max_candidates: usize,
    candidates: Vec<VariationCandidate>,
    seen: HashSet<String>,
    rng: StdRng,
    direction: Direction,
}

impl<'a> VariationStatus<'a> {
    /// Create a status for `word`. The RNG is seeded from `seed` and the
    /// word itself, so a word always yields the same candidates for a seed.
    pub fn new(word: &'a [char], max_candidates: usize, seed: u64) -> Self {
        Self {
            word,
            max_candidates,
            candidates: Vec::new(),
            seen: HashSet::new(),
            rng: StdRng::seed_from_u64(seed ^ word_hash(word)),
            direction: Direction::Forward,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` once the candidate budget is spent.
    pub fn should_abort(&self) -> bool {
        self.candidates.len() >= self.max_candidates
    }

    /// Add a candidate. Empty strings, duplicates and anything past the
    /// budget are silently ignored.
    pub fn add(&mut self, text: String, origin: VariantOrigin) {
        if self.should_abort() || text.is_empty() {
            return;
        }
        if !self.seen.insert(text.clone()) {
            return; // duplicate
        }
        self.candidates.push(VariationCandidate { text, origin });
    }

    /// Add a candidate built from chars.
    pub fn add_chars(&mut self, chars: &[char], origin: VariantOrigin) {
        if self.should_abort() {
            return;
        }
        self.add(chars.iter().collect(), origin);
    }

    pub fn word(&self) -> &'a [char] {
        self.word
    }

    pub fn word_len(&self) -> usize {
        self.word.len()
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidates(&self) -> &[VariationCandidate] {
        &self.candidates
    }

    pub fn into_candidates(self) -> Vec<VariationCandidate> {
        self.candidates
    }
}

/// FNV-1a over the word's chars; stable across runs and platforms.
fn word_hash(word: &[char]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    word.iter().fold(OFFSET, |h, &c| (h ^ c as u64).wrapping_mul(PRIME))
}
