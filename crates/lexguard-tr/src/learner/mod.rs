// Pattern learning: turn confirmed (base, variant) pairs into replayable rules

pub mod similarity;

use std::fmt;

use dashmap::{DashMap, DashSet};

pub use similarity::{levenshtein, similarity};

/// A transformation rule inferred from one observed variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LearnedRule {
    /// Replace every occurrence of each `from` with `to`, in order.
    CharMap(Vec<(char, char)>),
    /// Drop this many characters from the end.
    Trim(usize),
    /// Append this many copies of the last character.
    Append(usize),
}

impl LearnedRule {
    /// Derive a rule from a positional diff of `base` against `variant`.
    ///
    /// Differences within the common length give a [`LearnedRule::CharMap`];
    /// without any, a length difference gives `Trim` or `Append`. Identical
    /// words give `None`.
    pub fn derive(base: &[char], variant: &[char]) -> Option<Self> {
        let common = base.len().min(variant.len());
        let mut map: Vec<(char, char)> = Vec::new();
        for (&b, &v) in base[..common].iter().zip(&variant[..common]) {
            if b != v && !map.contains(&(b, v)) {
                map.push((b, v));
            }
        }
        if !map.is_empty() {
            return Some(LearnedRule::CharMap(map));
        }
        match base.len().cmp(&variant.len()) {
            std::cmp::Ordering::Greater => Some(LearnedRule::Trim(base.len() - variant.len())),
            std::cmp::Ordering::Less => Some(LearnedRule::Append(variant.len() - base.len())),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Apply the rule to `word`. Returns `None` when it does not apply or
    /// leaves the word unchanged.
    pub fn apply(&self, word: &str) -> Option<String> {
        let out = match self {
            LearnedRule::CharMap(map) => {
                let mut s = word.to_string();
                for &(from, to) in map {
                    s = s.replace(from, to.encode_utf8(&mut [0; 4]));
                }
                s
            }
            LearnedRule::Trim(n) => {
                let len = word.chars().count();
                if *n >= len {
                    return None;
                }
                word.chars().take(len - n).collect()
            }
            LearnedRule::Append(n) => {
                let last = word.chars().last()?;
                let mut s = word.to_string();
                s.extend(std::iter::repeat_n(last, *n));
                s
            }
        };
        (out != word).then_some(out)
    }

    /// The rule that undoes this one: a swapped char map (applied in
    /// reverse order), and `Trim`/`Append` exchanged.
    pub fn inverse(&self) -> Self {
        match self {
            LearnedRule::CharMap(map) => {
                LearnedRule::CharMap(map.iter().rev().map(|&(from, to)| (to, from)).collect())
            }
            LearnedRule::Trim(n) => LearnedRule::Append(*n),
            LearnedRule::Append(n) => LearnedRule::Trim(*n),
        }
    }
}

impl fmt::Display for LearnedRule {
    /// Compact signature: `a->@,m->n`, `trim:1`, `add:2`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnedRule::CharMap(map) => {
                for (i, (from, to)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{from}->{to}")?;
                }
                Ok(())
            }
            LearnedRule::Trim(n) => write!(f, "trim:{n}"),
            LearnedRule::Append(n) => write!(f, "add:{n}"),
        }
    }
}

/// Summary of what the learner holds.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct LearnerStats {
    /// Rules across all base words.
    pub rule_count: usize,
    /// Distinct rule signatures ever observed.
    pub unique_patterns: usize,
    /// Base words with the most observations, most first.
    pub top_base_words: Vec<(String, u64)>,
}

/// Learned rules keyed by origin base word, shared across tasks.
pub struct PatternLearner {
    rules: DashMap<String, Vec<LearnedRule>>,
    signatures: DashSet<String>,
    observations: DashMap<String, u64>,
    threshold: f64,
    top_bases: usize,
}

impl PatternLearner {
    /// Create a learner replaying rules for inputs at least `threshold`
    /// similar to the rule's origin word.
    pub fn new(threshold: f64) -> Self {
        Self {
            rules: DashMap::new(),
            signatures: DashSet::new(),
            observations: DashMap::new(),
            threshold,
            top_bases: 10,
        }
    }

    pub fn with_top_bases(mut self, top_bases: usize) -> Self {
        self.top_bases = top_bases;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Record a confirmed variant of `base`.
    ///
    /// Returns the derived rule, or `None` if the two are identical.
    pub fn observe(&self, base: &str, variant: &str) -> Option<LearnedRule> {
        let b: Vec<char> = base.chars().collect();
        let v: Vec<char> = variant.chars().collect();
        let rule = LearnedRule::derive(&b, &v)?;

        let mut rules = self.rules.entry(base.to_string()).or_default();
        if !rules.contains(&rule) {
            rules.push(rule.clone());
        }
        drop(rules);

        self.signatures.insert(rule.to_string());
        *self.observations.entry(base.to_string()).or_insert(0) += 1;
        tracing::debug!(base, variant, rule = %rule, "learned variation rule");
        Some(rule)
    }

    /// Apply every rule whose origin word is similar enough to `word`.
    ///
    /// This runs rules forward, from a base word towards obfuscated
    /// spellings. Origins are visited in lexical order so output is stable.
    /// Never mutates the rule table.
    pub fn replay(&self, word: &str) -> Vec<String> {
        self.apply_similar(word, |rule, w| rule.apply(w))
    }

    /// Undo every rule whose origin word is similar enough to `token`.
    ///
    /// The counterpart of [`replay`](Self::replay) for observed tokens:
    /// `s@lak` under a learned `a->@` gives back `salak`, `salakkk` under
    /// `add:2` gives back `salak`.
    pub fn revert(&self, token: &str) -> Vec<String> {
        self.apply_similar(token, |rule, w| rule.inverse().apply(w))
    }

    fn apply_similar(
        &self,
        word: &str,
        apply: impl Fn(&LearnedRule, &str) -> Option<String>,
    ) -> Vec<String> {
        let mut origins: Vec<(String, Vec<LearnedRule>)> = self
            .rules
            .iter()
            .filter(|e| similarity(word, e.key()) >= self.threshold)
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        origins.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out: Vec<String> = Vec::new();
        for (_, rules) in &origins {
            for rule in rules {
                if let Some(s) = apply(rule, word) {
                    if !out.contains(&s) {
                        out.push(s);
                    }
                }
            }
        }
        out
    }

    /// Rules stored for `base`.
    pub fn rules_for(&self, base: &str) -> Vec<LearnedRule> {
        self.rules.get(base).map(|r| r.clone()).unwrap_or_default()
    }

    pub fn stats(&self) -> LearnerStats {
        let mut top: Vec<(String, u64)> = self
            .observations
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(self.top_bases);
        LearnerStats {
            rule_count: self.rules.iter().map(|e| e.value().len()).sum(),
            unique_patterns: self.signatures.len(),
            top_base_words: top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn derive_char_map() {
        assert_eq!(
            LearnedRule::derive(&chars("amk"), &chars("@mq")),
            Some(LearnedRule::CharMap(vec![('a', '@'), ('k', 'q')]))
        );
    }

    #[test]
    fn derive_length_rules() {
        assert_eq!(LearnedRule::derive(&chars("amk"), &chars("am")), Some(LearnedRule::Trim(1)));
        assert_eq!(
            LearnedRule::derive(&chars("amk"), &chars("amkkk")),
            Some(LearnedRule::Append(2))
        );
        assert_eq!(LearnedRule::derive(&chars("amk"), &chars("amk")), None);
    }

    #[test]
    fn char_map_wins_over_length_delta() {
        assert_eq!(
            LearnedRule::derive(&chars("mal"), &chars("m@ll")),
            Some(LearnedRule::CharMap(vec![('a', '@')]))
        );
    }

    #[test]
    fn apply_rules() {
        let map = LearnedRule::CharMap(vec![('a', '@')]);
        assert_eq!(map.apply("salak"), Some("s@l@k".to_string()));
        assert_eq!(map.apply("piç"), None);
        assert_eq!(LearnedRule::Trim(1).apply("salak"), Some("sala".to_string()));
        assert_eq!(LearnedRule::Trim(3).apply("abc"), None);
        assert_eq!(LearnedRule::Append(2).apply("mal"), Some("malll".to_string()));
        assert_eq!(LearnedRule::Append(1).apply(""), None);
    }

    #[test]
    fn signatures() {
        assert_eq!(LearnedRule::CharMap(vec![('a', '@'), ('k', 'q')]).to_string(), "a->@,k->q");
        assert_eq!(LearnedRule::Trim(1).to_string(), "trim:1");
        assert_eq!(LearnedRule::Append(3).to_string(), "add:3");
    }

    #[test]
    fn observe_dedups_rules_and_counts_observations() {
        let learner = PatternLearner::new(0.7);
        learner.observe("amk", "@mk");
        learner.observe("amk", "@mk");
        learner.observe("mal", "m@l");
        assert_eq!(learner.rules_for("amk"), vec![LearnedRule::CharMap(vec![('a', '@')])]);

        let stats = learner.stats();
        assert_eq!(stats.rule_count, 2);
        assert_eq!(stats.unique_patterns, 1);
        assert_eq!(stats.top_base_words[0], ("amk".to_string(), 2));
    }

    #[test]
    fn observe_identical_is_ignored() {
        let learner = PatternLearner::new(0.7);
        assert!(learner.observe("amk", "amk").is_none());
        assert_eq!(learner.stats().rule_count, 0);
    }

    #[test]
    fn replay_requires_similarity() {
        let learner = PatternLearner::new(0.7);
        learner.observe("salak", "s@lak");
        // "salaq" is 0.8 similar to "salak"
        assert_eq!(learner.replay("salaq"), vec!["s@l@q".to_string()]);
        // "kitap" is not
        assert!(learner.replay("kitap").is_empty());
    }

    #[test]
    fn inverse_undoes_rules() {
        let map = LearnedRule::CharMap(vec![('a', '@'), ('k', 'q')]);
        assert_eq!(map.inverse(), LearnedRule::CharMap(vec![('q', 'k'), ('@', 'a')]));
        assert_eq!(map.inverse().apply("@mq"), Some("amk".to_string()));
        assert_eq!(LearnedRule::Trim(1).inverse(), LearnedRule::Append(1));
        assert_eq!(LearnedRule::Append(2).inverse(), LearnedRule::Trim(2));
    }

    #[test]
    fn revert_recovers_the_base_word() {
        let learner = PatternLearner::new(0.7);
        learner.observe("salak", "s@lak");
        learner.observe("salak", "salakkk");
        assert_eq!(learner.revert("s@lak")[0], "salak");
        assert!(learner.revert("salakkk").contains(&"salak".to_string()));
        // Forward replay on an obfuscated token only obfuscates further.
        assert!(!learner.replay("s@lak").contains(&"salak".to_string()));
    }

    #[test]
    fn replay_does_not_mutate() {
        let learner = PatternLearner::new(0.7);
        learner.observe("amk", "amkk");
        let before = learner.stats();
        let _ = learner.replay("amk");
        assert_eq!(learner.stats(), before);
    }
}
