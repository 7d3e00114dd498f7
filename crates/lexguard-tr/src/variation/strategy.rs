// Variation strategy: which passes run, in what order, under which budget

use std::sync::Arc;

use super::passes::*;
use super::status::VariationStatus;
use crate::config::VariationOptions;
use crate::learner::PatternLearner;

/// An ordered list of passes run against one status.
pub struct VariationStrategy {
    passes: Vec<Box<dyn VariationPass>>,
}

impl VariationStrategy {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn push(&mut self, pass: Box<dyn VariationPass>) {
        self.passes.push(pass);
    }

    /// Names of the configured passes, in run order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass until the budget is spent.
    pub fn generate(&self, status: &mut VariationStatus<'_>) {
        for pass in &self.passes {
            if status.should_abort() {
                tracing::trace!(pass = pass.name(), "variation budget spent");
                return;
            }
            pass.generate(status);
        }
    }
}

impl Default for VariationStrategy {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the strategy for `options`.
///
/// Single substitution runs first so its candidates are never crowded out
/// by the budget; the sampled second-level pass runs last among the
/// table-driven ones. Learned replay needs a learner and is skipped without
/// one.
pub fn strategy_from_options(
    options: &VariationOptions,
    learner: Option<Arc<PatternLearner>>,
) -> VariationStrategy {
    let mut s = VariationStrategy::new();
    if options.substitution {
        s.push(Box::new(Substitution));
    }
    if options.repetition {
        s.push(Box::new(Repetition {
            max_expansions: options.max_expansions,
        }));
    }
    if options.spacing {
        s.push(Box::new(Spacing));
    }
    if options.phonetic {
        s.push(Box::new(Phonetic));
    }
    if options.learned {
        if let Some(learner) = learner {
            s.push(Box::new(LearnedReplay { learner }));
        }
    }
    if options.insertion_deletion {
        s.push(Box::new(InsertionDeletion {
            max_expansions: options.max_expansions,
        }));
    }
    if options.reversal {
        s.push(Box::new(Reversal {
            shuffle_max_len: options.shuffle_max_len,
        }));
    }
    if options.multi_substitution {
        s.push(Box::new(MultiSubstitution {
            rate: options.multi_substitution_rate,
        }));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_enable_every_pass() {
        let learner = Arc::new(PatternLearner::new(0.7));
        let s = strategy_from_options(&VariationOptions::default(), Some(learner));
        assert_eq!(
            s.pass_names(),
            vec![
                "substitution",
                "repetition",
                "spacing",
                "phonetic",
                "learned",
                "insertion_deletion",
                "reversal",
                "multi_substitution",
            ]
        );
    }

    #[test]
    fn learned_pass_needs_a_learner() {
        let s = strategy_from_options(&VariationOptions::default(), None);
        assert!(!s.pass_names().contains(&"learned"));
    }

    #[test]
    fn disabled_passes_are_left_out() {
        let opts = VariationOptions {
            reversal: false,
            spacing: false,
            multi_substitution: false,
            ..VariationOptions::default()
        };
        let names = strategy_from_options(&opts, None).pass_names();
        assert!(!names.contains(&"reversal"));
        assert!(!names.contains(&"spacing"));
        assert!(!names.contains(&"multi_substitution"));
        assert!(names.contains(&"substitution"));
    }
}
