// Error taxonomy shared by the engine and its collaborators

use crate::entry::EntryId;

/// Malformed primary input. Detection resolves these locally as "no match".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The input text was empty or whitespace only.
    #[error("input text is empty")]
    EmptyInput,

    /// Normalization removed every token.
    #[error("input text contains no detectable tokens")]
    NoTokens,

    /// A lexicon word was empty after normalization.
    #[error("word is empty")]
    EmptyWord,
}

/// Lexicon store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexiconError {
    /// The backing store could not be reached or failed mid-operation.
    #[error("lexicon store unavailable: {0}")]
    Unavailable(String),

    /// No entry with the given id exists.
    #[error("lexicon entry not found: {0}")]
    NotFound(EntryId),

    /// The write would break spelling uniqueness.
    #[error("lexicon conflict: {0}")]
    Conflict(String),

    /// The supplied data failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Fallback classifier failures. These degrade to "not restricted".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    /// The classifier did not answer within the configured time.
    #[error("classifier timed out after {0} ms")]
    Timeout(u64),

    /// The classifier answered with something that could not be parsed.
    #[error("malformed classifier response: {0}")]
    Malformed(String),

    /// The classifier could not be reached.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}
