// Detection results: per-token outcomes and the whole-text verdict

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::entry::{EntryId, LexiconEntry};
use crate::enums::DetectionPath;

/// One token of the input that matched a lexicon entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchedToken {
    /// The token as it appeared after normalization.
    pub original: String,
    pub entry_id: EntryId,
    pub base_word: String,
    pub path: DetectionPath,
}

/// Result of checking a single token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenOutcome {
    Hit {
        entry: LexiconEntry,
        path: DetectionPath,
    },
    Miss,
}

impl TokenOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, TokenOutcome::Hit { .. })
    }

    pub fn entry(&self) -> Option<&LexiconEntry> {
        match self {
            TokenOutcome::Hit { entry, .. } => Some(entry),
            TokenOutcome::Miss => None,
        }
    }
}

/// Result of analyzing a whole text.
///
/// `Match` always carries at least one matched token; `primary` is the entry
/// behind the first of them in input order.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Match {
        primary: LexiconEntry,
        matched_tokens: Vec<MatchedToken>,
    },
    NoMatch,
}

impl Detection {
    /// Build a result from per-token matches, in input order.
    ///
    /// `primary` is the entry behind the first matched token. Without
    /// tokens or a primary entry the result is `NoMatch`.
    pub fn from_matches(matched_tokens: Vec<MatchedToken>, primary: Option<LexiconEntry>) -> Self {
        match (matched_tokens.is_empty(), primary) {
            (false, Some(primary)) => Detection::Match {
                primary,
                matched_tokens,
            },
            _ => Detection::NoMatch,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Detection::Match { .. })
    }

    pub fn primary_entry(&self) -> Option<&LexiconEntry> {
        match self {
            Detection::Match { primary, .. } => Some(primary),
            Detection::NoMatch => None,
        }
    }

    pub fn matched_tokens(&self) -> &[MatchedToken] {
        match self {
            Detection::Match { matched_tokens, .. } => matched_tokens,
            Detection::NoMatch => &[],
        }
    }
}

impl Serialize for Detection {
    /// Serializes as `{ is_match, primary_entry, matched_tokens }`, with a
    /// null entry and empty list for `NoMatch`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Detection", 3)?;
        state.serialize_field("is_match", &self.is_match())?;
        state.serialize_field("primary_entry", &self.primary_entry())?;
        state.serialize_field("matched_tokens", self.matched_tokens())?;
        state.end()
    }
}
