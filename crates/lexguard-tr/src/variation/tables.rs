// Static confusable-glyph, filler, separator and phonetic tables

use std::collections::HashMap;
use std::sync::OnceLock;

// =========================================================================
// Substitution table
// =========================================================================

/// Letter to the glyphs writers use in its place.
///
/// Only glyphs that survive normalization are listed; a glyph the
/// normalizer strips could never reach the lexicon.
pub const SUBSTITUTIONS: &[(char, &[char])] = &[
    ('a', &['@', '4', '\u{00E4}', '\u{00E1}', '\u{00E0}', '\u{00E2}', '\u{00E5}', '\u{03B1}']),
    ('b', &['8', '6', '\u{00DF}']),
    ('c', &['\u{00E7}', '\u{00A2}', 'k']),
    ('d', &['t']),
    ('e', &['3', '\u{20AC}', '\u{00E9}', '\u{00E8}', '\u{00EA}', '\u{00EB}']),
    ('g', &['\u{011F}', '9', '6', 'q']),
    ('h', &['#']),
    ('i', &['1', '!', '|', '\u{0131}', '\u{00ED}', '\u{00EC}', '\u{00EE}', '\u{00EF}', 'l']),
    ('k', &['q', 'c']),
    ('l', &['1', '|', 'i']),
    ('m', &['n']),
    ('n', &['m', '\u{00F1}']),
    ('o', &['0', '\u{00F6}', '\u{00F3}', '\u{00F2}', '\u{00F4}', '\u{00F8}']),
    ('s', &['5', '$', '\u{015F}', 'z']),
    ('t', &['7', '+']),
    ('u', &['\u{00FC}', '\u{00FA}', '\u{00F9}', '\u{00FB}', 'v']),
    ('y', &['i']),
    ('z', &['2', 's']),
    ('\u{015F}', &['s', '$', '5']),
    ('\u{00E7}', &['c', '\u{00A2}']),
    ('\u{011F}', &['g']),
    ('\u{00F6}', &['o', '0']),
    ('\u{00FC}', &['u']),
    ('\u{0131}', &['i', '1', '!']),
];

/// Forward and reverse lookup over [`SUBSTITUTIONS`].
///
/// The reverse direction maps every glyph back to the letters it stands
/// for, so `4mk` yields `amk` as readily as `amk` yields `4mk`.
pub struct SubstitutionTable {
    forward: HashMap<char, Vec<char>>,
    reverse: HashMap<char, Vec<char>>,
}

impl SubstitutionTable {
    fn build() -> Self {
        let mut forward: HashMap<char, Vec<char>> = HashMap::new();
        let mut reverse: HashMap<char, Vec<char>> = HashMap::new();
        for &(letter, glyphs) in SUBSTITUTIONS {
            let f = forward.entry(letter).or_default();
            for &g in glyphs {
                if !f.contains(&g) {
                    f.push(g);
                }
                let r = reverse.entry(g).or_default();
                if !r.contains(&letter) {
                    r.push(letter);
                }
            }
        }
        Self { forward, reverse }
    }

    /// The shared table.
    pub fn get() -> &'static SubstitutionTable {
        static TABLE: OnceLock<SubstitutionTable> = OnceLock::new();
        TABLE.get_or_init(SubstitutionTable::build)
    }

    /// Every replacement for `c`: glyphs first, then letters it may stand for.
    pub fn replacements(&self, c: char) -> impl Iterator<Item = char> + '_ {
        let fwd = self.forward.get(&c).map(Vec::as_slice).unwrap_or(&[]);
        let rev = self.reverse.get(&c).map(Vec::as_slice).unwrap_or(&[]);
        fwd.iter().chain(rev.iter().filter(move |r| !fwd.contains(r))).copied()
    }
}

// =========================================================================
// Insertion, spacing and repetition
// =========================================================================

/// Filler characters inserted inside a word.
pub const FILLERS: &[char] = &['*', '@', '$', '#', '.', '+', '_', '-'];

/// Separators placed between letters.
pub const SEPARATORS: &[char] = &[' ', '.', '-', '_', '*'];

/// Characters writers stretch to evade matching (`ammmk`, `ağğğ`).
pub const STRETCHABLE: &[char] = &[
    'a', 'e', 'i', 'o', '\u{00F6}', '\u{00FC}', '\u{0131}', 'u', '\u{011F}', '\u{015F}',
];

/// Returns `true` for characters the merge pass strips out.
pub fn is_separator(c: char) -> bool {
    c.is_whitespace() || lexguard_core::character::is_separator_mark(c)
}

// =========================================================================
// Phonetic tables
// =========================================================================

/// Digraph spellings and their single-letter Turkish equivalents.
/// Applied in both directions.
pub const DIGRAPHS: &[(&str, &str)] = &[
    ("sh", "\u{015F}"),
    ("ch", "\u{00E7}"),
    ("gh", "\u{011F}"),
    ("ph", "f"),
    ("ks", "x"),
    ("kh", "h"),
    ("oe", "\u{00F6}"),
    ("ue", "\u{00FC}"),
];

/// Consonant pairs writers swap freely. Symmetric.
pub const CONSONANT_PAIRS: &[(char, char)] = &[
    ('k', 'q'),
    ('v', 'w'),
    ('s', 'z'),
    ('c', 'k'),
    ('d', 't'),
    ('b', 'p'),
    ('g', '\u{011F}'),
    ('c', '\u{00E7}'),
    ('s', '\u{015F}'),
    ('\u{0131}', 'i'),
];

/// Partners of `c` under [`CONSONANT_PAIRS`].
pub fn phonetic_partners(c: char) -> impl Iterator<Item = char> {
    CONSONANT_PAIRS.iter().filter_map(move |&(a, b)| {
        if a == c {
            Some(b)
        } else if b == c {
            Some(a)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_table_maps_glyphs_back() {
        let t = SubstitutionTable::get();
        assert!(t.replacements('4').any(|c| c == 'a'));
        assert!(t.replacements('@').any(|c| c == 'a'));
        assert!(t.replacements('$').any(|c| c == 's'));
        assert!(t.replacements('$').any(|c| c == '\u{015F}'));
    }

    #[test]
    fn replacements_do_not_repeat() {
        let t = SubstitutionTable::get();
        for &(letter, _) in SUBSTITUTIONS {
            let all: Vec<char> = t.replacements(letter).collect();
            let mut dedup = all.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(all.len(), dedup.len(), "{letter}");
        }
    }

    #[test]
    fn glyphs_survive_normalization() {
        for &(_, glyphs) in SUBSTITUTIONS {
            for &g in glyphs {
                assert!(lexguard_core::character::is_token_char(g), "{g}");
            }
        }
    }

    #[test]
    fn partners_are_symmetric() {
        assert!(phonetic_partners('k').any(|c| c == 'q'));
        assert!(phonetic_partners('q').any(|c| c == 'k'));
        assert_eq!(phonetic_partners('m').count(), 0);
    }
}
