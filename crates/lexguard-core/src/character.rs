// Character classification for obfuscated Turkish text

// ---------------------------------------------------------------------------
// Turkish phonological constants
// ---------------------------------------------------------------------------

/// Turkish vowels (lowercase), including circumflexed loanword forms.
const TURKISH_VOWELS: &[char] = &[
    'a', 'e', '\u{0131}', 'i', 'o', '\u{00F6}', 'u', '\u{00FC}', '\u{00E2}', '\u{00EE}', '\u{00FB}',
];

/// Marks writers put between letters to break up a word: `a.m.k`, `a-m-k`.
const SEPARATOR_MARKS: &[char] = &['.', '-', '_', '*', '+', '\'', '\u{2019}'];

/// Symbols commonly standing in for letters: `@` for `a`, `$` for `s`.
const OBFUSCATION_GLYPHS: &[char] = &[
    '@', '$', '\u{20AC}', '\u{00A3}', '\u{00A2}', '!', '|', '#', '%',
];

// ---------------------------------------------------------------------------
// Character type classification
// ---------------------------------------------------------------------------

/// Character type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharType {
    Letter,
    Digit,
    Whitespace,
    /// A mark used to split a word apart (`.`, `-`, `_`, ...).
    Separator,
    /// A symbol that stands in for a letter (`@`, `$`, ...).
    Glyph,
    /// Anything else; dropped during normalization.
    Other,
}

/// Returns the character type for a given character.
///
/// Letters of any script count as letters so diacritics survive
/// normalization untouched.
pub fn get_char_type(c: char) -> CharType {
    if c.is_alphabetic() {
        CharType::Letter
    } else if c.is_numeric() {
        CharType::Digit
    } else if c.is_whitespace() {
        CharType::Whitespace
    } else if is_separator_mark(c) {
        CharType::Separator
    } else if is_obfuscation_glyph(c) {
        CharType::Glyph
    } else {
        CharType::Other
    }
}

/// Returns `true` for marks that split a word (`a.m.k`).
pub fn is_separator_mark(c: char) -> bool {
    SEPARATOR_MARKS.contains(&c)
}

/// Returns `true` for symbols that commonly replace letters.
pub fn is_obfuscation_glyph(c: char) -> bool {
    OBFUSCATION_GLYPHS.contains(&c)
}

/// Returns `true` if the character survives normalization inside a token.
pub fn is_token_char(c: char) -> bool {
    matches!(
        get_char_type(c),
        CharType::Letter | CharType::Digit | CharType::Separator | CharType::Glyph
    )
}

/// Returns `true` if the character may not start or end a token.
///
/// `!` is a glyph inside a word (`s!k`) but trailing punctuation at its edge.
pub fn is_edge_trimmed(c: char) -> bool {
    is_separator_mark(c) || c == '!'
}

// ---------------------------------------------------------------------------
// Vowel / consonant classification
// ---------------------------------------------------------------------------

/// Returns `true` if `c` is a Turkish vowel (case-insensitive).
pub fn is_vowel(c: char) -> bool {
    TURKISH_VOWELS.contains(&simple_lower(c))
}

/// Returns `true` if `c` is a letter that is not a vowel.
pub fn is_consonant(c: char) -> bool {
    c.is_alphabetic() && !is_vowel(c)
}

// ---------------------------------------------------------------------------
// Case conversion
// ---------------------------------------------------------------------------

/// Lowercase a single character.
///
/// Dotted capital `İ` maps to plain `i`; the default Unicode mapping would
/// produce `i` followed by a combining dot.
pub fn simple_lower(c: char) -> char {
    if c == '\u{0130}' {
        return 'i';
    }
    c.to_lowercase().next().unwrap_or(c)
}

/// Lowercase a string character by character using [`simple_lower`].
pub fn lower_str(s: &str) -> String {
    s.chars().map(simple_lower).collect()
}
