// Text normalization: lower-casing, character filtering and tokenization

use lexguard_core::character::{CharType, get_char_type, is_edge_trimmed, simple_lower};

/// Tokens shorter than this many characters are discarded.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Normalize free text into lookup tokens.
///
/// Lower-cases (Turkish `İ` becomes `i`), keeps letters of any script,
/// digits, obfuscation glyphs and in-word separator marks, drops every
/// other character, splits on whitespace, trims separator marks and `!`
/// from token edges, and discards tokens shorter than [`MIN_TOKEN_CHARS`].
///
/// Idempotent: normalizing the space-joined output yields the same tokens.
pub fn normalize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        let c = simple_lower(c);
        match get_char_type(c) {
            CharType::Whitespace => flush(&mut current, &mut tokens),
            CharType::Other => {}
            CharType::Letter | CharType::Digit | CharType::Separator | CharType::Glyph => {
                current.push(c)
            }
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

/// Normalize a single word: the first token, or `None` if nothing survives.
///
/// Lexicon words and classifier verdicts pass through this so they share
/// the token space with detected text.
pub fn normalize_word(word: &str) -> Option<String> {
    normalize(word).into_iter().next()
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let trimmed = current.trim_matches(is_edge_trimmed);
    if trimmed.chars().count() >= MIN_TOKEN_CHARS {
        tokens.push(trimmed.to_string());
    }
    current.clear();
}
