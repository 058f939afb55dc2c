//! Query normalization.
//!
//! OCR output often stores punctuation as words of its own ("O'Brien" is
//! recognized as `O`, `'`, `Brien`), so besides the plain whitespace split a
//! query can be re-tokenized with every punctuation character standing alone.

/// Split a raw query on whitespace.
pub fn tokenize(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Split a raw query with every punctuation character as its own token.
///
/// A character counts as punctuation when it is not alphanumeric, not
/// whitespace and not an underscore.
pub fn pad_and_tokenize(raw: &str) -> Vec<String> {
    let mut padded = String::with_capacity(raw.len() * 2);
    for c in raw.chars() {
        if is_punctuation(c) {
            padded.push(' ');
            padded.push(c);
            padded.push(' ');
        } else {
            padded.push(c);
        }
    }
    tokenize(&padded)
}

fn is_punctuation(c: char) -> bool {
    !(c.is_alphanumeric() || c.is_whitespace() || c == '_')
}
