use widestring::{U16Str, U16String};

/// Commonly used raw text format in the registry uses 0u16 as a delimiter for UTF-16 strings,
/// with the whole list terminated by a double 0u16 sequence.
///
/// Empty tokens in the middle are kept, so that alternating key/value lists stay aligned.
/// Trailing empty tokens (produced by the terminator) are dropped.
pub fn split_nul_delimited(input: &[u16]) -> Vec<&U16Str> {
    let mut tokens: Vec<&U16Str> = input.split(|&unit| unit == 0).map(U16Str::from_slice).collect();
    while tokens.last().is_some_and(|token| token.is_empty()) {
        tokens.pop();
    }
    tokens
}

/// Reinterpret a byte buffer as UTF-16 code units in little-endian order.
/// An odd trailing byte is ignored.
pub fn utf16le_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Decode a fixed-size UTF-16LE text field, dropping trailing NULs and whitespace padding.
pub fn utf16le_trimmed(bytes: &[u8]) -> String {
    let text = U16String::from_vec(utf16le_units(bytes)).to_string_lossy();
    text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_owned()
}
