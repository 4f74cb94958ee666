//! Directory query payloads.
//!
//! A query is a UDP datagram whose payload is a bare key, possibly padded
//! with whitespace or NULs by the sender.

/// Longest key or value stored in the directory, in bytes.
pub const MAX_FIELD_LEN: usize = 31;

/// Cuts `s` to at most `max` bytes without splitting a character.
pub fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Extracts the lookup key from a query payload.
///
/// Returns `None` for empty or non-UTF-8 payloads.
pub fn query_key(payload: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(payload).ok()?;
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let key = truncate_on_char_boundary(trimmed, MAX_FIELD_LEN);
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_padding() {
        assert_eq!(query_key(b"  Alice\r\n\0\0"), Some("Alice"));
        assert_eq!(query_key(b"\0\0\0"), None);
        assert_eq!(query_key(&[0xFF, 0xFE]), None);
    }

    #[test]
    fn bounds_length_on_char_boundary() {
        let long = "a".repeat(40);
        assert_eq!(query_key(long.as_bytes()).map(str::len), Some(MAX_FIELD_LEN));

        // 30 ASCII bytes followed by a two-byte character straddling the limit.
        let mixed = format!("{}é", "b".repeat(30));
        assert_eq!(truncate_on_char_boundary(&mixed, MAX_FIELD_LEN), "b".repeat(30));
    }
}
