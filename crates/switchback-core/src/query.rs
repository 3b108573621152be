//! Query string parsing and percent-decoding.
//!
//! Two decode flavors exist because paths and query strings disagree
//! about `+`:
//! - [`percent_decode_path`] decodes `%XX` sequences only; a literal
//!   `+` in a path segment stays a `+`.
//! - [`percent_decode_form`] additionally maps `+` to space, matching
//!   `application/x-www-form-urlencoded` query strings.
//!
//! # Example
//!
//! ```ignore
//! use switchback_core::QueryMap;
//!
//! let query = QueryMap::parse("a=1&b=2&a=3");
//! assert_eq!(query.get("a"), Some("1"));
//! let all: Vec<_> = query.get_all("a").collect();
//! assert_eq!(all, vec!["1", "3"]);
//! ```

use std::borrow::Cow;

/// A decoded query string as an ordered multimap.
///
/// Repeated keys accumulate rather than overwrite, and pair order is
/// the order they appeared on the wire. Keys and values are decoded
/// once at parse time with form semantics (`+` means space).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    pairs: Vec<(String, String)>,
}

impl QueryMap {
    /// Parse a query string (without the leading `?`).
    ///
    /// Empty `&`-separated chunks are skipped, so `a=1&&b=2&` yields
    /// two pairs. A chunk without `=` becomes a key with an empty
    /// value.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split('&')
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                let (key, value) = match chunk.find('=') {
                    Some(eq) => (&chunk[..eq], &chunk[eq + 1..]),
                    // Key without value: "flag" -> ("flag", "")
                    None => (chunk, ""),
                };
                (
                    percent_decode_form(key).into_owned(),
                    percent_decode_form(value).into_owned(),
                )
            })
            .collect();
        Self { pairs }
    }

    /// First value for a key, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a key, in wire order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the key appeared at all (even with an empty value).
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// All pairs, in wire order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the query string had no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Percent-decode a path segment.
///
/// Decodes `%XX` sequences; `+` is kept literal, because a plus in a
/// path is just a plus. Invalid sequences are left as-is rather than
/// rejected.
#[must_use]
pub fn percent_decode_path(s: &str) -> Cow<'_, str> {
    if !s.contains('%') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(decode_bytes(s, false))
}

/// Percent-decode a form-encoded key or value.
///
/// Decodes `%XX` sequences and maps `+` to space, per
/// `application/x-www-form-urlencoded`.
#[must_use]
pub fn percent_decode_form(s: &str) -> Cow<'_, str> {
    if !s.contains('%') && !s.contains('+') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(decode_bytes(s, true))
}

fn decode_bytes(s: &str, plus_as_space: bool) -> String {
    let mut result = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                    result.push(hi << 4 | lo);
                    i += 3;
                } else {
                    // Invalid hex, keep as-is
                    result.push(b'%');
                    i += 1;
                }
            }
            b'+' if plus_as_space => {
                result.push(b' ');
                i += 1;
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }

    // Decoded bytes may form multi-byte UTF-8 sequences; anything
    // invalid is replaced rather than rejected.
    String::from_utf8_lossy(&result).into_owned()
}

/// Convert a hex digit to its numeric value.
fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
