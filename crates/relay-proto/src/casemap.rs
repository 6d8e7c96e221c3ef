//! RFC 1459 case mapping.
//!
//! IRC comparisons are case-insensitive with a twist: the characters
//! `[]\~` are the uppercase forms of `{}|^`. Nicknames and channel names
//! must be normalized with this mapping before being used as map keys.

/// Lowercase a single character under the `rfc1459` casemapping.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => c.to_ascii_lowercase(),
        _ => c,
    }
}

/// Normalize a nickname or channel name to its canonical lowercase form.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Case-insensitive equality under the `rfc1459` casemapping.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}
