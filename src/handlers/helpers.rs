//! Shared helpers for command handlers.

/// Nickname syntax check: letter or special first, then letters, digits,
/// specials, or hyphens.
pub fn is_valid_nick(nick: &str) -> bool {
    let is_special = |c: char| matches!(c, '[' | ']' | '\\' | '`' | '_' | '^' | '{' | '|' | '}');

    let mut chars = nick.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || is_special(first)) {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || is_special(c) || c == '-') {
        return false;
    }
    nick.len() <= 30
}

/// Channel name syntax check.
pub fn is_valid_channel(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some('#' | '&'))
        && name.len() > 1
        && name.len() <= 50
        && !name.contains([' ', ',', '\u{7}'])
}
