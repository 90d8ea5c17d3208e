//! Case-folding path escaping used by the module proxy protocol.
//!
//! Upper-case letters are written as `!` followed by the lower-case letter so
//! that paths survive case-insensitive file systems and URLs.

/// Escape a module source or version for use in a URL or storage key.
pub fn escape(s: &str) -> crate::Result<String> {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '!' {
            return Err(crate::Error::InvalidEscape(format!(
                "{s:?} contains a literal '!'"
            )));
        }
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Reverse [`escape`].
pub fn unescape(s: &str) -> crate::Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '!' => match chars.next() {
                Some(next) if next.is_ascii_lowercase() => out.push(next.to_ascii_uppercase()),
                _ => {
                    return Err(crate::Error::InvalidEscape(format!(
                        "{s:?} has '!' not followed by a lower-case letter"
                    )));
                }
            },
            c if c.is_ascii_uppercase() => {
                return Err(crate::Error::InvalidEscape(format!(
                    "{s:?} contains an unescaped upper-case letter"
                )));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}
