//! Proxy path escaping.
//!
//! Module proxies are case-insensitive on some hosts, so the protocol
//! encodes uppercase ASCII letters as `!` followed by the lowercase
//! letter (`Azure` becomes `!azure`). The same rule applies to both the
//! module path and the version string.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EscapeError {
    #[error("bang not followed by a lowercase letter in {0:?}")]
    DanglingBang(String),
}

/// Escape uppercase ASCII letters for use in proxy URLs and store paths.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Invert [`escape`]. Fails when a `!` is not followed by a lowercase
/// ASCII letter.
pub fn unescape(s: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '!' {
            match chars.next() {
                Some(l) if l.is_ascii_lowercase() => out.push(l.to_ascii_uppercase()),
                _ => return Err(EscapeError::DanglingBang(s.to_string())),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
