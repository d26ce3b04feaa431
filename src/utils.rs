//! Utility functions for text and URL handling.
//!
//! This module provides helpers shared by the record loader and the front ends.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use url::{ParseError, Url};

/// Characters escaped inside a single path segment. Unreserved characters and
/// `$ & + : = @` stay literal, everything else is percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// Sanitize a redirect target loaded from the data file.
///
/// Every occurrence of `prefix` is removed, the remainder is parsed as a URL
/// reference and only its path survives. The path is escaped as one segment and
/// the prefix is put back in front.
///
/// # Arguments
/// * `link` - The raw URL from the data file.
/// * `prefix` - The prefix to strip and re-apply.
///
/// # Returns
/// The sanitized URL, or an empty string if the link is not a valid URL reference.
pub fn sanitize_url(link: &str, prefix: &str) -> String {
    let shortened = if prefix.is_empty() {
        Cow::Borrowed(link)
    } else {
        Cow::Owned(link.replace(prefix, ""))
    };

    match reference_path(&shortened) {
        Some(path) => format!("{}{}", prefix, utf8_percent_encode(&path, PATH_SEGMENT)),
        None => String::new(),
    }
}

/// Extract the decoded path of a URL reference.
fn reference_path(reference: &str) -> Option<String> {
    if reference.chars().any(|c| c.is_ascii_control()) {
        return None;
    }

    let raw_path = match Url::parse(reference) {
        Ok(url) if url.cannot_be_a_base() => return Some(String::new()),
        Ok(url) => url.path().to_string(),
        Err(ParseError::RelativeUrlWithoutBase) => {
            let path = reference.split(['?', '#']).next().unwrap_or_default();
            // a colon in the first segment would read as a scheme
            if path.split('/').next().is_some_and(|segment| segment.contains(':')) {
                return None;
            }
            path.to_string()
        }
        Err(_) => return None,
    };

    if !has_valid_escapes(&raw_path) {
        return None;
    }
    percent_decode_str(&raw_path)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

/// Check that every `%` starts a two digit hex escape.
fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'%' {
            let valid = bytes
                .get(pos + 1..pos + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            pos += 3;
        } else {
            pos += 1;
        }
    }
    true
}

/// Remove combining marks (accents, umlaut dots, ...) from text.
///
/// The text is decomposed, stripped of every combining mark and recomposed, so
/// `"Crème brûlée"` becomes `"Creme brulee"`.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Percent-decode a request path, replacing invalid UTF-8.
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}
