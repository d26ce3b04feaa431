//! Query name normalization.
//!
//! Raw tokens arrive as DNS question names (ASCII, possibly punycode) or as
//! HTTP host labels and path segments (any Unicode). This module turns them into
//! the form the resolver compares against.

use std::sync::OnceLock;

use hickory_proto::rr::Name;
use regex::Regex;

/// A classified query token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    /// The token embeds a positive 3 or 4 digit number.
    Numeric(u32),

    /// Anything else.
    Textual {
        /// Lower-cased token with every `.` removed.
        needle: String,
        /// Lower-cased first label of the token.
        label: String,
    },
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[0-9]{3,4}").expect("valid id pattern"))
}

/// Classify a raw query token.
///
/// The leftmost run of 3 or 4 ASCII digits becomes the numeric key. A token
/// without such a run, or whose run is all zeros, is textual.
pub fn normalize(raw: &str) -> QueryToken {
    let decoded = decode_idna(raw);

    let number = id_pattern()
        .find(&decoded)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|&n| n != 0);
    if let Some(number) = number {
        return QueryToken::Numeric(number);
    }

    let lowered = decoded.to_lowercase();
    QueryToken::Textual {
        label: lowered.split('.').next().unwrap_or_default().to_string(),
        needle: lowered.replace('.', ""),
    }
}

/// Decode punycode labels of an ASCII domain name into Unicode.
///
/// Tokens that are not ASCII or not a valid DNS name are returned unchanged.
pub fn decode_idna(raw: &str) -> String {
    if !raw.is_ascii() {
        return raw.to_string();
    }
    match Name::from_ascii(raw) {
        Ok(name) => name.to_utf8(),
        Err(_) => raw.to_string(),
    }
}

/// Lower-case a record name and encode it for DNS output.
///
/// Names IDNA refuses (spaces, symbols) keep their lower-cased form.
pub fn to_ascii_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    match Name::from_utf8(&lowered) {
        Ok(encoded) => encoded.to_ascii(),
        Err(_) => lowered,
    }
}
