//! Store name normalization.
//!
//! Store names are typed by hand in the source tool, so the same seller shows
//! up as "Loja Ágil", "loja agil " or "LOJA  AGIL". This module maps all of
//! those to one comparison key, which is the only grouping key used for
//! store-level aggregation.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace pattern");
}

/// Normalize an optional store name. Absent input stays absent.
pub fn normalize_name(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_key)
}

/// Build the comparison key for a store display name.
///
/// Applies compatibility decomposition (NFKD), drops everything outside
/// ASCII (which removes the detached combining marks along with symbols
/// that have no ASCII form), lowercases, and deletes every whitespace run.
/// Never fails; input with no ASCII content yields an empty key.
pub fn normalize_key(raw: &str) -> String {
    let ascii: String = raw.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_ascii_lowercase();
    WHITESPACE.replace_all(lowered.trim(), "").into_owned()
}
