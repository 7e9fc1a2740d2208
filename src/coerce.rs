//! Numeric coercion for spreadsheet cells.
//!
//! The points column is filled in by people, so besides numbers it carries
//! stray tokens like "n/a" or "-". Coercion turns every cell into either a
//! number or `None` and never fails.

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Cell contents that tabular exports use to mean "no value".
    static ref NA_TOKENS: HashSet<&'static str> = [
        "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
        "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
    ]
    .into_iter()
    .collect();
}

/// True if a raw cell is one of the "no value" markers.
pub fn is_na_token(cell: &str) -> bool {
    NA_TOKENS.contains(cell)
}

/// A cell value before coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Number(f64),
    Text(&'a str),
    Missing,
}

impl<'a> From<Option<&'a str>> for RawValue<'a> {
    fn from(cell: Option<&'a str>) -> Self {
        match cell {
            Some(s) => RawValue::Text(s),
            None => RawValue::Missing,
        }
    }
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(cell: &'a str) -> Self {
        RawValue::Text(cell)
    }
}

impl From<f64> for RawValue<'_> {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue<'_> {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

/// Coerce a raw value to a number, or `None` when it has no numeric meaning.
pub fn coerce(raw: RawValue<'_>) -> Option<f64> {
    match raw {
        RawValue::Number(n) if n.is_nan() => None,
        RawValue::Number(n) => Some(n),
        RawValue::Text(s) => coerce_str(s),
        RawValue::Missing => None,
    }
}

/// Parse a text cell as a number. Surrounding whitespace is ignored.
pub fn coerce_str(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if is_na_token(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings() {
        assert_eq!(coerce("42".into()), Some(42.0));
        assert_eq!(coerce("42.5".into()), Some(42.5));
        assert_eq!(coerce(" 3 ".into()), Some(3.0));
        assert_eq!(coerce("-1.25".into()), Some(-1.25));
        assert_eq!(coerce("1e2".into()), Some(100.0));
    }

    #[test]
    fn test_non_numeric_is_missing() {
        assert_eq!(coerce("abc".into()), None);
        assert_eq!(coerce("n/a".into()), None);
        assert_eq!(coerce("1,5".into()), None);
        assert_eq!(coerce("".into()), None);
        assert_eq!(coerce("NaN".into()), None);
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(coerce(7i64.into()), Some(7.0));
        assert_eq!(coerce(RawValue::Number(0.0)), Some(0.0));
        assert_eq!(coerce(RawValue::Number(f64::NAN)), None);
    }

    #[test]
    fn test_missing_is_missing() {
        assert_eq!(coerce(RawValue::Missing), None);
        assert_eq!(coerce(RawValue::from(None::<&str>)), None);
    }

    #[test]
    fn test_zero_is_not_missing() {
        assert_eq!(coerce("0".into()), Some(0.0));
    }

    #[test]
    fn test_na_tokens() {
        assert!(is_na_token(""));
        assert!(is_na_token("NA"));
        assert!(is_na_token("#N/A"));
        assert!(!is_na_token("Loja A"));
        assert!(!is_na_token(" "));
    }
}
