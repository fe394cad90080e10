// src/ingest/utils.rs

use crate::table::{YEAR_MAX, YEAR_MIN};

/// Cell text without surrounding whitespace or one pair of enclosing quotes.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map_or(trimmed, str::trim)
        .to_string()
}

/// A header naming a calendar year in the accepted range, e.g. `2025`.
pub fn parse_year_header(header: &str) -> Option<i32> {
    clean_str(header)
        .parse::<i32>()
        .ok()
        .filter(|y| (YEAR_MIN..=YEAR_MAX).contains(y))
}

/// Numeric cell value; empty, `NA`-style and unparsable cells yield `None`.
pub fn parse_value(cell: &str) -> Option<f64> {
    let s = clean_str(cell);
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_quotes_and_whitespace() {
        assert_eq!(clean_str("  \"Population\" "), "Population");
        assert_eq!(clean_str("\""), "\"");
        assert_eq!(clean_str(" GDP|PPP "), "GDP|PPP");
        assert_eq!(clean_str("\"\""), "");
        assert_eq!(clean_str("\" Aged0-4 \""), "Aged0-4");
    }

    #[test]
    fn year_headers_are_bounded() {
        assert_eq!(parse_year_header("2025"), Some(2025));
        assert_eq!(parse_year_header(" \"1950\""), Some(1950));
        assert_eq!(parse_year_header("1000"), None);
        assert_eq!(parse_year_header("Notes"), None);
    }

    #[test]
    fn values_skip_blank_and_non_numeric() {
        assert_eq!(parse_value("1.5e3"), Some(1500.0));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("n/a"), None);
        assert_eq!(parse_value("NaN"), None);
    }
}
