//! Date handling for the roster's issue / expiration column.
//!
//! The PDF prints dates as `MM/DD/YYYY`. Output uses ISO `YYYY-MM-DD`.
//! Anything that does not parse under that exact format is passed through
//! untouched so a human can still see what the source said.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const SOURCE_FORMAT: &str = "%m/%d/%Y";
const OUTPUT_FORMAT: &str = "%Y-%m-%d";

static RE_DATE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap());

/// Convert `MM/DD/YYYY` to `YYYY-MM-DD`.
///
/// Empty input returns empty; unparseable input is returned unchanged.
pub fn normalize_date(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    match NaiveDate::parse_from_str(text, SOURCE_FORMAT) {
        Ok(date) => date.format(OUTPUT_FORMAT).to_string(),
        Err(_) => text.to_string(),
    }
}

/// Whether `text` is already in the `YYYY-MM-DD` output form.
pub fn is_output_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, OUTPUT_FORMAT).is_ok()
}

/// First date-shaped substring (`NN/NN/NNNN`) in `text`, if any.
///
/// Only the shape is checked here; `13/45/2024` is returned and later
/// passed through unchanged by [`normalize_date`].
pub fn find_date(text: &str) -> Option<&str> {
    RE_DATE_SHAPE.find(text).map(|m| m.as_str())
}
