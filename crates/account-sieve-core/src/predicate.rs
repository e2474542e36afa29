//! Plausibility check for the free-form phone number carried by each account.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// North-American layouts: `(555) 123-4567`, `555-123-4567`, `5551234567`.
/// The match is a search, so surrounding text is tolerated.
///
/// `\d` is ASCII-only under `regex-lite`: digits from other scripts, such as
/// Arabic-Indic or full-width digits, do not count.
pub const PHONE_NUMBER_PATTERN: &str = r"\(?\d{3}\)?-? *\d{3}-? *-?\d{4}";

static PHONE_NUMBER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(PHONE_NUMBER_PATTERN).ok());

#[must_use]
pub fn looks_like_phone_number(raw: &str) -> bool {
    PHONE_NUMBER.as_ref().is_some_and(|pattern| pattern.is_match(raw))
}
