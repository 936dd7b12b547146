//! E.164 phone number normalization (component A).

use phonenumber::country::Id as CountryId;
use std::str::FromStr;

use crate::errors::CoreError;

/// Strips the punctuation a human would type around a phone number
/// (spaces, dots, hyphens) before handing it to the parser.
fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect()
}

/// Validates and formats `raw` to E.164, using `default_region` (a two
/// letter country code, e.g. "FR") when the number has no explicit country
/// prefix.
///
/// Returns `CoreError::Validation` if the number cannot be parsed or is not
/// a valid phone number. The output always starts with `+` and contains
/// only digits afterward.
pub fn normalize(raw: &str, default_region: &str) -> Result<String, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::validation("phone number cannot be empty"));
    }

    let cleaned = clean(raw);
    let region = CountryId::from_str(default_region).ok();

    let parsed = phonenumber::parse(region, &cleaned)
        .map_err(|e| CoreError::validation(format!("could not parse phone number '{raw}': {e}")))?;

    if !phonenumber::is_valid(&parsed) {
        return Err(CoreError::validation(format!(
            "phone number '{raw}' is not a valid number"
        )));
    }

    Ok(phonenumber::format(&parsed)
        .mode(phonenumber::Mode::E164)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_local_number_with_default_region() {
        let formatted = normalize("06 12 34 56 78", "FR").unwrap();
        assert!(formatted.starts_with('+'));
        assert!(formatted.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn strips_dots_and_hyphens() {
        let a = normalize("+1.415.555.2671", "US").unwrap();
        let b = normalize("+1-415-555-2671", "US").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(normalize("", "FR").is_err());
        assert!(normalize("   ", "FR").is_err());
    }

    #[test]
    fn rejects_unparseable_number() {
        assert!(normalize("not-a-phone-number", "FR").is_err());
    }
}
