//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Up to two uppercase initials for the avatar badge.
///
/// Usage in templates: `{{ user.name|initials }}`
#[askama::filter_fn]
pub fn initials(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(initials_of(&value.to_string()))
}

fn initials_of(name: &str) -> String {
    let letters: String = name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect();
    if letters.is_empty() {
        "?".to_string()
    } else {
        letters
    }
}

#[cfg(test)]
mod tests {
    use super::initials_of;

    #[test]
    fn test_initials_of() {
        assert_eq!(initials_of("jane doe"), "JD");
        assert_eq!(initials_of("Ada"), "A");
        assert_eq!(initials_of("  Mary  Ann  Smith "), "MA");
        assert_eq!(initials_of(""), "?");
    }
}
