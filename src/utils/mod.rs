//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

/// Collapse runs of whitespace into single spaces and trim.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract a query parameter from a (possibly relative) link.
pub fn query_param(base: &Url, href: &str, name: &str) -> Option<String> {
    let url = base.join(href).ok()?;
    url.query_pairs()
        .find(|(key, value)| key.eq_ignore_ascii_case(name) && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Parse the leading integer of a string such as `"1 234 out of 1 500"`.
///
/// Digit groups separated by spaces, commas or non-breaking spaces are
/// joined.
pub fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, ' ' | ',' | '\u{a0}'))
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Gennady \n\t Korotkevich "), "Gennady Korotkevich");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_query_param() {
        let base = Url::parse("https://timus.online/").unwrap();
        assert_eq!(
            query_param(&base, "author.aspx?id=12345&locale=en", "id"),
            Some("12345".to_string())
        );
        assert_eq!(query_param(&base, "author.aspx?locale=en", "id"), None);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("1 024 out of 1 200"), Some(1024));
        assert_eq!(leading_number("37,000"), Some(37000));
        assert_eq!(leading_number("n/a"), None);
    }
}
