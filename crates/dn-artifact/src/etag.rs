//! Entity-tag parsing
//!
//! Precondition headers carry entity-tags that may be weak-prefixed (`W/`)
//! and quoted. Comparisons always use the unwrapped token.

/// Strip surrounding whitespace, a weak prefix and one pair of quotes
///
/// `W/"abc"`, `"abc"` and `abc` all unwrap to `abc`.
#[must_use]
pub fn unwrap(raw: &str) -> &str {
    let mut token = raw.trim();
    if token.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("w/")) {
        token = token[2..].trim();
    }
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        token = &token[1..token.len() - 1];
    }
    token
}

/// Wrap a token in double quotes
#[inline]
#[must_use]
pub fn quote(token: &str) -> String {
    format!("\"{token}\"")
}

/// Unwrapped tokens of a comma-separated `If-None-Match` list
pub fn tokens(header: &str) -> impl Iterator<Item = &str> {
    header.split(',').map(unwrap).filter(|t| !t.is_empty())
}

/// Whether any tag of an `If-None-Match` list equals `current`
#[must_use]
pub fn any_matches(header: &str, current: &str) -> bool {
    tokens(header).any(|t| t == current)
}

/// Normalise an optional precondition value: empty or blank means absent
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_handles_all_forms() {
        assert_eq!(unwrap("abc"), "abc");
        assert_eq!(unwrap("\"abc\""), "abc");
        assert_eq!(unwrap("W/\"abc\""), "abc");
        assert_eq!(unwrap("w/ \"abc\" "), "abc");
        assert_eq!(unwrap("  \"abc\"  "), "abc");
    }

    #[test]
    fn unwrap_leaves_lone_quote() {
        assert_eq!(unwrap("\""), "\"");
        assert_eq!(unwrap(""), "");
    }

    #[test]
    fn list_matching() {
        assert!(any_matches("\"a\", W/\"b\", \"c\"", "b"));
        assert!(!any_matches("\"a\", \"c\"", "b"));
        assert!(!any_matches("", "b"));
    }

    #[test]
    fn tokens_skip_empty_entries() {
        let all: Vec<_> = tokens("\"a\",, ,\"b\"").collect();
        assert_eq!(all, vec!["a", "b"]);
    }

    #[test]
    fn non_empty_filters_blank() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some(" x ")), Some("x"));
        assert_eq!(non_empty(None), None);
    }
}
