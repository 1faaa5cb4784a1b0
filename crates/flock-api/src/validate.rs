//! Declarative field checks for request bodies, mirroring the validation
//! rules of the original endpoints.

pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Accepts digits with an optional leading `+` and common separators,
/// at least 7 digits total.
pub fn looks_like_phone(value: &str) -> bool {
    let trimmed = value.strip_prefix('+').unwrap_or(value);
    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    digits >= 7
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

pub fn looks_like_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value);
    let host = rest.split('/').next().unwrap_or("");
    host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(looks_like_email("alice@x.com"));
        assert!(!looks_like_email("alice"));
        assert!(!looks_like_email("@x.com"));
        assert!(!looks_like_email("alice@nodot"));
    }

    #[test]
    fn phones() {
        assert!(looks_like_phone("5551234567"));
        assert!(looks_like_phone("+49 170 1234567"));
        assert!(looks_like_phone("(555) 123-4567"));
        assert!(!looks_like_phone("12345"));
        assert!(!looks_like_phone("not a phone"));
    }

    #[test]
    fn urls() {
        assert!(looks_like_url("https://example.com"));
        assert!(looks_like_url("example.com/about"));
        assert!(!looks_like_url("not a url"));
        assert!(!looks_like_url("https://nodot"));
    }
}
