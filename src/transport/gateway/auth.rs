use axum::http::{HeaderMap, header};
use subtle::ConstantTimeEq;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Constant-time check of the bearer token against the internal secret.
pub(super) fn is_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    match (bearer_token(headers), expected) {
        (Some(token), Some(expected)) if !expected.is_empty() => {
            token.as_bytes().ct_eq(expected.as_bytes()).into()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::is_authorized;
    use axum::http::HeaderMap;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn matching_token_is_accepted() {
        assert!(is_authorized(&headers("Bearer s3cret"), Some("s3cret")));
    }

    #[test]
    fn wrong_or_truncated_token_is_rejected() {
        assert!(!is_authorized(&headers("Bearer wrong"), Some("s3cret")));
        assert!(!is_authorized(&headers("Bearer s3cre"), Some("s3cret")));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(!is_authorized(&HeaderMap::new(), Some("s3cret")));
    }

    #[test]
    fn wrong_scheme_is_rejected() {
        assert!(!is_authorized(&headers("Token s3cret"), Some("s3cret")));
    }

    #[test]
    fn unconfigured_secret_rejects_everything() {
        assert!(!is_authorized(&headers("Bearer anything"), None));
        assert!(!is_authorized(&headers("Bearer x"), Some("")));
    }
}
