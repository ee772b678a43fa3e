use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

/// Key prefixes that may be echoed back in upstream error bodies.
const SECRET_PREFIXES: [&str; 6] = ["sk-or-", "sk-", "Bearer ", "eyJ", "AIza", "xai-"];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, c)| !is_secret_char(*c))
        .map_or(input.len(), |(i, _)| from + i)
}

fn scrub_after_marker(scrubbed: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = token_end(scrubbed, content_start);

        if end == content_start {
            search_from = content_start;
            continue;
        }

        scrubbed.replace_range(start..end, REDACTED);
        search_from = start + REDACTED.len();
    }
}

/// Replace anything that looks like a credential with `[REDACTED]`.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_PREFIXES.iter().any(|prefix| input.contains(prefix)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for prefix in SECRET_PREFIXES {
        scrub_after_marker(&mut scrubbed, prefix);
    }
    Cow::Owned(scrubbed)
}

/// Scrub and truncate an upstream error body for logs and stored errors.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }

    let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{truncated}...")
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_input_is_borrowed() {
        let input = "model not found";
        assert!(matches!(scrub_secret_patterns(input), Cow::Borrowed(_)));
    }

    #[test]
    fn scrubs_openrouter_keys() {
        let scrubbed = scrub_secret_patterns("invalid key sk-or-v1-abc123def456 supplied");
        assert_eq!(scrubbed, "invalid key [REDACTED] supplied");
    }

    #[test]
    fn scrubs_bearer_tokens() {
        let scrubbed = scrub_secret_patterns("header was Bearer s3cr3t.token, rejected");
        assert_eq!(scrubbed, "header was [REDACTED], rejected");
    }

    #[test]
    fn bare_marker_is_left_alone() {
        let scrubbed = scrub_secret_patterns("prefix sk- alone");
        assert_eq!(scrubbed, "prefix sk- alone");
    }

    #[test]
    fn long_errors_are_truncated() {
        let body = "x".repeat(500);
        let sanitized = sanitize_api_error(&body);
        assert_eq!(sanitized.chars().count(), MAX_API_ERROR_CHARS + 3);
        assert!(sanitized.ends_with("..."));
    }
}
