use std::borrow::Cow;

const MAX_API_ERROR_CHARS: usize = 200;
const REDACTED: &str = "[REDACTED]";

const PREFIX_MARKERS: [&str; 2] = ["AIza", "ya29."];

const VALUE_MARKERS: [&str; 5] = [
    "key=",
    "Authorization: Bearer ",
    "authorization: bearer ",
    "\"key\":\"",
    "\"access_token\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, c)| !is_secret_char(*c))
        .map_or(input.len(), |(i, _)| from + i)
}

/// Replaces every `marker<token>` run, keeping the marker when `keep_marker`.
fn redact_after(scrubbed: &mut String, marker: &str, keep_marker: bool) {
    let mut search_from = 0;
    while let Some(rel) = scrubbed[search_from..].find(marker) {
        let start = search_from + rel;
        let content_start = start + marker.len();
        let end = token_end(scrubbed, content_start);

        if end == content_start && keep_marker {
            search_from = content_start;
            continue;
        }

        let from = if keep_marker { content_start } else { start };
        scrubbed.replace_range(from..end, REDACTED);
        search_from = from + REDACTED.len();
    }
}

/// Redacts API keys and bearer tokens from upstream error text.
pub fn scrub_secrets(input: &str) -> Cow<'_, str> {
    let hit = PREFIX_MARKERS
        .iter()
        .chain(VALUE_MARKERS.iter())
        .any(|marker| input.contains(marker));
    if !hit {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in PREFIX_MARKERS {
        redact_after(&mut scrubbed, marker, false);
    }
    for marker in VALUE_MARKERS {
        redact_after(&mut scrubbed, marker, true);
    }
    Cow::Owned(scrubbed)
}

/// Scrubs secrets and truncates to a loggable length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secrets(input);
    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }

    let end = scrubbed
        .char_indices()
        .nth(MAX_API_ERROR_CHARS)
        .map_or(scrubbed.len(), |(i, _)| i);
    format!("{}...", &scrubbed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(scrub_secrets("quota exceeded"), Cow::Borrowed(_)));
    }

    #[test]
    fn query_string_key_is_redacted() {
        let out = scrub_secrets("POST /v1beta/models/x:generateContent?key=abc123 failed");
        assert_eq!(out, "POST /v1beta/models/x:generateContent?key=[REDACTED] failed");
    }

    #[test]
    fn google_key_prefix_is_redacted() {
        let out = scrub_secrets("API key AIzaSyD-example_123 is invalid");
        assert_eq!(out, "API key [REDACTED] is invalid");
    }

    #[test]
    fn long_errors_are_truncated_on_char_boundary() {
        let input = "é".repeat(300);
        let out = sanitize_api_error(&input);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), MAX_API_ERROR_CHARS + 3);
    }
}
