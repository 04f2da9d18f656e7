//! URL clean-up for model-supplied arguments.

use regex::Regex;
use std::sync::LazyLock;

static WRAPPED_URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""url"\s*:\s*"([^"]+)""#).ok());

/// Normalise a URL the model handed us.
///
/// Models sometimes pass `{"url": "..."}` as a string instead of the bare
/// URL; that wrapper is unwrapped. A missing scheme becomes `https://`.
pub fn normalize_url(raw: &str) -> String {
    let mut url = raw.trim();

    if url.starts_with('{') && url.contains("\"url\":") {
        if let Some(inner) = WRAPPED_URL
            .as_ref()
            .and_then(|re| re.captures(url))
            .and_then(|caps| caps.get(1))
        {
            url = inner.as_str();
        }
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
