//! URL canonicalization for cache keys

use url::Url;

/// Canonical cache key for a URL
///
/// Scheme and host are lower-cased and default ports dropped by the parser.
/// The fragment is removed, as is a trailing `/` on any non-root path.
/// Input that does not parse as an absolute URL is keyed by its trimmed text.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/').to_string();
        url.set_path(if stripped.is_empty() { "/" } else { &stripped });
    }

    url.to_string()
}
