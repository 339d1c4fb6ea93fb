use once_cell::sync::Lazy;
use regex::Regex;

static ABSOLUTE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://").unwrap());

/// Returns true if `url` starts with an `http://` or `https://` scheme.
pub fn is_absolute_url(url: &str) -> bool {
    ABSOLUTE_URL.is_match(url)
}

/// Resolves a request URL against the instance base URL.
///
/// Absolute URLs pass through untouched. Relative ones are joined to `base`
/// with exactly one separating slash: a single trailing slash is dropped from
/// `base` and a single leading slash from `url`.
pub fn resolve_url(base: &str, url: &str) -> String {
    if is_absolute_url(url) {
        return url.to_string();
    }

    let base = base.strip_suffix('/').unwrap_or(base);
    let path = url.strip_prefix('/').unwrap_or(url);

    format!("{base}/{path}")
}

/// Extracts the last path segment of a URL, ignoring any query or fragment.
///
/// Returns `None` when the URL ends with a slash.
pub fn last_path_segment(url: &str) -> Option<&str> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    match path.rsplit_once('/') {
        Some((_, segment)) if !segment.is_empty() => Some(segment),
        Some(_) => None,
        None if !path.is_empty() => Some(path),
        None => None,
    }
}
