//! URL component extraction for template placeholders
//!
//! All helpers return an empty string when the URL cannot be parsed, so a
//! malformed URL never aborts a rewrite pass.

use ::url::Url;

// =============================================================================
// Components
// =============================================================================

/// Scheme, host and port, e.g. `https://example.com:8443`.
pub fn url_origin(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => String::new(),
    }
}

/// Host name without port or user info.
pub fn url_hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Path component; `/` for hierarchical URLs with no explicit path.
pub fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => String::new(),
    }
}
