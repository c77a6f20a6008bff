//! Profiles and modifiers
//!
//! A profile is an ordered bundle of modifiers plus activation filters. The
//! engine borrows profiles read-only for the duration of a rewrite pass.

use std::fmt;

use regex::Regex;

use crate::filter::Filter;
use crate::types::AppendMode;

// =============================================================================
// Pattern
// =============================================================================

/// A user-supplied regular expression, compiled once.
///
/// An invalid expression is kept with its source but never matches. The
/// problem is reported once, when the pattern is built.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let regex = match Regex::new(&source) {
            Ok(regex) => Some(regex),
            Err(err) => {
                log::warn!("Invalid pattern {:?} will never match: {}", source, err);
                None
            }
        };
        Self { source, regex }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Unanchored search.
    #[inline]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(haystack))
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

// =============================================================================
// Name Matching
// =============================================================================

/// How a cookie modifier selects cookies by name.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    /// Exact, case-sensitive equality. Can create a cookie when none exists.
    Literal(String),
    /// Regex search over the cookie name. Never creates a cookie.
    Regex(Pattern),
}

impl NameMatch {
    pub fn new(name: &str, regex_enabled: bool) -> Self {
        if regex_enabled {
            Self::Regex(Pattern::new(name))
        } else {
            Self::Literal(name.to_string())
        }
    }

    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == name,
            Self::Regex(pattern) => pattern.is_match(name),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }

    /// The literal name, if this matcher can create new cookies.
    pub fn literal(&self) -> Option<&str> {
        match self {
            Self::Literal(literal) => Some(literal),
            Self::Regex(_) => None,
        }
    }
}

// =============================================================================
// Modifiers
// =============================================================================

/// Plain request or response header modifier.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderModifier {
    pub name: String,
    pub value: String,
    pub append_mode: AppendMode,
    /// Send the header even when the value evaluates to empty.
    pub send_empty_header: bool,
    pub enabled: bool,
}

impl HeaderModifier {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            append_mode: AppendMode::Overwrite,
            send_empty_header: false,
            enabled: true,
        }
    }

    pub fn with_append_mode(mut self, append_mode: AppendMode) -> Self {
        self.append_mode = append_mode;
        self
    }

    pub fn with_send_empty_header(mut self, send_empty_header: bool) -> Self {
        self.send_empty_header = send_empty_header;
        self
    }
}

/// Modifier for pairs in the request `Cookie` header.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieModifier {
    pub name: NameMatch,
    pub value: String,
    pub enabled: bool,
}

impl CookieModifier {
    pub fn new(name: &str, value: impl Into<String>, regex_enabled: bool) -> Self {
        Self {
            name: NameMatch::new(name, regex_enabled),
            value: value.into(),
            enabled: true,
        }
    }
}

/// Attributes written onto a `Set-Cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<String>,
}

impl CookieAttributes {
    /// Serialized attribute segments in `Path`, `Domain`, `HttpOnly`,
    /// `Secure`, `SameSite` order. Empty strings count as omitted.
    pub fn segments(&self) -> Vec<String> {
        let mut segments = Vec::new();
        if let Some(path) = self.path.as_deref().filter(|v| !v.is_empty()) {
            segments.push(format!("Path={path}"));
        }
        if let Some(domain) = self.domain.as_deref().filter(|v| !v.is_empty()) {
            segments.push(format!("Domain={domain}"));
        }
        if self.http_only {
            segments.push("HttpOnly".to_string());
        }
        if self.secure {
            segments.push("Secure".to_string());
        }
        if let Some(same_site) = self.same_site.as_deref().filter(|v| !v.is_empty()) {
            segments.push(format!("SameSite={same_site}"));
        }
        segments
    }
}

/// Modifier for response `Set-Cookie` headers.
#[derive(Debug, Clone, PartialEq)]
pub struct SetCookieModifier {
    pub name: NameMatch,
    pub value: String,
    pub attributes: CookieAttributes,
    /// Replace the attribute list of matched cookies.
    pub attribute_override: bool,
    /// Keep the matched cookie's value; only attributes may change.
    pub retain_existing_cookie: bool,
    pub enabled: bool,
}

impl SetCookieModifier {
    pub fn new(name: &str, value: impl Into<String>, regex_enabled: bool) -> Self {
        Self {
            name: NameMatch::new(name, regex_enabled),
            value: value.into(),
            attributes: CookieAttributes::default(),
            attribute_override: false,
            retain_existing_cookie: false,
            enabled: true,
        }
    }
}

/// Modifier for one `Content-Security-Policy` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct CspModifier {
    pub directive: String,
    pub value: String,
    pub enabled: bool,
}

impl CspModifier {
    pub fn new(directive: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

/// Redirect rule: URLs matching `pattern` are rewritten using `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlReplacement {
    pub pattern: Pattern,
    pub value: String,
    pub enabled: bool,
}

impl UrlReplacement {
    pub fn new(pattern: &str, value: impl Into<String>) -> Self {
        Self {
            pattern: Pattern::new(pattern),
            value: value.into(),
            enabled: true,
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// An engine-ready profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub title: String,
    pub headers: Vec<HeaderModifier>,
    pub resp_headers: Vec<HeaderModifier>,
    pub cookie_headers: Vec<CookieModifier>,
    pub set_cookie_headers: Vec<SetCookieModifier>,
    pub csp_headers: Vec<CspModifier>,
    pub url_replacements: Vec<UrlReplacement>,
    pub filters: Vec<Filter>,
    pub enabled: bool,
    pub always_on: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            title: String::new(),
            headers: Vec::new(),
            resp_headers: Vec::new(),
            cookie_headers: Vec::new(),
            set_cookie_headers: Vec::new(),
            csp_headers: Vec::new(),
            url_replacements: Vec::new(),
            filters: Vec::new(),
            enabled: true,
            always_on: false,
        }
    }
}

impl Profile {
    /// Number of modifiers across all lists.
    pub fn modifier_count(&self) -> usize {
        self.headers.len()
            + self.resp_headers.len()
            + self.cookie_headers.len()
            + self.set_cookie_headers.len()
            + self.csp_headers.len()
            + self.url_replacements.len()
    }
}
