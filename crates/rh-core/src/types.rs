//! Core type definitions for reheader
//!
//! These types describe a single request/response event as seen by the
//! browser and the outcome of a rewrite pass.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// =============================================================================
// Headers
// =============================================================================

/// A single HTTP header as delivered by the browser event.
///
/// Order and name casing are preserved exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive name comparison.
    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Find the first header with the given name (ASCII case-insensitive).
#[inline]
pub fn find_header(headers: &[Header], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.is_named(name))
}

// =============================================================================
// Append Mode
// =============================================================================

/// How a header modifier combines with an existing header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppendMode {
    /// Replace the value in place.
    #[default]
    Overwrite,
    /// Concatenate directly onto the existing value.
    Append,
    /// Concatenate with a `,` separator.
    CommaSeparatedAppend,
}

// =============================================================================
// Resource Types (bit mask for type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Browser resource type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceType: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUB_FRAME = 1 << 5;
        const MAIN_FRAME = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;
        const CSP_REPORT = 1 << 12;
        const WEBTRANSPORT = 1 << 13;
        const WEBBUNDLE = 1 << 14;

        /// All resource types
        const ALL = 0x7FFF;
        /// Document types (main_frame + sub_frame)
        const DOCUMENT = Self::MAIN_FRAME.bits() | Self::SUB_FRAME.bits();
    }
}

impl ResourceType {
    /// Parse a browser resource type name.
    ///
    /// Returns `None` for names the browser does not define.
    pub fn from_browser_name(name: &str) -> Option<Self> {
        Some(match name {
            "main_frame" => Self::MAIN_FRAME,
            "sub_frame" => Self::SUB_FRAME,
            "stylesheet" => Self::STYLESHEET,
            "script" => Self::SCRIPT,
            "image" => Self::IMAGE,
            "font" => Self::FONT,
            "object" => Self::OBJECT,
            "xmlhttprequest" => Self::XMLHTTPREQUEST,
            "ping" => Self::PING,
            "csp_report" => Self::CSP_REPORT,
            "media" => Self::MEDIA,
            "websocket" => Self::WEBSOCKET,
            "webtransport" => Self::WEBTRANSPORT,
            "webbundle" => Self::WEBBUNDLE,
            "other" => Self::OTHER,
            _ => return None,
        })
    }

    /// Parse a browser resource type name, falling back to `OTHER`.
    pub fn from_browser_name_lossy(name: &str) -> Self {
        Self::from_browser_name(name).unwrap_or(Self::OTHER)
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// Ids used by the browser when a request is not tied to a tab, group or window.
pub const NO_ID: i32 = -1;

/// Context for a request or response being rewritten.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Full request URL
    pub url: &'a str,
    /// HTTP method
    pub method: &'a str,
    /// Resource type declared by the browser
    pub resource_type: ResourceType,
    /// Tab ID (`NO_ID` for background requests)
    pub tab_id: i32,
    /// Tab group ID (`NO_ID` when ungrouped)
    pub tab_group_id: i32,
    /// Window ID
    pub window_id: i32,
    /// Event time, epoch milliseconds
    pub timestamp_ms: i64,
    /// Outgoing request headers
    pub request_headers: &'a [Header],
    /// Incoming response headers (absent in the request phase)
    pub response_headers: Option<&'a [Header]>,
}

impl<'a> RequestContext<'a> {
    /// A request-phase context with no tab/window association.
    pub fn for_url(url: &'a str) -> Self {
        Self {
            url,
            method: "GET",
            resource_type: ResourceType::OTHER,
            tab_id: NO_ID,
            tab_group_id: NO_ID,
            window_id: NO_ID,
            timestamp_ms: 0,
            request_headers: &[],
            response_headers: None,
        }
    }

    pub fn with_request_headers(mut self, headers: &'a [Header]) -> Self {
        self.request_headers = headers;
        self
    }

    pub fn with_response_headers(mut self, headers: &'a [Header]) -> Self {
        self.response_headers = Some(headers);
        self
    }
}

// =============================================================================
// Rewrite Result
// =============================================================================

/// Outcome of one entry point. Entry points never return a mix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum RewriteResult {
    /// Pass the event through unmodified.
    #[default]
    NoChange,
    /// Replacement request header list
    RequestHeaders(Vec<Header>),
    /// Replacement response header list
    ResponseHeaders(Vec<Header>),
    /// Redirect the request
    RedirectUrl(String),
}

impl RewriteResult {
    #[inline]
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}
