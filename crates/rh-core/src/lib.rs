//! reheader Core Library
//!
//! This crate provides the rewrite engine for the reheader browser extension.
//! Given a request or response event and an ordered list of active profiles,
//! it computes the header, cookie, CSP and URL mutations to apply.
//!
//! # Architecture
//!
//! The engine is pure: it performs no I/O, holds no per-request state and
//! never fails on user data. Invalid patterns never match, malformed cookie
//! segments pass through untouched, and a runaway template skips only the
//! modifier that produced it.
//!
//! # Modules
//!
//! - `types`: Headers, request context and rewrite results
//! - `profile`: Profiles, modifiers and compiled patterns
//! - `evaluate`: `{{placeholder}}` template evaluation
//! - `filter`: Profile activation filters
//! - `headers`: Generic header list rewriting
//! - `cookie`: Request `Cookie` header rewriting
//! - `set_cookie`: Response `Set-Cookie` header rewriting
//! - `csp`: `Content-Security-Policy` directive rewriting
//! - `redirect`: URL redirect resolution
//! - `engine`: Profile layering entry points
//! - `url`: URL component extraction

pub mod cookie;
pub mod csp;
pub mod engine;
pub mod evaluate;
pub mod filter;
pub mod headers;
pub mod profile;
pub mod redirect;
pub mod set_cookie;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use engine::{Engine, EngineSettings};
pub use evaluate::{EvaluateError, Evaluator, SystemValues, ValueSource};
pub use filter::{Combine, Filter, FilterPolicy, TimeWindow, Weekdays};
pub use profile::{
    CookieAttributes, CookieModifier, CspModifier, HeaderModifier, NameMatch, Pattern, Profile,
    SetCookieModifier, UrlReplacement,
};
pub use types::{AppendMode, Header, RequestContext, ResourceType, RewriteResult};
