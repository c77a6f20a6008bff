//! Response `Set-Cookie` header rewriting
//!
//! Every `Set-Cookie` header carries one cookie: a leading `name=value`
//! pair followed by `; `-separated attributes. Clearing a cookie keeps the
//! header with an empty value, the conventional expiry signal.

use crate::evaluate::Evaluator;
use crate::profile::SetCookieModifier;
use crate::types::Header;

pub const SET_COOKIE: &str = "set-cookie";

// =============================================================================
// Set-Cookie Value
// =============================================================================

/// Parsed `Set-Cookie` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Attribute segments, verbatim and in order.
    pub attributes: Vec<String>,
}

impl SetCookie {
    /// Parse a header value. `None` if the first segment is not `name=value`.
    pub fn parse(header_value: &str) -> Option<Self> {
        let mut segments = header_value.split(';');
        let (name, value) = segments.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let attributes = segments
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            attributes,
        })
    }

    pub fn serialize(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        for attribute in &self.attributes {
            out.push_str("; ");
            out.push_str(attribute);
        }
        out
    }
}

// =============================================================================
// Header Rewriting
// =============================================================================

/// Apply one modifier across every `Set-Cookie` header in `headers`.
///
/// Returns `true` if the header list changed.
pub fn apply_set_cookie_modifier(
    headers: &mut Vec<Header>,
    modifier: &SetCookieModifier,
    evaluator: &Evaluator<'_>,
) -> bool {
    if !modifier.enabled {
        return false;
    }

    let mut matched: Vec<(usize, SetCookie)> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| header.is_named(SET_COOKIE))
        .filter_map(|(idx, header)| SetCookie::parse(&header.value).map(|cookie| (idx, cookie)))
        .filter(|(_, cookie)| modifier.name.matches(&cookie.name))
        .collect();
    // A literal name addresses a single cookie.
    if !modifier.name.is_regex() {
        matched.truncate(1);
    }

    if matched.is_empty() {
        return append_new(headers, modifier, evaluator);
    }

    let mut rewritten = Vec::with_capacity(matched.len());
    for (idx, mut cookie) in matched {
        let value = match evaluator.evaluate(&modifier.value, &cookie.value) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Skipping set-cookie modifier {:?}: {}", modifier.name, err);
                return false;
            }
        };
        let clear_while_retaining = modifier.retain_existing_cookie && value.is_empty();
        if !modifier.retain_existing_cookie {
            cookie.value = value;
        }
        if modifier.attribute_override || clear_while_retaining {
            cookie.attributes = modifier.attributes.segments();
        }
        rewritten.push((idx, cookie.serialize()));
    }

    let mut changed = false;
    for (idx, value) in rewritten {
        if headers[idx].value != value {
            log::trace!("set-cookie rewritten: {}", value);
            headers[idx].value = value;
            changed = true;
        }
    }
    changed
}

fn append_new(headers: &mut Vec<Header>, modifier: &SetCookieModifier, evaluator: &Evaluator<'_>) -> bool {
    let Some(name) = modifier.name.literal() else {
        return false;
    };
    let value = match evaluator.evaluate(&modifier.value, "") {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Skipping set-cookie modifier {:?}: {}", name, err);
            return false;
        }
    };
    if value.is_empty() {
        return false;
    }
    let cookie = SetCookie {
        name: name.to_string(),
        value,
        attributes: modifier.attributes.segments(),
    };
    headers.push(Header::new(SET_COOKIE, cookie.serialize()));
    true
}
