//! Request `Cookie` header rewriting
//!
//! The request carries a single `Cookie` header whose value is a
//! `;`-separated list of `name=value` pairs. Segments that cannot be split
//! into a pair are kept verbatim in their original position.

use crate::evaluate::Evaluator;
use crate::profile::CookieModifier;
use crate::types::{find_header, Header};

pub const COOKIE: &str = "cookie";

// =============================================================================
// Cookie List
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Pair { name: String, value: String },
    Raw(String),
}

/// Parsed `Cookie` header value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CookieList {
    segments: Vec<Segment>,
}

impl CookieList {
    pub fn parse(value: &str) -> Self {
        let segments = value
            .split(';')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((name, value)) => Segment::Pair {
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                },
                None => Segment::Raw(segment.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Value of the first pair named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Pair { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Serialize as `name=value` pairs joined by `"; "`.
    pub fn serialize(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Pair { name, value } => format!("{name}={value}"),
                Segment::Raw(raw) => raw.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Apply one modifier. Returns `true` if the list changed.
    pub fn apply(&mut self, modifier: &CookieModifier, evaluator: &Evaluator<'_>) -> bool {
        let matched: Vec<usize> = self
            .segments
            .iter()
            .enumerate()
            .filter_map(|(idx, segment)| match segment {
                Segment::Pair { name, .. } if modifier.name.matches(name) => Some(idx),
                _ => None,
            })
            .collect();
        // A literal name addresses a single cookie.
        let matched = if modifier.name.is_regex() {
            matched
        } else {
            matched.into_iter().take(1).collect()
        };

        if matched.is_empty() {
            return self.append_new(modifier, evaluator);
        }

        let mut updates = Vec::with_capacity(matched.len());
        for &idx in &matched {
            let Segment::Pair { value: old, .. } = &self.segments[idx] else {
                continue;
            };
            match evaluator.evaluate(&modifier.value, old) {
                Ok(value) => updates.push((idx, value)),
                Err(err) => {
                    log::warn!("Skipping cookie modifier {:?}: {}", modifier.name, err);
                    return false;
                }
            }
        }

        let mut changed = false;
        let mut removed = Vec::new();
        for (idx, value) in updates {
            if value.is_empty() {
                removed.push(idx);
                continue;
            }
            if let Segment::Pair { value: current, .. } = &mut self.segments[idx] {
                if *current != value {
                    *current = value;
                    changed = true;
                }
            }
        }
        for idx in removed.into_iter().rev() {
            self.segments.remove(idx);
            changed = true;
        }
        changed
    }

    fn append_new(&mut self, modifier: &CookieModifier, evaluator: &Evaluator<'_>) -> bool {
        let Some(name) = modifier.name.literal() else {
            return false;
        };
        let value = match evaluator.evaluate(&modifier.value, "") {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Skipping cookie modifier {:?}: {}", name, err);
                return false;
            }
        };
        if value.is_empty() {
            return false;
        }
        self.segments.push(Segment::Pair {
            name: name.to_string(),
            value,
        });
        true
    }
}

// =============================================================================
// Header Rewriting
// =============================================================================

/// Apply one cookie modifier to the `Cookie` header in `headers`.
///
/// The header is created when needed and removed when no cookies remain.
/// Returns `true` if the header list changed.
pub fn apply_cookie_modifier(
    headers: &mut Vec<Header>,
    modifier: &CookieModifier,
    evaluator: &Evaluator<'_>,
) -> bool {
    if !modifier.enabled {
        return false;
    }

    let existing = find_header(headers, COOKIE);
    let mut cookies = existing
        .map(|idx| CookieList::parse(&headers[idx].value))
        .unwrap_or_default();

    if !cookies.apply(modifier, evaluator) {
        return false;
    }

    match existing {
        Some(idx) if cookies.is_empty() => {
            headers.remove(idx);
        }
        Some(idx) => headers[idx].value = cookies.serialize(),
        None if cookies.is_empty() => return false,
        None => headers.push(Header::new(COOKIE, cookies.serialize())),
    }
    true
}
