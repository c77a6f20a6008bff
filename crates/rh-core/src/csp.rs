//! `Content-Security-Policy` directive rewriting

use crate::evaluate::Evaluator;
use crate::profile::CspModifier;
use crate::types::{find_header, Header};

pub const CONTENT_SECURITY_POLICY: &str = "content-security-policy";

/// Ordered directive map. Names compare case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CspPolicy {
    directives: Vec<(String, String)>,
}

impl CspPolicy {
    pub fn parse(header_value: &str) -> Self {
        let mut policy = Self::default();
        for directive in header_value.split(';').map(str::trim).filter(|d| !d.is_empty()) {
            let (name, value) = match directive.split_once(char::is_whitespace) {
                Some((name, value)) => (name, value.trim()),
                None => (directive, ""),
            };
            // The first occurrence of a directive is the one browsers enforce.
            if policy.position(name).is_none() {
                policy.directives.push((name.to_string(), value.to_string()));
            }
        }
        policy
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.directives.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.directives[idx].1.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Overwrite or append a directive.
    pub fn set(&mut self, name: &str, value: String) {
        match self.position(name) {
            Some(idx) => self.directives[idx].1 = value,
            None => self.directives.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.directives.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Serialize as `directive value` pairs joined by `"; "`.
    pub fn serialize(&self) -> String {
        self.directives
            .iter()
            .map(|(name, value)| {
                if value.is_empty() {
                    name.clone()
                } else {
                    format!("{name} {value}")
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Apply one directive modifier to the `Content-Security-Policy` header.
///
/// Returns `true` if the header list changed.
pub fn apply_csp_modifier(headers: &mut Vec<Header>, modifier: &CspModifier, evaluator: &Evaluator<'_>) -> bool {
    if !modifier.enabled {
        return false;
    }

    let existing = find_header(headers, CONTENT_SECURITY_POLICY);
    let mut policy = existing
        .map(|idx| CspPolicy::parse(&headers[idx].value))
        .unwrap_or_default();

    let old_value = policy.get(&modifier.directive).unwrap_or("");
    let value = match evaluator.evaluate(&modifier.value, old_value) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Skipping CSP modifier {:?}: {}", modifier.directive, err);
            return false;
        }
    };

    if value.is_empty() {
        if !policy.remove(&modifier.directive) {
            return false;
        }
    } else {
        if policy.get(&modifier.directive) == Some(value.as_str()) {
            return false;
        }
        policy.set(&modifier.directive, value);
    }

    match existing {
        Some(idx) if policy.is_empty() => {
            headers.remove(idx);
        }
        Some(idx) => headers[idx].value = policy.serialize(),
        None => headers.push(Header::new(CONTENT_SECURITY_POLICY, policy.serialize())),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::tests::FixedValues;
    use crate::evaluate::DEFAULT_MAX_SUBSTITUTIONS;

    fn run(csp: Option<&str>, modifiers: &[CspModifier]) -> Vec<Header> {
        let evaluator = Evaluator::new("https://modheader.com/", &FixedValues, DEFAULT_MAX_SUBSTITUTIONS);
        let mut headers: Vec<Header> = csp
            .map(|v| Header::new("Content-Security-Policy", v))
            .into_iter()
            .collect();
        for modifier in modifiers {
            apply_csp_modifier(&mut headers, modifier, &evaluator);
        }
        headers
    }

    #[test]
    fn test_parse_and_serialize() {
        let policy = CspPolicy::parse("default-src 'self';  script-src 'self'  cdn.example.com; upgrade-insecure-requests;");
        assert_eq!(policy.get("DEFAULT-SRC"), Some("'self'"));
        assert_eq!(policy.get("script-src"), Some("'self'  cdn.example.com"));
        assert_eq!(policy.get("upgrade-insecure-requests"), Some(""));
        assert_eq!(
            policy.serialize(),
            "default-src 'self'; script-src 'self'  cdn.example.com; upgrade-insecure-requests"
        );
    }

    #[test]
    fn test_overwrite_directive_in_place() {
        assert_eq!(
            run(
                Some("default-src 'self'; img-src *"),
                &[CspModifier::new("Default-Src", "'none'")]
            ),
            vec![Header::new("Content-Security-Policy", "default-src 'none'; img-src *")]
        );
    }

    #[test]
    fn test_append_new_directive() {
        assert_eq!(
            run(
                Some("default-src 'self'"),
                &[CspModifier::new("script-src", "{{existing_value}}'unsafe-inline'")]
            ),
            vec![Header::new("Content-Security-Policy", "default-src 'self'; script-src 'unsafe-inline'")]
        );
        assert_eq!(
            run(None, &[CspModifier::new("frame-ancestors", "*")]),
            vec![Header::new("content-security-policy", "frame-ancestors *")]
        );
    }

    #[test]
    fn test_empty_value_removes_directive_and_header() {
        assert_eq!(
            run(Some("default-src 'self'; img-src *"), &[CspModifier::new("img-src", "")]),
            vec![Header::new("Content-Security-Policy", "default-src 'self'")]
        );
        assert_eq!(run(Some("default-src 'self'"), &[CspModifier::new("default-src", "")]), vec![]);
        assert_eq!(run(None, &[CspModifier::new("default-src", "")]), vec![]);
    }

    #[test]
    fn test_untouched_header_is_byte_identical() {
        assert_eq!(
            run(Some("default-src  'self' ;"), &[CspModifier::new("default-src", "'self'")]),
            vec![Header::new("Content-Security-Policy", "default-src  'self' ;")]
        );
    }
}
