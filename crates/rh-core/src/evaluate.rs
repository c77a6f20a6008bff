//! Template value evaluation
//!
//! Configured values may contain `{{command}}` placeholders that are
//! resolved per request. Substitution repeats from the start of the string
//! after every replacement so placeholders produced by a substitution are
//! resolved too. The loop is bounded by a hard substitution cap and by an
//! output length derived from the inputs.

use crate::url::{url_hostname, url_origin, url_path};

/// Default cap on placeholder substitutions for a single value.
pub const DEFAULT_MAX_SUBSTITUTIONS: usize = 1024;

/// Room for a generated value (uuid, timestamp) in the output bound.
const GENERATED_VALUE_LEN: usize = 64;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Error type for template evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluateError {
    #[error("Template expansion exceeded {limit} substitutions")]
    ExpansionLimit { limit: usize },

    #[error("Template output exceeded {limit} bytes")]
    OutputTooLong { limit: usize },
}

// =============================================================================
// Dynamic Values
// =============================================================================

/// Source of the non-deterministic placeholder values.
///
/// Implementations must be safe to share across concurrent rewrites.
pub trait ValueSource: Send + Sync {
    /// A fresh random UUID.
    fn uuid(&self) -> String;

    /// Current time, epoch milliseconds.
    fn now_ms(&self) -> i64;
}

/// Random v4 UUIDs and the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemValues;

impl ValueSource for SystemValues {
    fn uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl<T: ValueSource + ?Sized> ValueSource for &T {
    fn uuid(&self) -> String {
        (**self).uuid()
    }

    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Resolves placeholders for one request URL.
pub struct Evaluator<'a> {
    url: &'a str,
    values: &'a dyn ValueSource,
    max_substitutions: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(url: &'a str, values: &'a dyn ValueSource, max_substitutions: usize) -> Self {
        Self {
            url,
            values,
            max_substitutions,
        }
    }

    pub fn url(&self) -> &'a str {
        self.url
    }

    /// Evaluate `template`, with `{{existing_value}}` bound to `old_value`.
    pub fn evaluate(&self, template: &str, old_value: &str) -> Result<String, EvaluateError> {
        let mut value = template.to_string();
        let mut substitutions = 0usize;
        let max_len = self.max_output_len(template, old_value);

        while let Some((start, end)) = next_placeholder(&value) {
            if substitutions == self.max_substitutions {
                return Err(EvaluateError::ExpansionLimit {
                    limit: self.max_substitutions,
                });
            }
            substitutions += 1;

            let replacement = self.resolve(&value[start + OPEN.len()..end], old_value);
            value.replace_range(start..end + CLOSE.len(), &replacement);
            if value.len() > max_len {
                return Err(EvaluateError::OutputTooLong { limit: max_len });
            }
        }

        Ok(value)
    }

    /// Every template byte may become at most one resolved value.
    fn max_output_len(&self, template: &str, old_value: &str) -> usize {
        let widest = old_value.len().max(self.url.len()) + GENERATED_VALUE_LEN;
        (template.len() + 1).saturating_mul(widest)
    }

    fn resolve(&self, command: &str, old_value: &str) -> String {
        match command {
            "uuid" => self.values.uuid(),
            "url" => self.url.to_string(),
            "url_origin" => url_origin(self.url),
            "url_hostname" => url_hostname(self.url),
            "url_path" => url_path(self.url),
            "existing_value" => old_value.to_string(),
            "timestamp" => self.values.now_ms().to_string(),
            _ => String::new(),
        }
    }
}

/// Byte range of the first `{{` and the first `}}` following it.
fn next_placeholder(value: &str) -> Option<(usize, usize)> {
    let start = value.find(OPEN)?;
    let end = value[start + OPEN.len()..].find(CLOSE)? + start + OPEN.len();
    Some((start, end))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic values for tests.
    pub(crate) struct FixedValues;

    impl ValueSource for FixedValues {
        fn uuid(&self) -> String {
            "test-uuid".to_string()
        }

        fn now_ms(&self) -> i64 {
            10_000_000
        }
    }

    fn eval(template: &str, old_value: &str) -> Result<String, EvaluateError> {
        Evaluator::new("https://example.com:8443/a/b?q=1", &FixedValues, DEFAULT_MAX_SUBSTITUTIONS)
            .evaluate(template, old_value)
    }

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(eval("Test bar", "old").unwrap(), "Test bar");
        assert_eq!(eval("", "old").unwrap(), "");
        assert_eq!(eval("{{not closed", "old").unwrap(), "{{not closed");
    }

    #[test]
    fn test_commands() {
        assert_eq!(eval("foo-{{uuid}}", "").unwrap(), "foo-test-uuid");
        assert_eq!(eval("{{url}}", "").unwrap(), "https://example.com:8443/a/b?q=1");
        assert_eq!(eval("{{url_origin}}", "").unwrap(), "https://example.com:8443");
        assert_eq!(eval("{{url_hostname}}", "").unwrap(), "example.com");
        assert_eq!(eval("{{url_path}}", "").unwrap(), "/a/b");
        assert_eq!(eval("{{timestamp}}", "").unwrap(), "10000000");
        assert_eq!(eval("[{{existing_value}}]", "Bar").unwrap(), "[Bar]");
        assert_eq!(eval("a{{nope}}b", "").unwrap(), "ab");
    }

    #[test]
    fn test_multiple_placeholders_left_to_right() {
        assert_eq!(
            eval("{{url_hostname}}/{{existing_value}}/{{uuid}}", "x").unwrap(),
            "example.com/x/test-uuid"
        );
    }

    #[test]
    fn test_substituted_placeholders_are_resolved() {
        assert_eq!(eval("{{existing_value}}", "{{url_path}}").unwrap(), "/a/b");
    }

    #[test]
    fn test_self_referential_expansion_is_capped() {
        let evaluator = Evaluator::new("https://example.com/", &FixedValues, 16);
        assert_eq!(
            evaluator.evaluate("{{existing_value}}", "x{{existing_value}}"),
            Err(EvaluateError::ExpansionLimit { limit: 16 })
        );
    }

    #[test]
    fn test_doubling_expansion_is_bounded_by_length() {
        let old_value = format!("{{{{existing_value}}}}{{{{existing_value}}}}{}", "x".repeat(1000));
        let result = eval("{{existing_value}}", &old_value);
        assert!(matches!(result, Err(EvaluateError::OutputTooLong { .. })), "{:?}", result.map(|v| v.len()));
    }

    #[test]
    fn test_many_url_placeholders_within_bound() {
        let template = "{{url}}".repeat(50);
        let value = eval(&template, "").unwrap();
        assert_eq!(value.len(), 50 * "https://example.com:8443/a/b?q=1".len());
    }
}
