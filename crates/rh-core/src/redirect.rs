//! URL redirect resolution
//!
//! The first rule whose pattern is found in the URL wins. The matched span
//! is replaced by the evaluated template; when the pattern has capture
//! groups, `$1`/`${name}` references in the evaluated template expand to
//! the captured text.

use crate::evaluate::Evaluator;
use crate::profile::UrlReplacement;

/// Outcome of trying one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Pattern not found, try the next rule.
    NoMatch,
    /// Pattern found but no usable redirect (unchanged URL or bad template).
    Matched,
    /// Redirect to this URL.
    Redirect(String),
}

/// Try a single rule against `url`.
pub fn apply_rule(rule: &UrlReplacement, url: &str, evaluator: &Evaluator<'_>) -> RuleOutcome {
    if !rule.enabled {
        return RuleOutcome::NoMatch;
    }
    let Some(regex) = rule.pattern.regex() else {
        return RuleOutcome::NoMatch;
    };
    let Some(captures) = regex.captures(url) else {
        return RuleOutcome::NoMatch;
    };
    let Some(span) = captures.get(0) else {
        return RuleOutcome::NoMatch;
    };

    let evaluated = match evaluator.evaluate(&rule.value, url) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("Skipping redirect rule {:?}: {}", rule.pattern.source(), err);
            return RuleOutcome::Matched;
        }
    };

    let replacement = if regex.captures_len() > 1 {
        let mut expanded = String::with_capacity(evaluated.len());
        captures.expand(&evaluated, &mut expanded);
        expanded
    } else {
        evaluated
    };

    let mut redirect = String::with_capacity(url.len() + replacement.len());
    redirect.push_str(&url[..span.start()]);
    redirect.push_str(&replacement);
    redirect.push_str(&url[span.end()..]);

    if redirect == url {
        RuleOutcome::Matched
    } else {
        RuleOutcome::Redirect(redirect)
    }
}

/// Resolve the redirect for `url` from `rules`, first match wins.
pub fn resolve_redirect(rules: &[UrlReplacement], url: &str, evaluator: &Evaluator<'_>) -> Option<String> {
    for rule in rules {
        match apply_rule(rule, url, evaluator) {
            RuleOutcome::NoMatch => continue,
            RuleOutcome::Matched => return None,
            RuleOutcome::Redirect(redirect) => return Some(redirect),
        }
    }
    None
}
