//! Profile layering
//!
//! Each entry point folds the ordered list of active profiles over a running
//! accumulator: profile N sees the output of profile N-1. A profile whose
//! filters reject the request contributes nothing. When the engine is paused
//! every entry point returns [`RewriteResult::NoChange`] immediately.

use crate::cookie::apply_cookie_modifier;
use crate::csp::apply_csp_modifier;
use crate::evaluate::{Evaluator, SystemValues, ValueSource, DEFAULT_MAX_SUBSTITUTIONS};
use crate::filter::{self, FilterPolicy};
use crate::headers::apply_header_modifier;
use crate::profile::Profile;
use crate::redirect::{apply_rule, RuleOutcome};
use crate::set_cookie::apply_set_cookie_modifier;
use crate::types::{Header, RequestContext, RewriteResult};

// =============================================================================
// Settings
// =============================================================================

/// Engine-wide settings supplied by the integration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Global pause: bypass every profile.
    pub paused: bool,
    pub filter_policy: FilterPolicy,
    /// Hard cap on template substitutions per value.
    pub max_substitutions: usize,
    /// When set, no profile applies outside this tab, whatever its own
    /// filters say.
    pub locked_tab_id: Option<i32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            paused: false,
            filter_policy: FilterPolicy::default(),
            max_substitutions: DEFAULT_MAX_SUBSTITUTIONS,
            locked_tab_id: None,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The rewrite engine. Holds no per-request state, so one instance can serve
/// concurrent requests.
pub struct Engine<V: ValueSource = SystemValues> {
    settings: EngineSettings,
    values: V,
}

impl Engine<SystemValues> {
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_values(settings, SystemValues)
    }
}

impl Default for Engine<SystemValues> {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl<V: ValueSource> Engine<V> {
    /// Create an engine with a custom source of UUIDs and timestamps.
    pub fn with_values(settings: EngineSettings, values: V) -> Self {
        Self { settings, values }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.settings.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.settings.paused
    }

    pub fn set_locked_tab(&mut self, tab_id: Option<i32>) {
        self.settings.locked_tab_id = tab_id;
    }

    /// Decide whether `profile` participates for `ctx`.
    pub fn profile_applies(&self, profile: &Profile, ctx: &RequestContext<'_>) -> bool {
        if self.settings.locked_tab_id.is_some_and(|tab_id| tab_id != ctx.tab_id) {
            return false;
        }
        profile.enabled && filter::matches(&profile.filters, ctx, self.settings.filter_policy)
    }

    fn evaluator<'a>(&'a self, ctx: &RequestContext<'a>) -> Evaluator<'a> {
        Evaluator::new(ctx.url, &self.values, self.settings.max_substitutions)
    }

    fn active<'p>(
        &'p self,
        profiles: &'p [Profile],
        ctx: &'p RequestContext<'p>,
    ) -> impl Iterator<Item = &'p Profile> + 'p {
        profiles.iter().filter(move |profile| {
            let applies = self.profile_applies(profile, ctx);
            if !applies {
                log::debug!("profile {:?} filtered out for {}", profile.title, ctx.url);
            }
            applies
        })
    }

    /// Redirect the request URL. First matching rule across all profiles wins.
    pub fn modify_request_urls(&self, profiles: &[Profile], ctx: &RequestContext<'_>) -> RewriteResult {
        if self.settings.paused {
            return RewriteResult::NoChange;
        }

        let evaluator = self.evaluator(ctx);
        for profile in self.active(profiles, ctx) {
            for rule in &profile.url_replacements {
                match apply_rule(rule, ctx.url, &evaluator) {
                    RuleOutcome::NoMatch => continue,
                    RuleOutcome::Matched => return RewriteResult::NoChange,
                    RuleOutcome::Redirect(url) => {
                        log::debug!("redirect {} -> {} ({:?})", ctx.url, url, profile.title);
                        return RewriteResult::RedirectUrl(url);
                    }
                }
            }
        }
        RewriteResult::NoChange
    }

    /// Rewrite request headers: plain header modifiers, then cookie
    /// modifiers, per profile.
    pub fn modify_request_headers(&self, profiles: &[Profile], ctx: &RequestContext<'_>) -> RewriteResult {
        if self.settings.paused {
            return RewriteResult::NoChange;
        }

        let original = ctx.request_headers;
        let evaluator = self.evaluator(ctx);
        let headers = self.active(profiles, ctx).fold(original.to_vec(), |mut headers, profile| {
            for modifier in &profile.headers {
                apply_header_modifier(&mut headers, modifier, &evaluator);
            }
            for modifier in &profile.cookie_headers {
                apply_cookie_modifier(&mut headers, modifier, &evaluator);
            }
            headers
        });

        if headers.as_slice() == original {
            RewriteResult::NoChange
        } else {
            log::debug!("request headers rewritten for {}", ctx.url);
            RewriteResult::RequestHeaders(headers)
        }
    }

    /// Rewrite response headers: plain header modifiers, then `Set-Cookie`
    /// modifiers, then CSP modifiers, per profile.
    pub fn modify_response_headers(&self, profiles: &[Profile], ctx: &RequestContext<'_>) -> RewriteResult {
        if self.settings.paused {
            return RewriteResult::NoChange;
        }

        let original: &[Header] = ctx.response_headers.unwrap_or(&[]);
        let evaluator = self.evaluator(ctx);
        let headers = self.active(profiles, ctx).fold(original.to_vec(), |mut headers, profile| {
            for modifier in &profile.resp_headers {
                apply_header_modifier(&mut headers, modifier, &evaluator);
            }
            for modifier in &profile.set_cookie_headers {
                apply_set_cookie_modifier(&mut headers, modifier, &evaluator);
            }
            for modifier in &profile.csp_headers {
                apply_csp_modifier(&mut headers, modifier, &evaluator);
            }
            headers
        });

        if headers.as_slice() == original {
            RewriteResult::NoChange
        } else {
            log::debug!("response headers rewritten for {}", ctx.url);
            RewriteResult::ResponseHeaders(headers)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::tests::FixedValues;
    use crate::filter::Filter;
    use crate::profile::{CookieModifier, CspModifier, HeaderModifier, Pattern, SetCookieModifier, UrlReplacement};
    use crate::types::AppendMode;

    fn engine() -> Engine<FixedValues> {
        Engine::with_values(EngineSettings::default(), FixedValues)
    }

    fn paused_engine() -> Engine<FixedValues> {
        let mut engine = engine();
        engine.set_paused(true);
        engine
    }

    fn redirect_profile() -> Profile {
        Profile {
            url_replacements: vec![UrlReplacement::new("bewisse.com", "modheader.com")],
            ..Default::default()
        }
    }

    #[test]
    fn test_urls_nothing_changed() {
        let ctx = RequestContext::for_url("https://bewisse.com/");
        assert_eq!(engine().modify_request_urls(&[Profile::default()], &ctx), RewriteResult::NoChange);
    }

    #[test]
    fn test_urls_redirect_and_pause() {
        let ctx = RequestContext::for_url("https://bewisse.com/");
        let profiles = [redirect_profile()];
        assert_eq!(
            engine().modify_request_urls(&profiles, &ctx),
            RewriteResult::RedirectUrl("https://modheader.com/".to_string())
        );
        assert_eq!(paused_engine().modify_request_urls(&profiles, &ctx), RewriteResult::NoChange);
    }

    #[test]
    fn test_urls_dynamic_value() {
        let profiles = [Profile {
            url_replacements: vec![UrlReplacement::new(".*", "https://modheader.com{{url_path}}")],
            ..Default::default()
        }];
        let ctx = RequestContext::for_url("https://bewisse.com/test");
        assert_eq!(
            engine().modify_request_urls(&profiles, &ctx),
            RewriteResult::RedirectUrl("https://modheader.com/test".to_string())
        );
    }

    #[test]
    fn test_urls_filter_gate() {
        let ctx = RequestContext::for_url("https://bewisse.com/");

        let mut matched = redirect_profile();
        matched.filters = vec![Filter::Url(Pattern::new("bewisse.com"))];
        assert_eq!(
            engine().modify_request_urls(&[matched], &ctx),
            RewriteResult::RedirectUrl("https://modheader.com/".to_string())
        );

        let mut unmatched = redirect_profile();
        unmatched.filters = vec![Filter::Url(Pattern::new("modheader.com"))];
        assert_eq!(engine().modify_request_urls(&[unmatched], &ctx), RewriteResult::NoChange);
    }

    #[test]
    fn test_urls_first_profile_wins() {
        let second = Profile {
            url_replacements: vec![UrlReplacement::new("bewisse", "second")],
            ..Default::default()
        };
        let ctx = RequestContext::for_url("https://bewisse.com/");
        assert_eq!(
            engine().modify_request_urls(&[redirect_profile(), second], &ctx),
            RewriteResult::RedirectUrl("https://modheader.com/".to_string())
        );
    }

    #[test]
    fn test_request_headers_multiple_profiles() {
        let profiles = [
            Profile {
                headers: vec![HeaderModifier::new("foo", "Test Profile 1")],
                ..Default::default()
            },
            Profile {
                headers: vec![HeaderModifier::new("Foo", "Test Profile 2")
                    .with_append_mode(AppendMode::CommaSeparatedAppend)],
                ..Default::default()
            },
        ];
        let headers = [Header::new("Foo", "Bar")];
        let ctx = RequestContext::for_url("https://modheader.com/").with_request_headers(&headers);
        assert_eq!(
            engine().modify_request_headers(&profiles, &ctx),
            RewriteResult::RequestHeaders(vec![Header::new("Foo", "Test Profile 1,Test Profile 2")])
        );
    }

    #[test]
    fn test_request_headers_no_modifications() {
        let headers = [Header::new("Foo", "Bar")];
        let ctx = RequestContext::for_url("https://modheader.com/").with_request_headers(&headers);
        assert_eq!(engine().modify_request_headers(&[Profile::default()], &ctx), RewriteResult::NoChange);
    }

    #[test]
    fn test_request_headers_paused() {
        let profiles = [Profile {
            headers: vec![HeaderModifier::new("foo", "x")],
            ..Default::default()
        }];
        let ctx = RequestContext::for_url("https://modheader.com/");
        assert_eq!(paused_engine().modify_request_headers(&profiles, &ctx), RewriteResult::NoChange);
    }

    #[test]
    fn test_cookie_modifier_sees_header_created_by_same_profile() {
        for regex in [false, true] {
            let profiles = [Profile {
                headers: vec![HeaderModifier::new("cookie", "foo=Original")],
                cookie_headers: vec![CookieModifier::new(if regex { "fo.*" } else { "foo" }, "Test", regex)],
                ..Default::default()
            }];
            let ctx = RequestContext::for_url("https://modheader.com/");
            assert_eq!(
                engine().modify_request_headers(&profiles, &ctx),
                RewriteResult::RequestHeaders(vec![Header::new("cookie", "foo=Test")])
            );
        }
    }

    #[test]
    fn test_cookie_last_profile_wins() {
        let profiles = [
            Profile {
                cookie_headers: vec![CookieModifier::new("foo", "Profile1", false)],
                ..Default::default()
            },
            Profile {
                cookie_headers: vec![CookieModifier::new("foo", "Profile2", false)],
                ..Default::default()
            },
        ];
        let headers = [Header::new("cookie", "foo=Original")];
        let ctx = RequestContext::for_url("https://modheader.com/").with_request_headers(&headers);
        assert_eq!(
            engine().modify_request_headers(&profiles, &ctx),
            RewriteResult::RequestHeaders(vec![Header::new("cookie", "foo=Profile2")])
        );
    }

    #[test]
    fn test_cookie_removal_drops_header() {
        let profiles = [Profile {
            cookie_headers: vec![CookieModifier::new("foo", "", false)],
            ..Default::default()
        }];
        let headers = [Header::new("cookie", "foo=Original")];
        let ctx = RequestContext::for_url("https://modheader.com/").with_request_headers(&headers);
        assert_eq!(
            engine().modify_request_headers(&profiles, &ctx),
            RewriteResult::RequestHeaders(vec![])
        );
    }

    #[test]
    fn test_response_headers_pipeline_order() {
        let mut set_cookie = SetCookieModifier::new("fo.*", "", true);
        set_cookie.attributes.http_only = true;
        set_cookie.retain_existing_cookie = true;
        let profiles = [Profile {
            resp_headers: vec![HeaderModifier::new("x-frame-options", "")],
            set_cookie_headers: vec![set_cookie],
            csp_headers: vec![CspModifier::new("frame-ancestors", "*")],
            ..Default::default()
        }];
        let headers = [
            Header::new("X-Frame-Options", "DENY"),
            Header::new("set-cookie", "foo=Original; Path=/"),
            Header::new("Content-Security-Policy", "default-src 'self'"),
        ];
        let ctx = RequestContext::for_url("https://modheader.com/").with_response_headers(&headers);
        assert_eq!(
            engine().modify_response_headers(&profiles, &ctx),
            RewriteResult::ResponseHeaders(vec![
                Header::new("set-cookie", "foo=Original; HttpOnly"),
                Header::new("Content-Security-Policy", "default-src 'self'; frame-ancestors *"),
            ])
        );
    }

    #[test]
    fn test_response_headers_set_cookie_profiles_layer() {
        let profiles = [
            Profile {
                set_cookie_headers: vec![SetCookieModifier::new("foo", "Profile1", false)],
                ..Default::default()
            },
            Profile {
                set_cookie_headers: vec![SetCookieModifier::new("foo", "Profile2", false)],
                ..Default::default()
            },
        ];
        let headers = [Header::new("set-cookie", "foo=Original; Path=/")];
        let ctx = RequestContext::for_url("https://modheader.com/").with_response_headers(&headers);
        assert_eq!(
            engine().modify_response_headers(&profiles, &ctx),
            RewriteResult::ResponseHeaders(vec![Header::new("set-cookie", "foo=Profile2; Path=/")])
        );
    }

    #[test]
    fn test_response_headers_no_change() {
        let profiles = [Profile {
            set_cookie_headers: vec![SetCookieModifier::new("fo.*", "Test", true)],
            ..Default::default()
        }];
        let ctx = RequestContext::for_url("https://modheader.com/").with_response_headers(&[]);
        assert_eq!(engine().modify_response_headers(&profiles, &ctx), RewriteResult::NoChange);

        let headers = [Header::new("set-cookie", "foo=Original; Path=/")];
        let ctx = RequestContext::for_url("https://modheader.com/").with_response_headers(&headers);
        assert_eq!(engine().modify_response_headers(&[Profile::default()], &ctx), RewriteResult::NoChange);
    }

    #[test]
    fn test_disabled_profile_skipped() {
        let mut profile = redirect_profile();
        profile.enabled = false;
        let ctx = RequestContext::for_url("https://bewisse.com/");
        assert_eq!(engine().modify_request_urls(&[profile], &ctx), RewriteResult::NoChange);
    }

    #[test]
    fn test_locked_tab_overrides_profile_tab_filters() {
        let profiles = [Profile {
            headers: vec![HeaderModifier::new("X", "1")],
            filters: vec![Filter::Tab(7)],
            ..Default::default()
        }];
        let mut ctx = RequestContext::for_url("https://modheader.com/");
        ctx.tab_id = 7;

        for across_kinds in [crate::filter::Combine::All, crate::filter::Combine::Any] {
            let mut locked = Engine::with_values(
                EngineSettings {
                    filter_policy: FilterPolicy { across_kinds },
                    ..EngineSettings::default()
                },
                FixedValues,
            );
            locked.set_locked_tab(Some(5));
            assert_eq!(locked.modify_request_headers(&profiles, &ctx), RewriteResult::NoChange);
            assert!(!locked.profile_applies(&profiles[0], &ctx));

            locked.set_locked_tab(Some(7));
            assert_eq!(
                locked.modify_request_headers(&profiles, &ctx),
                RewriteResult::RequestHeaders(vec![Header::new("X", "1")])
            );
        }
    }

    #[test]
    fn test_locked_tab_applies_to_unfiltered_profiles() {
        let profiles = [redirect_profile()];
        let mut engine = engine();
        engine.set_locked_tab(Some(5));

        let mut ctx = RequestContext::for_url("https://bewisse.com/");
        ctx.tab_id = 9;
        assert_eq!(engine.modify_request_urls(&profiles, &ctx), RewriteResult::NoChange);

        ctx.tab_id = 5;
        assert_eq!(
            engine.modify_request_urls(&profiles, &ctx),
            RewriteResult::RedirectUrl("https://modheader.com/".to_string())
        );
    }
}
