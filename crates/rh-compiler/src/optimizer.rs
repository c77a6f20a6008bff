//! Stored profile → engine profile
//!
//! Disabled entries and entries without a name are dropped, regexes are
//! compiled once, and the stored filter lists become [`Filter`] values.

use rh_core::{
    CookieAttributes, CookieModifier, CspModifier, Filter, HeaderModifier, NameMatch, Pattern,
    Profile, ResourceType, SetCookieModifier, TimeWindow, UrlReplacement, Weekdays,
};

use crate::error::ProfileError;
use crate::parser::{StoredHeader, StoredProfile, StoredSetCookie, StoredTimeFilter};

/// UTC offsets beyond ±18h are rejected by the time zone database.
const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub modifiers_before: usize,
    pub modifiers_after: usize,
    pub filters_before: usize,
    pub filters_after: usize,
    /// Sources of patterns that failed to compile and will never match.
    pub invalid_patterns: Vec<String>,
}

impl OptimizeStats {
    pub fn merge(&mut self, other: &OptimizeStats) {
        self.modifiers_before += other.modifiers_before;
        self.modifiers_after += other.modifiers_after;
        self.filters_before += other.filters_before;
        self.filters_after += other.filters_after;
        self.invalid_patterns.extend(other.invalid_patterns.iter().cloned());
    }
}

pub fn optimize_profile(stored: &StoredProfile) -> Result<(Profile, OptimizeStats), ProfileError> {
    let mut stats = OptimizeStats {
        modifiers_before: stored.headers.len()
            + stored.resp_headers.len()
            + stored.cookie_headers.len()
            + stored.set_cookie_headers.len()
            + stored.csp_headers.len()
            + stored.url_replacements.len(),
        filters_before: stored.url_filters.len()
            + stored.exclude_url_filters.len()
            + stored.resource_filters.len()
            + stored.tab_filters.len()
            + stored.tab_group_filters.len()
            + stored.window_filters.len()
            + stored.time_filters.len(),
        ..OptimizeStats::default()
    };

    let mut profile = Profile {
        title: stored.title.clone(),
        always_on: stored.always_on,
        ..Profile::default()
    };

    profile.headers = stored.headers.iter().filter_map(header_modifier).collect();
    profile.resp_headers = stored.resp_headers.iter().filter_map(header_modifier).collect();

    profile.cookie_headers = stored
        .cookie_headers
        .iter()
        .filter(|c| c.enabled && !c.name.is_empty())
        .map(|c| CookieModifier::new(&c.name, c.value.clone(), c.regex_enabled))
        .collect();

    profile.set_cookie_headers = stored
        .set_cookie_headers
        .iter()
        .filter(|c| c.enabled && !c.name.is_empty())
        .map(set_cookie_modifier)
        .collect();

    profile.csp_headers = stored
        .csp_headers
        .iter()
        .filter(|c| c.enabled && !c.name.is_empty())
        .map(|c| CspModifier::new(c.name.trim(), c.value.clone()))
        .collect();

    profile.url_replacements = stored
        .url_replacements
        .iter()
        .filter(|r| r.enabled && !r.name.is_empty())
        .map(|r| UrlReplacement::new(&r.name, r.value.clone()))
        .collect();

    profile.filters = build_filters(stored)?;

    for pattern in collect_patterns(&profile) {
        if !pattern.is_valid() {
            stats.invalid_patterns.push(pattern.source().to_string());
        }
    }

    stats.modifiers_after = profile.modifier_count();
    stats.filters_after = profile.filters.len();

    log::debug!(
        "Optimized profile {:?}: {} -> {} modifiers, {} -> {} filters",
        profile.title,
        stats.modifiers_before,
        stats.modifiers_after,
        stats.filters_before,
        stats.filters_after
    );

    Ok((profile, stats))
}

fn header_modifier(stored: &StoredHeader) -> Option<HeaderModifier> {
    if !stored.enabled || stored.name.trim().is_empty() {
        return None;
    }
    let append_mode = stored
        .append_mode
        .as_ref()
        .map(|mode| mode.to_append_mode())
        .unwrap_or_default();
    Some(
        HeaderModifier::new(stored.name.trim(), stored.value.clone())
            .with_append_mode(append_mode)
            .with_send_empty_header(stored.send_empty_header),
    )
}

fn set_cookie_modifier(stored: &StoredSetCookie) -> SetCookieModifier {
    let mut modifier = SetCookieModifier::new(&stored.name, stored.value.clone(), stored.regex_enabled);
    modifier.attributes = CookieAttributes {
        path: stored.path.clone(),
        domain: stored.domain.clone(),
        http_only: stored.http_only,
        secure: stored.secure,
        same_site: stored.same_site.clone(),
    };
    modifier.attribute_override = stored.attribute_override;
    modifier.retain_existing_cookie = stored.retain_existing_cookie;
    modifier
}

fn build_filters(stored: &StoredProfile) -> Result<Vec<Filter>, ProfileError> {
    let mut filters = Vec::new();

    for f in stored.url_filters.iter().filter(|f| f.enabled) {
        filters.push(Filter::Url(Pattern::new(f.url_regex.as_str())));
    }
    for f in stored.exclude_url_filters.iter().filter(|f| f.enabled) {
        filters.push(Filter::ExcludeUrl(Pattern::new(f.url_regex.as_str())));
    }
    for f in stored.resource_filters.iter().filter(|f| f.enabled) {
        let mut types = ResourceType::empty();
        for name in &f.resource_type {
            types |= ResourceType::from_browser_name(name)
                .ok_or_else(|| ProfileError::UnknownResourceType(name.clone()))?;
        }
        filters.push(Filter::ResourceType(types));
    }
    for f in stored.tab_filters.iter().filter(|f| f.enabled) {
        filters.push(Filter::Tab(f.tab_id));
    }
    for f in stored.tab_group_filters.iter().filter(|f| f.enabled) {
        filters.push(Filter::TabGroup(f.tab_group_id));
    }
    for f in stored.window_filters.iter().filter(|f| f.enabled) {
        filters.push(Filter::Window(f.window_id));
    }
    for f in stored.time_filters.iter().filter(|f| f.enabled) {
        filters.push(Filter::Time(time_window(f)?));
    }

    Ok(filters)
}

fn time_window(stored: &StoredTimeFilter) -> Result<TimeWindow, ProfileError> {
    if stored.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(ProfileError::InvalidUtcOffset(stored.utc_offset_minutes));
    }
    let mut window = TimeWindow::daily(
        parse_clock(&stored.start_time)?,
        parse_clock(&stored.end_time)?,
    );
    window.utc_offset_minutes = stored.utc_offset_minutes;
    if !stored.days.is_empty() {
        let mut weekdays = Weekdays::empty();
        for day in &stored.days {
            weekdays |= Weekdays::from_day_name(day.trim())
                .ok_or_else(|| ProfileError::UnknownWeekday(day.clone()))?;
        }
        window.weekdays = weekdays;
    }
    Ok(window)
}

/// Parse `HH:MM` (24-hour clock, `24:00` allowed) into minutes after midnight.
pub fn parse_clock(text: &str) -> Result<u16, ProfileError> {
    let invalid = || ProfileError::InvalidTime(text.to_string());
    let (hours, minutes) = text.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u16 = hours.parse().map_err(|_| invalid())?;
    let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

fn collect_patterns(profile: &Profile) -> Vec<&Pattern> {
    let mut patterns = Vec::new();
    for filter in &profile.filters {
        if let Filter::Url(pattern) | Filter::ExcludeUrl(pattern) = filter {
            patterns.push(pattern);
        }
    }
    for cookie in &profile.cookie_headers {
        if let NameMatch::Regex(pattern) = &cookie.name {
            patterns.push(pattern);
        }
    }
    for cookie in &profile.set_cookie_headers {
        if let NameMatch::Regex(pattern) = &cookie.name {
            patterns.push(pattern);
        }
    }
    for rule in &profile.url_replacements {
        patterns.push(&rule.pattern);
    }
    patterns
}
