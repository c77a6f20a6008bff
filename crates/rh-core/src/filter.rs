//! Profile activation filters
//!
//! Exclusions are checked first: a URL matching any `ExcludeUrl` pattern
//! rejects the profile. The remaining filters are grouped by kind; filters of
//! the same kind are OR-ed and the kinds present are combined according to
//! the [`FilterPolicy`]. An empty filter list always matches.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};

use crate::profile::Pattern;
use crate::types::{RequestContext, ResourceType};

// =============================================================================
// Weekdays
// =============================================================================

bitflags::bitflags! {
    /// Days of the week a time window recurs on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Weekdays: u8 {
        const MON = 1 << 0;
        const TUE = 1 << 1;
        const WED = 1 << 2;
        const THU = 1 << 3;
        const FRI = 1 << 4;
        const SAT = 1 << 5;
        const SUN = 1 << 6;

        const ALL = 0x7F;
        const WEEKDAYS = 0x1F;
        const WEEKEND = Self::SAT.bits() | Self::SUN.bits();
    }
}

impl Weekdays {
    pub fn from_weekday(day: Weekday) -> Self {
        Self::from_bits_truncate(1 << day.num_days_from_monday())
    }

    /// Parse a short or long English day name (`mon`, `Monday`).
    pub fn from_day_name(name: &str) -> Option<Self> {
        name.parse::<Weekday>().ok().map(Self::from_weekday)
    }
}

// =============================================================================
// Time Window
// =============================================================================

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A daily recurring window `[start, end)`, in minutes after local midnight.
///
/// `end < start` wraps past midnight; the part after midnight belongs to the
/// previous day for weekday checks. `start == end` covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_minute: u16,
    pub end_minute: u16,
    pub weekdays: Weekdays,
    /// Local time offset from UTC, in minutes.
    pub utc_offset_minutes: i32,
}

impl TimeWindow {
    pub fn daily(start_minute: u16, end_minute: u16) -> Self {
        Self {
            start_minute: start_minute % MINUTES_PER_DAY,
            end_minute: end_minute % MINUTES_PER_DAY,
            weekdays: Weekdays::ALL,
            utc_offset_minutes: 0,
        }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        let Some(offset) = FixedOffset::east_opt(self.utc_offset_minutes * 60) else {
            return false;
        };
        let Some(utc) = DateTime::from_timestamp_millis(timestamp_ms) else {
            return false;
        };
        let local = utc.with_timezone(&offset);
        let minute = (local.hour() * 60 + local.minute()) as u16;
        let today = local.weekday();

        let (start, end) = (self.start_minute, self.end_minute);
        if start == end {
            return self.on_day(today);
        }
        if start < end {
            return minute >= start && minute < end && self.on_day(today);
        }
        if minute >= start {
            self.on_day(today)
        } else if minute < end {
            self.on_day(today.pred())
        } else {
            false
        }
    }

    #[inline]
    fn on_day(&self, day: Weekday) -> bool {
        self.weekdays.contains(Weekdays::from_weekday(day))
    }
}

// =============================================================================
// Filters
// =============================================================================

/// A single activation predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Url(Pattern),
    ExcludeUrl(Pattern),
    ResourceType(ResourceType),
    Tab(i32),
    TabGroup(i32),
    Window(i32),
    Time(TimeWindow),
}

/// How the filter kinds present on a profile are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combine {
    /// Every kind present must match.
    #[default]
    All,
    /// Any kind present suffices.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterPolicy {
    pub across_kinds: Combine,
}

const KIND_COUNT: usize = 6;

impl Filter {
    /// Slot for same-kind OR grouping; `None` for exclusions.
    fn kind_slot(&self) -> Option<usize> {
        match self {
            Self::Url(_) => Some(0),
            Self::ResourceType(_) => Some(1),
            Self::Tab(_) => Some(2),
            Self::TabGroup(_) => Some(3),
            Self::Window(_) => Some(4),
            Self::Time(_) => Some(5),
            Self::ExcludeUrl(_) => None,
        }
    }

    fn matches_one(&self, ctx: &RequestContext<'_>) -> bool {
        match self {
            Self::Url(pattern) | Self::ExcludeUrl(pattern) => pattern.is_match(ctx.url),
            Self::ResourceType(types) => types.intersects(ctx.resource_type),
            Self::Tab(id) => *id == ctx.tab_id,
            Self::TabGroup(id) => *id == ctx.tab_group_id,
            Self::Window(id) => *id == ctx.window_id,
            Self::Time(window) => window.contains(ctx.timestamp_ms),
        }
    }
}

/// Decide whether a profile with `filters` applies to `ctx`.
pub fn matches(filters: &[Filter], ctx: &RequestContext<'_>, policy: FilterPolicy) -> bool {
    if filters.is_empty() {
        return true;
    }

    let excluded = filters
        .iter()
        .any(|f| matches!(f, Filter::ExcludeUrl(_)) && f.matches_one(ctx));
    if excluded {
        return false;
    }

    let mut kinds: [Option<bool>; KIND_COUNT] = [None; KIND_COUNT];
    for filter in filters {
        if let Some(slot) = filter.kind_slot() {
            let matched = kinds[slot].unwrap_or(false) || filter.matches_one(ctx);
            kinds[slot] = Some(matched);
        }
    }

    let mut present = kinds.iter().flatten().peekable();
    if present.peek().is_none() {
        return true;
    }
    match policy.across_kinds {
        Combine::All => present.all(|&matched| matched),
        Combine::Any => present.any(|&matched| matched),
    }
}
