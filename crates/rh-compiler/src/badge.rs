//! Browser action badge and context menu state

use rh_core::Profile;

use crate::builder::ActiveProfiles;

pub const PAUSED_BADGE_TEXT: &str = "❚❚";
pub const PAUSED_BADGE_COLOR: &str = "#666";
pub const IDLE_BADGE_COLOR: &str = "#fff";

/// Modifiers counted on the badge. Cookie and CSP modifiers are left out.
pub fn badge_modifier_count(profile: &Profile) -> usize {
    profile.headers.len()
        + profile.resp_headers.len()
        + profile.set_cookie_headers.len()
        + profile.url_replacements.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeIcon {
    Regular,
    Disabled,
}

impl BadgeIcon {
    pub fn path(self) -> &'static str {
        match self {
            Self::Regular => "images/icon.png",
            Self::Disabled => "images/icon_bw.png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeState {
    pub icon: BadgeIcon,
    pub text: String,
    pub color: String,
}

impl BadgeState {
    pub fn compute(is_paused: bool, active: &ActiveProfiles) -> Self {
        if is_paused {
            return Self {
                icon: BadgeIcon::Disabled,
                text: PAUSED_BADGE_TEXT.to_string(),
                color: PAUSED_BADGE_COLOR.to_string(),
            };
        }
        match active.profiles.iter().map(badge_modifier_count).sum::<usize>() {
            0 => Self {
                icon: BadgeIcon::Disabled,
                text: String::new(),
                color: IDLE_BADGE_COLOR.to_string(),
            },
            count => Self {
                icon: BadgeIcon::Regular,
                text: count.to_string(),
                color: active.background_color().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseMenuState {
    pub is_paused: bool,
}

impl PauseMenuState {
    pub fn new(is_paused: bool) -> Self {
        Self { is_paused }
    }

    pub fn title(&self) -> &'static str {
        if self.is_paused {
            "Unpause"
        } else {
            "Pause"
        }
    }
}

/// Remembers the last value pushed to the browser so unchanged state is not
/// pushed again.
#[derive(Debug, Clone, Default)]
pub struct DisplayCache<T> {
    last: Option<T>,
}

impl<T: PartialEq> DisplayCache<T> {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Store `value`, returning it only when it differs from the last one.
    pub fn update(&mut self, value: T) -> Option<&T> {
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value);
        self.last.as_ref()
    }

    pub fn get(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// Forget the last value so the next update always yields.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
