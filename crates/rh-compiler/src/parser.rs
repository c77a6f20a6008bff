//! Stored profile format
//!
//! Profiles are persisted by the extension as JSON with camelCase keys.
//! Every list entry carries an `enabled` flag that defaults to `true`, and
//! any missing list defaults to empty.

use serde::{Deserialize, Serialize};

use rh_core::AppendMode;

use crate::error::ProfileError;

fn default_enabled() -> bool {
    true
}

// =============================================================================
// Modifiers
// =============================================================================

/// Append mode as persisted: older profiles store a boolean, newer ones a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredAppendMode {
    Flag(bool),
    Named(String),
}

impl StoredAppendMode {
    pub fn to_append_mode(&self) -> AppendMode {
        match self {
            Self::Flag(false) => AppendMode::Overwrite,
            Self::Flag(true) => AppendMode::Append,
            Self::Named(name) => match name.to_ascii_lowercase().as_str() {
                "append" => AppendMode::Append,
                "comma" | "comma_separated_append" | "comma-separated-append" => {
                    AppendMode::CommaSeparatedAppend
                }
                _ => AppendMode::Overwrite,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredHeader {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_mode: Option<StoredAppendMode>,
    #[serde(default)]
    pub send_empty_header: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub regex_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSetCookie {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub regex_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(default)]
    pub attribute_override: bool,
    #[serde(default)]
    pub retain_existing_cookie: bool,
}

/// CSP directive modifier and URL replacement share the name/value shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNameValue {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

// =============================================================================
// Filters
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUrlFilter {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub url_regex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResourceFilter {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub resource_type: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTabFilter {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub tab_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTabGroupFilter {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub tab_group_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWindowFilter {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub window_id: i32,
}

/// Daily window, `HH:MM` local times. `days` empty means every day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTimeFilter {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

// =============================================================================
// Profile
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredProfile {
    pub title: String,
    pub background_color: String,
    pub always_on: bool,
    pub headers: Vec<StoredHeader>,
    pub resp_headers: Vec<StoredHeader>,
    pub cookie_headers: Vec<StoredCookie>,
    pub set_cookie_headers: Vec<StoredSetCookie>,
    pub csp_headers: Vec<StoredNameValue>,
    pub url_replacements: Vec<StoredNameValue>,
    pub url_filters: Vec<StoredUrlFilter>,
    pub exclude_url_filters: Vec<StoredUrlFilter>,
    pub resource_filters: Vec<StoredResourceFilter>,
    pub tab_filters: Vec<StoredTabFilter>,
    pub tab_group_filters: Vec<StoredTabGroupFilter>,
    pub window_filters: Vec<StoredWindowFilter>,
    pub time_filters: Vec<StoredTimeFilter>,
}

/// The slice of extension storage the engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSnapshot {
    pub profiles: Vec<StoredProfile>,
    /// Profiles installed by enterprise policy; always active.
    pub managed_profiles: Vec<StoredProfile>,
    pub selected_profile: Option<usize>,
    pub is_paused: bool,
    /// When set, modifications only apply to this tab.
    pub locked_tab_id: Option<i32>,
}

pub fn parse_profiles(json: &str) -> Result<Vec<StoredProfile>, ProfileError> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_storage(json: &str) -> Result<StorageSnapshot, ProfileError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_profile_with_defaults() {
        let profiles = parse_profiles(r#"[{"headers":[{"name":"Foo","value":"Bar"}]}]"#).unwrap();
        assert_eq!(profiles.len(), 1);
        let header = &profiles[0].headers[0];
        assert!(header.enabled);
        assert_eq!(header.name, "Foo");
        assert!(header.append_mode.is_none());
        assert!(profiles[0].set_cookie_headers.is_empty());
        assert!(!profiles[0].always_on);
    }

    #[test]
    fn parses_append_modes() {
        let profiles = parse_profiles(
            r#"[{"headers":[
                {"name":"a","value":"1","appendMode":true},
                {"name":"b","value":"2","appendMode":"comma"},
                {"name":"c","value":"3","appendMode":false}
            ]}]"#,
        )
        .unwrap();
        let modes: Vec<AppendMode> = profiles[0]
            .headers
            .iter()
            .map(|h| h.append_mode.as_ref().map(StoredAppendMode::to_append_mode).unwrap_or_default())
            .collect();
        assert_eq!(
            modes,
            vec![AppendMode::Append, AppendMode::CommaSeparatedAppend, AppendMode::Overwrite]
        );
    }

    #[test]
    fn parses_storage_snapshot() {
        let storage = parse_storage(
            r#"{"profiles":[{"title":"P1"},{"title":"P2","alwaysOn":true}],
                "selectedProfile":0,"isPaused":true,"lockedTabId":4}"#,
        )
        .unwrap();
        assert_eq!(storage.profiles.len(), 2);
        assert!(storage.profiles[1].always_on);
        assert_eq!(storage.selected_profile, Some(0));
        assert!(storage.is_paused);
        assert_eq!(storage.locked_tab_id, Some(4));
        assert!(storage.managed_profiles.is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_profiles("[{"), Err(ProfileError::Json(_))));
    }
}
