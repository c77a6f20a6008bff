use std::fs;
use std::path::Path;

use serde::Deserialize;

use rh_compiler::{parse_profiles, parse_storage, StorageSnapshot, StoredProfile};
use rh_core::types::NO_ID;
use rh_core::{Header, RequestContext, ResourceType};

/// A request or response event, shaped like a `webRequest` details object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextFixture {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default = "no_id")]
    pub tab_id: i32,
    #[serde(default = "no_id")]
    pub tab_group_id: i32,
    #[serde(default = "no_id")]
    pub window_id: i32,
    #[serde(default)]
    pub time_stamp: Option<f64>,
    #[serde(default)]
    pub request_headers: Vec<Header>,
    #[serde(default)]
    pub response_headers: Option<Vec<Header>>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn no_id() -> i32 {
    NO_ID
}

impl ContextFixture {
    /// `now_ms` stands in for a missing `timeStamp`.
    pub fn context(&self, now_ms: i64) -> RequestContext<'_> {
        RequestContext {
            url: &self.url,
            method: &self.method,
            resource_type: self
                .resource_type
                .as_deref()
                .map(ResourceType::from_browser_name_lossy)
                .unwrap_or(ResourceType::OTHER),
            tab_id: self.tab_id,
            tab_group_id: self.tab_group_id,
            window_id: self.window_id,
            timestamp_ms: self.time_stamp.map(|ts| ts as i64).unwrap_or(now_ms),
            request_headers: &self.request_headers,
            response_headers: self.response_headers.as_deref(),
        }
    }
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

pub fn read_profiles(path: &Path) -> Result<Vec<StoredProfile>, String> {
    let text = read_text(path)?;
    parse_profiles(&text).map_err(|e| format!("'{}': {}", path.display(), e))
}

pub fn read_storage(path: &Path) -> Result<StorageSnapshot, String> {
    let text = read_text(path)?;
    parse_storage(&text).map_err(|e| format!("'{}': {}", path.display(), e))
}

pub fn read_context(path: &Path) -> Result<ContextFixture, String> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid context '{}': {}", path.display(), e))
}
