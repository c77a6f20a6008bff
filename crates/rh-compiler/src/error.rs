//! Profile loading errors

/// Error type for profile parsing and compilation.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Selected profile {index} out of range ({len} profiles)")]
    SelectedOutOfRange { index: usize, len: usize },
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),
    #[error("Invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("Unknown weekday: {0}")]
    UnknownWeekday(String),
    #[error("UTC offset out of range: {0} minutes")]
    InvalidUtcOffset(i32),
}
