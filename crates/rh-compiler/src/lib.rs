//! reheader Profile Compiler
//!
//! This crate turns the profiles persisted by the extension into engine-ready
//! [`rh_core::Profile`] values, selects the active set, and derives the
//! browser action state shown for it.

pub mod error;
pub mod parser;
pub mod optimizer;
pub mod builder;
pub mod badge;
pub mod sync;

pub use badge::{badge_modifier_count, BadgeIcon, BadgeState, DisplayCache, PauseMenuState};
pub use builder::{select_active_profiles, ActiveProfiles, ProfileLoadError};
pub use error::ProfileError;
pub use optimizer::{optimize_profile, OptimizeStats};
pub use parser::{parse_profiles, parse_storage, StorageSnapshot, StoredProfile};
pub use sync::{plan_cloud_backup, BackupPlan, MAX_BACKUPS};
