//! Active profile selection
//!
//! Managed profiles come first, in order, followed by every stored profile
//! that is either selected or always on, in stored order.

use rh_core::Profile;

use crate::error::ProfileError;
use crate::optimizer::{optimize_profile, OptimizeStats};
use crate::parser::{StorageSnapshot, StoredProfile};

/// Fallback badge color when no stored profile is selected.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#666";

/// A profile that could not be compiled and was left out.
#[derive(Debug)]
pub struct ProfileLoadError {
    pub title: String,
    pub error: ProfileError,
}

#[derive(Debug, Default)]
pub struct ActiveProfiles {
    pub profiles: Vec<Profile>,
    /// Index into `profiles` of the selected stored profile.
    pub selected: Option<usize>,
    pub background_color: Option<String>,
    /// Tab the extension is locked to; feeds `EngineSettings::locked_tab_id`.
    pub locked_tab_id: Option<i32>,
    pub errors: Vec<ProfileLoadError>,
    pub stats: OptimizeStats,
}

impl ActiveProfiles {
    pub fn selected_profile(&self) -> Option<&Profile> {
        self.selected.and_then(|index| self.profiles.get(index))
    }

    pub fn modifier_count(&self) -> usize {
        self.profiles.iter().map(Profile::modifier_count).sum()
    }

    pub fn background_color(&self) -> &str {
        self.background_color
            .as_deref()
            .filter(|color| !color.is_empty())
            .unwrap_or(DEFAULT_BACKGROUND_COLOR)
    }
}

pub fn select_active_profiles(storage: &StorageSnapshot) -> ActiveProfiles {
    let mut active = ActiveProfiles {
        locked_tab_id: storage.locked_tab_id,
        ..ActiveProfiles::default()
    };

    let selected = match storage.selected_profile {
        Some(index) if index >= storage.profiles.len() => {
            let error = ProfileError::SelectedOutOfRange {
                index,
                len: storage.profiles.len(),
            };
            log::warn!("{}", error);
            active.errors.push(ProfileLoadError {
                title: String::new(),
                error,
            });
            None
        }
        other => other,
    };

    for stored in &storage.managed_profiles {
        push_profile(&mut active, stored);
    }

    for (index, stored) in storage.profiles.iter().enumerate() {
        let is_selected = selected == Some(index);
        if !is_selected && !stored.always_on {
            continue;
        }
        if push_profile(&mut active, stored) && is_selected {
            active.selected = Some(active.profiles.len() - 1);
        }
        if is_selected {
            active.background_color = Some(stored.background_color.clone());
        }
    }

    log::debug!(
        "Selected {} active profiles ({} errors)",
        active.profiles.len(),
        active.errors.len()
    );
    active
}

fn push_profile(active: &mut ActiveProfiles, stored: &StoredProfile) -> bool {
    match optimize_profile(stored) {
        Ok((profile, stats)) => {
            active.stats.merge(&stats);
            active.profiles.push(profile);
            true
        }
        Err(error) => {
            log::warn!("Skipping profile {:?}: {}", stored.title, error);
            active.errors.push(ProfileLoadError {
                title: stored.title.clone(),
                error,
            });
            false
        }
    }
}
