//! Cloud backup rotation
//!
//! Backups are keyed by the millisecond timestamp they were written at.

pub const MAX_BACKUPS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupPlan {
    /// Keys to delete, oldest first.
    pub remove: Vec<String>,
    /// Key for the new backup, if one should be written.
    pub write: Option<String>,
}

/// Existing backup keys, oldest first. Numeric keys sort by value.
pub fn sorted_backup_keys(keys: &[String]) -> Vec<&str> {
    let mut sorted: Vec<&str> = keys.iter().map(String::as_str).collect();
    sorted.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    sorted
}

pub fn latest_backup_key(keys: &[String]) -> Option<&str> {
    sorted_backup_keys(keys).last().copied()
}

/// Plan the next backup. `latest_matches` tells whether the newest existing
/// backup already holds the current profiles.
pub fn plan_cloud_backup(existing_keys: &[String], latest_matches: bool, now_ms: i64) -> BackupPlan {
    let sorted = sorted_backup_keys(existing_keys);
    let write = sorted.is_empty() || !latest_matches;
    let kept_after_write = sorted.len() + usize::from(write);
    let excess = kept_after_write.saturating_sub(MAX_BACKUPS);

    let plan = BackupPlan {
        remove: sorted[..excess].iter().map(|key| key.to_string()).collect(),
        write: write.then(|| now_ms.to_string()),
    };
    log::debug!(
        "Backup plan: remove {} of {}, write {:?}",
        plan.remove.len(),
        sorted.len(),
        plan.write
    );
    plan
}
