//! Group settings abstraction.
//!
//! Settings are handled as a flat map from setting name to string value, using
//! the PascalCase names of `groups.yaml` (`WhoCanJoin`, `AllowExternalMembers`).

mod live;

pub use live::{GroupsSettingsClient, SETTINGS_API_BASE};

use std::collections::BTreeMap;

use groups_config::RECONCILE_MEMBERS_SETTING;

use crate::api::RemoteError;

/// Settings of one group, keyed by PascalCase setting name.
pub type GroupSettings = BTreeMap<String, String>;

/// Settings reported for each group when printing remote state.
pub const REPORTED_SETTINGS: &[&str] = &[
    "AllowExternalMembers",
    "WhoCanJoin",
    "WhoCanViewMembership",
    "WhoCanViewGroup",
    "WhoCanDiscoverGroup",
    "WhoCanInvite",
    "WhoCanAdd",
    "WhoCanApproveMembers",
    "WhoCanModifyMembers",
    "WhoCanModerateMembers",
    "MembersCanPostAsTheGroup",
];

/// Read and write group settings.
pub trait SettingsService: Send + Sync {
    fn get(&self, group_email: &str) -> Result<GroupSettings, RemoteError>;

    /// Apply the given settings; settings not present are left unchanged.
    fn update(&self, group_email: &str, settings: &GroupSettings) -> Result<(), RemoteError>;
}

/// Configured settings whose remote value differs.
///
/// Pseudo-settings that only steer reconciliation are never included.
pub fn settings_diff(desired: &GroupSettings, current: &GroupSettings) -> GroupSettings {
    desired
        .iter()
        .filter(|(key, _)| key.as_str() != RECONCILE_MEMBERS_SETTING)
        .filter(|(key, value)| current.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
