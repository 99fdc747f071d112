//! Print the directory's current groups as `groups.yaml`.
//!
//! Useful for bootstrapping a configuration tree from an existing domain.

use groups_config::{Group, GroupsFile, Role};
use tracing::{debug, info};

use crate::api::RemoteError;
use crate::directory::DirectoryService;
use crate::settings::{SettingsService, REPORTED_SETTINGS};

/// Read every remote group with its reported settings and members.
pub fn collect(
    directory: &dyn DirectoryService,
    settings: &dyn SettingsService,
) -> Result<GroupsFile, RemoteError> {
    let remote = directory.list_groups()?;
    if remote.is_empty() {
        info!("no groups found");
        return Ok(GroupsFile::default());
    }

    let mut groups = Vec::with_capacity(remote.len());
    for remote_group in remote {
        debug!(group = %remote_group.email, "reading group");
        let mut group = Group::new(remote_group.email);
        group.name = remote_group.name;
        group.description = remote_group.description;

        let current = settings.get(&group.email_id)?;
        group.settings = REPORTED_SETTINGS
            .iter()
            .filter_map(|key| current.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect();

        for member in directory.list_members(&group.email_id)? {
            match member.role {
                Role::Owner => group.owners.push(member.email),
                Role::Manager => group.managers.push(member.email),
                Role::Member => group.members.push(member.email),
            }
        }
        groups.push(group);
    }

    Ok(GroupsFile { groups })
}

/// Render collected groups. Empty when there is nothing to print.
pub fn render(file: &GroupsFile) -> Result<String, serde_yaml::Error> {
    if file.groups.is_empty() {
        return Ok(String::new());
    }
    file.to_yaml_string()
}
