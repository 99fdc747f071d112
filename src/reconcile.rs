//! Reconciliation of configured groups against the directory.
//!
//! Each configured group is brought in line with its definition:
//! - the group itself is created, or its name and description are updated
//! - settings whose remote value differs are pushed in a single update
//! - members are added or have their role changed, owners first
//! - members no longer listed are removed
//!
//! Remote groups that no configuration defines are deleted afterwards.
//!
//! Without `confirm` the reconciler is a dry run: reads still happen, every
//! mutation is logged with `dry_run = true` and nothing is sent.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use groups_config::{Group, Role};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::RemoteError;
use crate::directory::{same_address, DirectoryService, RemoteGroup, RemoteMember};
use crate::settings::{settings_diff, GroupSettings, SettingsService};

/// Reconciliation errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("group {0:?} has no email-id")]
    MissingEmailId(String),

    #[error("reconciling {group}: {source}")]
    Remote {
        group: String,
        #[source]
        source: RemoteError,
    },
}

fn remote_err(group: &str) -> impl FnOnce(RemoteError) -> ReconcileError + '_ {
    move |source| ReconcileError::Remote {
        group: group.to_string(),
        source,
    }
}

/// Counts of the changes made (or, in a dry run, intended).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub groups_created: usize,
    pub groups_updated: usize,
    pub settings_updated: usize,
    pub members_added: usize,
    pub members_updated: usize,
    pub members_removed: usize,
    pub member_failures: usize,
    pub groups_deleted: usize,
}

impl ReconcileSummary {
    /// Total number of mutations.
    pub fn changes(&self) -> usize {
        self.groups_created
            + self.groups_updated
            + self.settings_updated
            + self.members_added
            + self.members_updated
            + self.members_removed
            + self.groups_deleted
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "groups: {} created, {} updated, {} deleted; settings: {} updated; \
             members: {} added, {} updated, {} removed, {} failed",
            self.groups_created,
            self.groups_updated,
            self.groups_deleted,
            self.settings_updated,
            self.members_added,
            self.members_updated,
            self.members_removed,
            self.member_failures,
        )
    }
}

/// What to do with one listed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberAction {
    Add,
    Update(Role),
    Keep,
}

fn member_action(current: &[RemoteMember], email: &str, role: Role) -> MemberAction {
    match current.iter().find(|m| same_address(&m.email, email)) {
        None => MemberAction::Add,
        Some(m) if m.role != role => MemberAction::Update(m.role),
        Some(_) => MemberAction::Keep,
    }
}

/// Directory members that are not listed in the group definition.
///
/// With `ReconcileMembers: "true"` every unlisted member is returned.
/// Otherwise only unlisted owners and managers are.
fn members_to_remove<'a>(group: &Group, current: &'a [RemoteMember]) -> Vec<&'a RemoteMember> {
    let full = group.reconciles_members();
    let listed: HashSet<String> = if full {
        group.all_members().map(|e| e.to_ascii_lowercase()).collect()
    } else {
        group.privileged_members().map(|e| e.to_ascii_lowercase()).collect()
    };

    current
        .iter()
        .filter(|m| full || m.role.is_privileged())
        .filter(|m| !listed.contains(&m.email.to_ascii_lowercase()))
        .collect()
}

/// Applies group definitions to the directory.
pub struct Reconciler {
    directory: Arc<dyn DirectoryService>,
    settings: Arc<dyn SettingsService>,
    confirm: bool,
}

impl Reconciler {
    pub fn new(
        directory: Arc<dyn DirectoryService>,
        settings: Arc<dyn SettingsService>,
        confirm: bool,
    ) -> Self {
        Self {
            directory,
            settings,
            confirm,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        !self.confirm
    }

    /// Reconcile every group in order, then delete unconfigured remote groups.
    pub fn reconcile_groups(&self, groups: &[Group]) -> Result<ReconcileSummary, ReconcileError> {
        let mut summary = ReconcileSummary::default();
        info!(groups = groups.len(), dry_run = self.is_dry_run(), "reconciling groups");

        for group in groups {
            self.reconcile_group(group, &mut summary)?;
        }
        self.delete_unconfigured(groups, &mut summary)?;

        Ok(summary)
    }

    fn reconcile_group(
        &self,
        group: &Group,
        summary: &mut ReconcileSummary,
    ) -> Result<(), ReconcileError> {
        if group.email_id.is_empty() {
            return Err(ReconcileError::MissingEmailId(group.name.clone()));
        }
        let email = group.email_id.as_str();
        debug!(group = %email, "reconciling group");

        let remote = self.directory.get_group(email).map_err(remote_err(email))?;
        self.ensure_group(group, remote.as_ref(), summary)
            .map_err(remote_err(email))?;

        // A group that did not exist has nothing to compare against.
        let (current_settings, mut current_members) = match remote {
            Some(_) => (
                self.settings.get(email).map_err(remote_err(email))?,
                self.directory.list_members(email).map_err(remote_err(email))?,
            ),
            None => (GroupSettings::new(), Vec::new()),
        };

        self.push_settings(group, &current_settings, summary)
            .map_err(remote_err(email))?;
        self.add_members(group, &mut current_members, summary)
            .map_err(remote_err(email))?;
        self.remove_members(group, &current_members, summary)
            .map_err(remote_err(email))?;

        Ok(())
    }

    fn ensure_group(
        &self,
        group: &Group,
        remote: Option<&RemoteGroup>,
        summary: &mut ReconcileSummary,
    ) -> Result<(), RemoteError> {
        let email = group.email_id.as_str();
        match remote {
            Some(existing) if existing.matches(group) => {
                debug!(group = %email, "group up to date");
                return Ok(());
            }
            Some(_) => {
                info!(
                    group = %email,
                    name = %group.name,
                    dry_run = self.is_dry_run(),
                    "updating group"
                );
                summary.groups_updated += 1;
            }
            None => {
                info!(
                    group = %email,
                    name = %group.name,
                    dry_run = self.is_dry_run(),
                    "creating group"
                );
                summary.groups_created += 1;
            }
        }

        if self.confirm {
            self.directory.create_or_update_group(group)?;
        }
        Ok(())
    }

    fn push_settings(
        &self,
        group: &Group,
        current: &GroupSettings,
        summary: &mut ReconcileSummary,
    ) -> Result<(), RemoteError> {
        let email = group.email_id.as_str();
        let changed = settings_diff(&group.settings, current);
        if changed.is_empty() {
            return Ok(());
        }

        for (key, value) in &changed {
            info!(
                group = %email,
                setting = %key,
                from = current.get(key).map(String::as_str).unwrap_or(""),
                to = %value,
                dry_run = self.is_dry_run(),
                "updating setting"
            );
        }
        summary.settings_updated += 1;

        if self.confirm {
            self.settings.update(email, &changed)?;
        }
        Ok(())
    }

    /// Add or re-role listed identifiers, owners first.
    ///
    /// `current` is kept in step with every change that was made (or would
    /// be made in a dry run) so removal sees the resulting membership.
    fn add_members(
        &self,
        group: &Group,
        current: &mut Vec<RemoteMember>,
        summary: &mut ReconcileSummary,
    ) -> Result<(), RemoteError> {
        let group_email = group.email_id.as_str();

        for role in Role::ALL {
            for email in group.members_with_role(role) {
                let action = member_action(current, email, role);
                match action {
                    MemberAction::Keep => continue,
                    MemberAction::Add => {
                        info!(
                            group = %group_email,
                            member = %email,
                            role = %role,
                            dry_run = self.is_dry_run(),
                            "adding member"
                        );
                    }
                    MemberAction::Update(from) => {
                        info!(
                            group = %group_email,
                            member = %email,
                            from = %from,
                            to = %role,
                            dry_run = self.is_dry_run(),
                            "changing member role"
                        );
                    }
                }

                if self.confirm {
                    if let Err(e) = self.directory.add_or_update_member(group_email, role, email) {
                        if role.is_privileged() {
                            return Err(e);
                        }
                        warn!(
                            group = %group_email,
                            member = %email,
                            error = %e,
                            "failed to add member, skipping"
                        );
                        summary.member_failures += 1;
                        continue;
                    }
                }

                match action {
                    MemberAction::Add => {
                        summary.members_added += 1;
                        current.push(RemoteMember::new(email.clone(), role));
                    }
                    MemberAction::Update(_) => {
                        summary.members_updated += 1;
                        let existing = current.iter_mut().find(|m| same_address(&m.email, email));
                        if let Some(m) = existing {
                            m.role = role;
                        }
                    }
                    MemberAction::Keep => {}
                }
            }
        }
        Ok(())
    }

    fn remove_members(
        &self,
        group: &Group,
        current: &[RemoteMember],
        summary: &mut ReconcileSummary,
    ) -> Result<(), RemoteError> {
        let group_email = group.email_id.as_str();

        for member in members_to_remove(group, current) {
            info!(
                group = %group_email,
                member = %member.email,
                role = %member.role,
                dry_run = self.is_dry_run(),
                "removing member"
            );
            if self.confirm {
                self.directory.remove_member(group_email, &member.email)?;
            }
            summary.members_removed += 1;
        }
        Ok(())
    }

    fn delete_unconfigured(
        &self,
        groups: &[Group],
        summary: &mut ReconcileSummary,
    ) -> Result<(), ReconcileError> {
        let configured: HashSet<String> = groups
            .iter()
            .map(|g| g.email_id.to_ascii_lowercase())
            .collect();

        let remote = self
            .directory
            .list_groups()
            .map_err(remote_err("all groups"))?;

        for existing in remote {
            if configured.contains(&existing.email.to_ascii_lowercase()) {
                continue;
            }
            info!(
                group = %existing.email,
                dry_run = self.is_dry_run(),
                "deleting unconfigured group"
            );
            if self.confirm {
                self.directory
                    .delete_group(&existing.email)
                    .map_err(remote_err(&existing.email))?;
            }
            summary.groups_deleted += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(owners: &[&str], managers: &[&str], members: &[&str]) -> Group {
        let mut g = Group::new("g@x.com");
        g.owners = owners.iter().map(|s| s.to_string()).collect();
        g.managers = managers.iter().map(|s| s.to_string()).collect();
        g.members = members.iter().map(|s| s.to_string()).collect();
        g
    }

    #[test]
    fn test_member_action() {
        let current = vec![
            RemoteMember::new("Owner@x.com", Role::Owner),
            RemoteMember::new("m@x.com", Role::Member),
        ];
        assert_eq!(member_action(&current, "owner@x.com", Role::Owner), MemberAction::Keep);
        assert_eq!(
            member_action(&current, "m@x.com", Role::Manager),
            MemberAction::Update(Role::Member)
        );
        assert_eq!(member_action(&current, "new@x.com", Role::Member), MemberAction::Add);
    }

    #[test]
    fn test_remove_only_privileged_by_default() {
        let g = group(&["o@x.com"], &[], &["m@x.com"]);
        let current = vec![
            RemoteMember::new("o@x.com", Role::Owner),
            RemoteMember::new("old-owner@x.com", Role::Owner),
            RemoteMember::new("old-manager@x.com", Role::Manager),
            RemoteMember::new("stranger@x.com", Role::Member),
        ];
        let emails: Vec<&str> = members_to_remove(&g, &current)
            .iter()
            .map(|m| m.email.as_str())
            .collect();
        assert_eq!(emails, vec!["old-owner@x.com", "old-manager@x.com"]);
    }

    #[test]
    fn test_remove_everyone_unlisted_when_reconciling_members() {
        let mut g = group(&["o@x.com"], &[], &["M@x.com"]);
        g.settings.insert("ReconcileMembers".to_string(), "true".to_string());
        let current = vec![
            RemoteMember::new("o@x.com", Role::Owner),
            RemoteMember::new("m@x.com", Role::Member),
            RemoteMember::new("stranger@x.com", Role::Member),
        ];
        let removed = members_to_remove(&g, &current);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].email, "stranger@x.com");
    }

    #[test]
    fn test_summary_changes() {
        let summary = ReconcileSummary {
            groups_created: 1,
            members_added: 3,
            member_failures: 2,
            ..Default::default()
        };
        assert_eq!(summary.changes(), 4);
        assert!(summary.to_string().contains("3 added"));
    }
}
