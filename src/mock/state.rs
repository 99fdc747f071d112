//! Mock Directory State Management
//!
//! Holds groups, memberships and settings, and records every call.

use std::collections::HashMap;

use groups_config::Role;

use crate::directory::{same_address, RemoteGroup, RemoteMember};
use crate::settings::GroupSettings;

/// A call received by the mock directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListGroups,
    GetGroup(String),
    ListMembers(String),
    CreateOrUpdateGroup(String),
    AddOrUpdateMember {
        group: String,
        role: Role,
        email: String,
    },
    RemoveMember {
        group: String,
        email: String,
    },
    DeleteGroup(String),
    GetSettings(String),
    UpdateSettings {
        group: String,
        settings: GroupSettings,
    },
}

impl Call {
    /// Returns true for calls that change remote state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateOrUpdateGroup(_)
                | Call::AddOrUpdateMember { .. }
                | Call::RemoveMember { .. }
                | Call::DeleteGroup(_)
                | Call::UpdateSettings { .. }
        )
    }
}

/// Mock directory state container
#[derive(Debug, Default)]
pub struct MockState {
    /// Groups in creation order
    pub groups: Vec<RemoteGroup>,
    /// Members by group address
    pub members: HashMap<String, Vec<RemoteMember>>,
    /// Settings by group address
    pub settings: HashMap<String, GroupSettings>,
    /// Every call, in order
    pub calls: Vec<Call>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(email: &str) -> String {
        email.to_ascii_lowercase()
    }

    pub fn group(&self, email: &str) -> Option<&RemoteGroup> {
        self.groups.iter().find(|g| same_address(&g.email, email))
    }

    /// Insert or replace a group
    pub fn upsert_group(&mut self, group: RemoteGroup) {
        match self.groups.iter_mut().find(|g| same_address(&g.email, &group.email)) {
            Some(existing) => *existing = group,
            None => self.groups.push(group),
        }
    }

    /// Remove a group and everything attached to it
    pub fn remove_group(&mut self, email: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| !same_address(&g.email, email));
        self.members.remove(&Self::key(email));
        self.settings.remove(&Self::key(email));
        self.groups.len() != before
    }

    pub fn members_of(&self, group: &str) -> Vec<RemoteMember> {
        self.members.get(&Self::key(group)).cloned().unwrap_or_default()
    }

    /// Add a member or change its role
    pub fn upsert_member(&mut self, group: &str, member: RemoteMember) {
        let members = self.members.entry(Self::key(group)).or_default();
        match members.iter_mut().find(|m| same_address(&m.email, &member.email)) {
            Some(existing) => existing.role = member.role,
            None => members.push(member),
        }
    }

    pub fn remove_member(&mut self, group: &str, email: &str) -> bool {
        match self.members.get_mut(&Self::key(group)) {
            Some(members) => {
                let before = members.len();
                members.retain(|m| !same_address(&m.email, email));
                members.len() != before
            }
            None => false,
        }
    }

    pub fn settings_of(&self, group: &str) -> GroupSettings {
        self.settings.get(&Self::key(group)).cloned().unwrap_or_default()
    }

    /// Merge settings into the group's current settings
    pub fn merge_settings(&mut self, group: &str, update: &GroupSettings) {
        let settings = self.settings.entry(Self::key(group)).or_default();
        for (key, value) in update {
            settings.insert(key.clone(), value.clone());
        }
    }
}
