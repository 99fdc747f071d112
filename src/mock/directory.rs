//! Mock Directory Implementation
//!
//! In-process directory and settings service that records every call.

use std::sync::{Arc, Mutex};

use groups_config::{Group, Role};

use super::failure::{FailureConfig, FailureInjector, Operation};
use super::state::{Call, MockState};
use crate::api::RemoteError;
use crate::directory::{DirectoryService, RemoteGroup, RemoteMember};
use crate::settings::{GroupSettings, SettingsService};

/// Configurable mock directory for testing
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // === Public API for test configuration ===

    /// Seed a group with its members and settings, as if already reconciled
    pub fn with_group(self, group: &Group) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.upsert_group(RemoteGroup::from(group));
            for role in Role::ALL {
                for email in group.members_with_role(role) {
                    state.upsert_member(&group.email_id, RemoteMember::new(email.clone(), role));
                }
            }
            state.merge_settings(&group.email_id, &group.settings);
        }
        self
    }

    /// Seed an empty group
    pub fn add_group(&self, email: &str, name: &str, description: &str) {
        let mut state = self.state.lock().unwrap();
        state.upsert_group(RemoteGroup {
            email: email.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        });
    }

    /// Seed a membership
    pub fn add_member(&self, group: &str, email: &str, role: Role) {
        let mut state = self.state.lock().unwrap();
        state.upsert_member(group, RemoteMember::new(email, role));
    }

    /// Seed a setting
    pub fn set_setting(&self, group: &str, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let mut update = GroupSettings::new();
        update.insert(key.to_string(), value.to_string());
        state.merge_settings(group, &update);
    }

    /// Inject a failure configuration for an operation
    pub fn inject_failure(&self, op: Operation, config: FailureConfig) {
        let mut failures = self.failures.lock().unwrap();
        failures.inject(op, config);
    }

    /// Clear all failure injections
    pub fn clear_failures(&self) {
        let mut failures = self.failures.lock().unwrap();
        failures.clear();
    }

    // === Assertions ===

    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that changed (or tried to change) remote state
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn group(&self, email: &str) -> Option<RemoteGroup> {
        self.state.lock().unwrap().group(email).cloned()
    }

    pub fn group_emails(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.groups.iter().map(|g| g.email.clone()).collect()
    }

    pub fn members(&self, group: &str) -> Vec<RemoteMember> {
        self.state.lock().unwrap().members_of(group)
    }

    pub fn settings(&self, group: &str) -> GroupSettings {
        self.state.lock().unwrap().settings_of(group)
    }

    // === Request handling ===

    /// Record a call and apply any injected failure
    fn begin(&self, call: Call, op: Operation, target: &str) -> Result<(), RemoteError> {
        self.state.lock().unwrap().calls.push(call);

        let mut failures = self.failures.lock().unwrap();
        match failures.check(op, target) {
            Some(failure) => Err(RemoteError::status(
                op.as_str(),
                target,
                failure.status,
                failure.message.clone(),
            )),
            None => Ok(()),
        }
    }

    fn not_found(op: Operation, target: &str) -> RemoteError {
        RemoteError::status(op.as_str(), target, 404, "Resource Not Found")
    }

    fn require_group(&self, op: Operation, email: &str) -> Result<(), RemoteError> {
        match self.state.lock().unwrap().group(email) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(op, email)),
        }
    }
}

impl DirectoryService for MockDirectory {
    fn list_groups(&self) -> Result<Vec<RemoteGroup>, RemoteError> {
        self.begin(Call::ListGroups, Operation::ListGroups, "")?;
        Ok(self.state.lock().unwrap().groups.clone())
    }

    fn get_group(&self, email: &str) -> Result<Option<RemoteGroup>, RemoteError> {
        self.begin(Call::GetGroup(email.to_string()), Operation::GetGroup, email)?;
        Ok(self.group(email))
    }

    fn list_members(&self, group_email: &str) -> Result<Vec<RemoteMember>, RemoteError> {
        let op = Operation::ListMembers;
        self.begin(Call::ListMembers(group_email.to_string()), op, group_email)?;
        self.require_group(op, group_email)?;
        Ok(self.members(group_email))
    }

    fn create_or_update_group(&self, group: &Group) -> Result<(), RemoteError> {
        self.begin(
            Call::CreateOrUpdateGroup(group.email_id.clone()),
            Operation::CreateOrUpdateGroup,
            &group.email_id,
        )?;
        self.state.lock().unwrap().upsert_group(RemoteGroup::from(group));
        Ok(())
    }

    fn add_or_update_member(
        &self,
        group_email: &str,
        role: Role,
        email: &str,
    ) -> Result<(), RemoteError> {
        let op = Operation::AddOrUpdateMember;
        self.begin(
            Call::AddOrUpdateMember {
                group: group_email.to_string(),
                role,
                email: email.to_string(),
            },
            op,
            email,
        )?;
        self.require_group(op, group_email)?;
        self.state
            .lock()
            .unwrap()
            .upsert_member(group_email, RemoteMember::new(email, role));
        Ok(())
    }

    fn remove_member(&self, group_email: &str, email: &str) -> Result<(), RemoteError> {
        let op = Operation::RemoveMember;
        self.begin(
            Call::RemoveMember {
                group: group_email.to_string(),
                email: email.to_string(),
            },
            op,
            email,
        )?;
        if self.state.lock().unwrap().remove_member(group_email, email) {
            Ok(())
        } else {
            Err(Self::not_found(op, email))
        }
    }

    fn delete_group(&self, email: &str) -> Result<(), RemoteError> {
        let op = Operation::DeleteGroup;
        self.begin(Call::DeleteGroup(email.to_string()), op, email)?;
        if self.state.lock().unwrap().remove_group(email) {
            Ok(())
        } else {
            Err(Self::not_found(op, email))
        }
    }
}

impl SettingsService for MockDirectory {
    fn get(&self, group_email: &str) -> Result<GroupSettings, RemoteError> {
        let op = Operation::GetSettings;
        self.begin(Call::GetSettings(group_email.to_string()), op, group_email)?;
        self.require_group(op, group_email)?;
        Ok(self.settings(group_email))
    }

    fn update(&self, group_email: &str, settings: &GroupSettings) -> Result<(), RemoteError> {
        let op = Operation::UpdateSettings;
        self.begin(
            Call::UpdateSettings {
                group: group_email.to_string(),
                settings: settings.clone(),
            },
            op,
            group_email,
        )?;
        self.require_group(op, group_email)?;
        self.state.lock().unwrap().merge_settings(group_email, settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_and_list() {
        let mut group = Group::new("g@x.com");
        group.owners = vec!["o@x.com".to_string()];
        group.members = vec!["m@x.com".to_string()];
        let mock = MockDirectory::new().with_group(&group);

        assert_eq!(mock.list_groups().unwrap().len(), 1);
        assert_eq!(
            mock.list_members("g@x.com").unwrap(),
            vec![
                RemoteMember::new("o@x.com", Role::Owner),
                RemoteMember::new("m@x.com", Role::Member),
            ]
        );
        assert!(mock.mutations().is_empty());
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn test_missing_group_is_not_found() {
        let mock = MockDirectory::new();
        assert!(mock.get_group("nope@x.com").unwrap().is_none());
        assert!(mock.list_members("nope@x.com").unwrap_err().is_not_found());
        assert!(mock.delete_group("nope@x.com").unwrap_err().is_not_found());
        assert!(SettingsService::get(&mock, "nope@x.com").unwrap_err().is_not_found());
    }

    #[test]
    fn test_injected_failure_is_recorded() {
        let mock = MockDirectory::new();
        mock.add_group("g@x.com", "g", "");
        mock.inject_failure(Operation::DeleteGroup, FailureConfig::error(403, "forbidden"));

        let err = mock.delete_group("g@x.com").unwrap_err();
        assert_eq!(err.http_status(), Some(403));
        assert_eq!(mock.mutations(), vec![Call::DeleteGroup("g@x.com".to_string())]);
        assert!(mock.group("g@x.com").is_some());
    }

    #[test]
    fn test_settings_update_merges() {
        let mock = MockDirectory::new();
        mock.add_group("g@x.com", "g", "");
        mock.set_setting("g@x.com", "WhoCanJoin", "INVITED_CAN_JOIN");

        let mut update = GroupSettings::new();
        update.insert("WhoCanAdd".to_string(), "ALL_MANAGERS_CAN_ADD".to_string());
        mock.update("g@x.com", &update).unwrap();

        let settings = mock.settings("g@x.com");
        assert_eq!(settings.len(), 2);
        assert_eq!(settings["WhoCanJoin"], "INVITED_CAN_JOIN");
    }
}
