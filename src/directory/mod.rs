//! Directory service abstraction
//!
//! The reconciler talks to the directory through [`DirectoryService`]:
//! - `AdminDirectoryClient`: Admin SDK Directory API for production
//! - `crate::mock::MockDirectory`: in-process recording double for tests

mod admin;

pub use admin::{AdminDirectoryClient, DIRECTORY_API_BASE};

use groups_config::{Group, Role};
use serde::{Deserialize, Serialize};

use crate::api::RemoteError;

/// A group as the directory reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroup {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl RemoteGroup {
    /// Whether name and description already match the configured group.
    pub fn matches(&self, group: &Group) -> bool {
        self.name == group.name && self.description == group.description
    }
}

impl From<&Group> for RemoteGroup {
    fn from(group: &Group) -> Self {
        Self {
            email: group.email_id.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
        }
    }
}

/// A membership as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMember {
    pub email: String,
    pub role: Role,
}

impl RemoteMember {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }
}

/// Group and membership operations of the directory.
pub trait DirectoryService: Send + Sync {
    /// Every group in the domain.
    fn list_groups(&self) -> Result<Vec<RemoteGroup>, RemoteError>;

    /// A single group, or `None` if it does not exist.
    fn get_group(&self, email: &str) -> Result<Option<RemoteGroup>, RemoteError>;

    /// Every member of a group.
    fn list_members(&self, group_email: &str) -> Result<Vec<RemoteMember>, RemoteError>;

    /// Create the group, or update name and description if it exists.
    fn create_or_update_group(&self, group: &Group) -> Result<(), RemoteError>;

    /// Add `email` with `role`, or change the role of an existing member.
    fn add_or_update_member(
        &self,
        group_email: &str,
        role: Role,
        email: &str,
    ) -> Result<(), RemoteError>;

    fn remove_member(&self, group_email: &str, email: &str) -> Result<(), RemoteError>;

    fn delete_group(&self, email: &str) -> Result<(), RemoteError>;
}

/// Case-insensitive address comparison, as the directory treats addresses.
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_group_matches() {
        let mut group = Group::new("a@example.com");
        group.name = "A".to_string();
        group.description = "Group A".to_string();

        let remote = RemoteGroup::from(&group);
        assert!(remote.matches(&group));

        group.description = "changed".to_string();
        assert!(!remote.matches(&group));
    }

    #[test]
    fn test_same_address() {
        assert!(same_address("Alice@Example.com", "alice@example.com"));
        assert!(!same_address("alice@example.com", "alice2@example.com"));
    }
}
