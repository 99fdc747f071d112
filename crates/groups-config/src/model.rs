//! Group definitions as they appear in `groups.yaml` files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Pseudo-setting that switches a group to full membership sync.
///
/// It is never pushed to the settings API.
pub const RECONCILE_MEMBERS_SETTING: &str = "ReconcileMembers";

/// Membership role of an identifier within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Manager,
    Member,
}

impl Role {
    /// All roles in reconciliation order.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Manager, Role::Member];

    /// Wire name used by the directory API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Member => "MEMBER",
        }
    }

    /// Parse a wire name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Some(Role::Owner),
            "MANAGER" => Some(Role::Manager),
            "MEMBER" => Some(Role::Member),
            _ => None,
        }
    }

    /// True for roles that can administer the group.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Owner | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single group definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Group {
    /// Unique email address of the group. Must be non-empty after merging.
    #[serde(rename = "email-id", default)]
    pub email_id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Group settings keyed by setting name (e.g. `WhoCanJoin`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

impl Group {
    /// Create a group with only its identity set.
    pub fn new(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            ..Self::default()
        }
    }

    /// Identifiers listed for a role, in declaration order.
    pub fn members_with_role(&self, role: Role) -> &[String] {
        match role {
            Role::Owner => &self.owners,
            Role::Manager => &self.managers,
            Role::Member => &self.members,
        }
    }

    /// Whether every directory member not listed here should be removed.
    pub fn reconciles_members(&self) -> bool {
        self.settings
            .get(RECONCILE_MEMBERS_SETTING)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// Owners followed by managers.
    pub fn privileged_members(&self) -> impl Iterator<Item = &String> {
        self.owners.iter().chain(self.managers.iter())
    }

    /// Owners, managers and members.
    pub fn all_members(&self) -> impl Iterator<Item = &String> {
        self.privileged_members().chain(self.members.iter())
    }
}

/// Top-level document of a `groups.yaml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsFile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
}

impl GroupsFile {
    /// Parse a `groups.yaml` document. Blank input is an empty file.
    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Render as a `groups.yaml` document.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
