//! Failure Injection for the Mock Directory
//!
//! Supports configurable failure injection for testing error paths.

use std::collections::HashMap;

/// Directory and settings operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListGroups,
    GetGroup,
    ListMembers,
    CreateOrUpdateGroup,
    AddOrUpdateMember,
    RemoveMember,
    DeleteGroup,
    GetSettings,
    UpdateSettings,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListGroups => "list groups",
            Operation::GetGroup => "get group",
            Operation::ListMembers => "list members",
            Operation::CreateOrUpdateGroup => "update group",
            Operation::AddOrUpdateMember => "update member",
            Operation::RemoveMember => "remove member",
            Operation::DeleteGroup => "delete group",
            Operation::GetSettings => "get settings",
            Operation::UpdateSettings => "update settings",
        }
    }
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// HTTP status to report
    pub status: u16,
    /// Error message to return
    pub message: String,
    /// Only fail calls for this target (group or member address)
    pub target: Option<String>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that returns an error
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            target: None,
            fail_count: None,
        }
    }

    /// Restrict the failure to calls about one address
    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    fn applies_to(&self, target: &str) -> bool {
        self.target
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case(target))
            .unwrap_or(true)
    }
}

/// Failure injector for the mock directory
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// Per-operation failure configs
    configs: HashMap<Operation, FailureConfig>,
    /// Matching call counts per operation (for fail_count tracking)
    call_counts: HashMap<Operation, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an operation
    pub fn inject(&mut self, op: Operation, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Clear failure injection for a specific operation
    pub fn clear_op(&mut self, op: Operation) {
        self.configs.remove(&op);
        self.call_counts.remove(&op);
    }

    /// Check if a call to `op` about `target` should fail
    pub fn check(&mut self, op: Operation, target: &str) -> Option<&FailureConfig> {
        let config = self.configs.get(&op)?;
        if !config.applies_to(target) {
            return None;
        }

        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if let Some(fail_limit) = config.fail_count {
            if *count > fail_limit {
                return None;
            }
        }

        Some(config)
    }
}
