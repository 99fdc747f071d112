//! Merging fragments into a single validated group list
//!
//! Merging is append-only:
//! - every group needs an email-id
//! - the email-id must be allowed by the restriction for its file
//! - an email-id may be defined once across the whole tree, ignoring case

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, MergeError};
use crate::model::Group;
use crate::restrictions::{Restriction, RestrictionSet};
use crate::walker::{walk, ConfigFragment};

/// Identity key of a group. The directory does not distinguish case.
fn identity(email_id: &str) -> String {
    email_id.to_ascii_lowercase()
}

/// Append `incoming` to `accumulated` after validating every incoming group.
///
/// Identities are checked against everything accumulated so far, including
/// earlier groups of the same batch. On error `accumulated` is left untouched.
pub fn merge_groups(
    accumulated: &mut Vec<Group>,
    incoming: Vec<Group>,
    restriction: &Restriction,
) -> Result<(), MergeError> {
    let mut emails: HashSet<String> = accumulated.iter().map(|g| identity(&g.email_id)).collect();

    for group in &incoming {
        if group.email_id.is_empty() {
            return Err(MergeError::MissingEmailId);
        }
        if !restriction.allows(&group.email_id) {
            return Err(MergeError::Restricted {
                email: group.email_id.clone(),
                path: restriction.path().to_string(),
            });
        }
        if !emails.insert(identity(&group.email_id)) {
            return Err(MergeError::Duplicate {
                email: group.email_id.clone(),
            });
        }
    }

    accumulated.extend(incoming);
    Ok(())
}

/// All groups of a groups tree, validated and in discovery order.
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
    root: PathBuf,
    groups: Vec<Group>,
}

impl MergedConfig {
    /// An empty configuration rooted at `root`.
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            groups: Vec::new(),
        }
    }

    /// Walk `root` and merge every fragment found.
    pub fn build(root: &Path, restrictions: &RestrictionSet) -> Result<Self, ConfigError> {
        let mut merged = Self::empty(root);
        walk(root).try_for_each(|fragment| merged.push_fragment(fragment?, restrictions))?;
        info!(
            root = %root.display(),
            groups = merged.len(),
            "loaded groups configuration"
        );
        Ok(merged)
    }

    /// Merge one fragment using the restriction that covers its location.
    ///
    /// A rejected fragment leaves the configuration as it was.
    pub fn push_fragment(
        &mut self,
        fragment: ConfigFragment,
        restrictions: &RestrictionSet,
    ) -> Result<(), ConfigError> {
        let restriction = restrictions.matcher_for(&fragment.path, &self.root);
        debug!(
            path = %fragment.relative_path,
            restriction = restriction.path(),
            "merging groups"
        );

        let relative_path = fragment.relative_path;
        merge_groups(&mut self.groups, fragment.groups, restriction).map_err(|source| {
            ConfigError::Merge {
                path: relative_path,
                source,
            }
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<Group> {
        self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up a group by email-id, ignoring case.
    pub fn get(&self, email_id: &str) -> Option<&Group> {
        self.groups
            .iter()
            .find(|g| g.email_id.eq_ignore_ascii_case(email_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restrictions::RestrictionEntry;

    fn groups(emails: &[&str]) -> Vec<Group> {
        emails.iter().map(|e| Group::new(*e)).collect()
    }

    fn team_restriction() -> Restriction {
        Restriction::compile(&RestrictionEntry {
            path: "team/**".to_string(),
            allowed_groups: vec!["^team-.*".to_string()],
        })
        .unwrap()
    }

    fn fragment(root: &Path, rel: &str, emails: &[&str]) -> ConfigFragment {
        ConfigFragment {
            path: root.join(rel),
            relative_path: rel.to_string(),
            groups: groups(emails),
        }
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut merged = groups(&["a@x.com"]);
        merge_groups(
            &mut merged,
            groups(&["b@x.com", "c@x.com"]),
            &Restriction::permit_all(),
        )
        .unwrap();

        let emails: Vec<_> = merged.iter().map(|g| g.email_id.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn test_merge_empty_fragment_is_identity() {
        let a = groups(&["a@x.com", "b@x.com"]);
        let mut merged = a.clone();
        merge_groups(&mut merged, Vec::new(), &team_restriction()).unwrap();
        assert_eq!(merged, a);
    }

    #[test]
    fn test_missing_email_id() {
        let mut merged = Vec::new();
        let err = merge_groups(&mut merged, groups(&[""]), &Restriction::permit_all()).unwrap_err();
        assert_eq!(err, MergeError::MissingEmailId);
    }

    #[test]
    fn test_restriction_violation_names_group_and_path() {
        let mut merged = Vec::new();
        let err =
            merge_groups(&mut merged, groups(&["other@x.com"]), &team_restriction()).unwrap_err();
        assert_eq!(
            err,
            MergeError::Restricted {
                email: "other@x.com".to_string(),
                path: "team/**".to_string(),
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("other@x.com"));
        assert!(msg.contains("team/**"));
    }

    #[test]
    fn test_duplicate_against_accumulated() {
        let mut merged = groups(&["dup@x.com"]);
        let err = merge_groups(
            &mut merged,
            groups(&["new@x.com", "dup@x.com"]),
            &Restriction::permit_all(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            MergeError::Duplicate {
                email: "dup@x.com".to_string()
            }
        );
    }

    #[test]
    fn test_failed_merge_leaves_accumulator_untouched() {
        let mut merged = groups(&["a@x.com"]);
        let err = merge_groups(
            &mut merged,
            groups(&["b@x.com", "a@x.com"]),
            &Restriction::permit_all(),
        );

        assert!(err.is_err());
        assert_eq!(merged, groups(&["a@x.com"]));
    }

    #[test]
    fn test_duplicate_ignores_case() {
        let mut merged = groups(&["Team@x.com"]);
        let err = merge_groups(&mut merged, groups(&["team@X.COM"]), &Restriction::permit_all())
            .unwrap_err();
        assert_eq!(
            err,
            MergeError::Duplicate {
                email: "team@X.COM".to_string()
            }
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_duplicate_within_same_batch() {
        let mut merged = Vec::new();
        let err = merge_groups(
            &mut merged,
            groups(&["a@x.com", "b@x.com", "A@x.com"]),
            &Restriction::permit_all(),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::Duplicate { ref email } if email == "A@x.com"));
        assert!(merged.is_empty());
    }

    #[test]
    fn test_first_failure_reported() {
        // Empty email-id is checked before the restriction.
        let mut merged = Vec::new();
        let err = merge_groups(
            &mut merged,
            vec![Group::new("team-ok@x.com"), Group::new(""), Group::new("bad@x.com")],
            &team_restriction(),
        )
        .unwrap_err();
        assert_eq!(err, MergeError::MissingEmailId);
    }

    #[test]
    fn test_push_fragment_uses_path_restriction() {
        let restrictions = RestrictionSet::from_entries(&[RestrictionEntry {
            path: "team/**".to_string(),
            allowed_groups: vec!["^team-".to_string()],
        }])
        .unwrap();
        let root = Path::new("/groups");

        let mut merged = MergedConfig::empty(root);
        merged
            .push_fragment(fragment(root, "team/groups.yaml", &["team-a@x.com"]), &restrictions)
            .unwrap();
        merged
            .push_fragment(fragment(root, "groups.yaml", &["anything@x.com"]), &restrictions)
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert!(merged.get("Anything@x.com").is_some());

        let err = merged
            .push_fragment(
                fragment(root, "team/sub/groups.yaml", &["other@x.com"]),
                &restrictions,
            )
            .unwrap_err();
        match err {
            ConfigError::Merge { path, source } => {
                assert_eq!(path, "team/sub/groups.yaml");
                assert!(matches!(source, MergeError::Restricted { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(merged.len(), 2);
    }
}
