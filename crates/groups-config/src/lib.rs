//! Hierarchical group configuration.
//!
//! Group definitions live in `groups.yaml` files anywhere below a groups
//! root. This crate discovers those files, checks each group against the
//! path restriction covering its file, and merges everything into one list
//! in which every email-id is defined exactly once.

mod error;
mod merge;
mod model;
mod restrictions;
mod walker;

pub use error::{ConfigError, MergeError};
pub use merge::{merge_groups, MergedConfig};
pub use model::{Group, GroupsFile, Role, RECONCILE_MEMBERS_SETTING};
pub use restrictions::{
    relative_path, Restriction, RestrictionEntry, RestrictionSet, RestrictionsFile,
    DEFAULT_RESTRICTION_PATH,
};
pub use walker::{walk, ConfigFragment, FragmentWalker, GROUPS_FILE_NAME};
