//! Discovery of `groups.yaml` fragments under a groups root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::ConfigError;
use crate::model::{Group, GroupsFile};
use crate::restrictions::relative_path;

/// File name of a group fragment.
pub const GROUPS_FILE_NAME: &str = "groups.yaml";

/// The parsed contents of one `groups.yaml` file.
#[derive(Debug, Clone)]
pub struct ConfigFragment {
    /// Location of the file on disk.
    pub path: PathBuf,
    /// Location relative to the groups root, `/`-separated.
    pub relative_path: String,
    /// Groups in declaration order.
    pub groups: Vec<Group>,
}

impl ConfigFragment {
    /// Read and parse a fragment file.
    pub fn read(path: &Path, root_dir: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = GroupsFile::from_yaml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            relative_path: relative_path(path, root_dir),
            groups: file.groups,
        })
    }
}

/// Lazy, single-pass traversal yielding every fragment under a root.
///
/// The first error is yielded once and ends the traversal.
pub struct FragmentWalker {
    root: PathBuf,
    entries: walkdir::IntoIter,
    done: bool,
}

/// Walk `root_dir` for `groups.yaml` files.
///
/// Entries within a directory are visited in file-name order.
pub fn walk(root_dir: &Path) -> FragmentWalker {
    debug!(root = %root_dir.display(), "reading groups.yaml files recursively");
    FragmentWalker {
        root: root_dir.to_path_buf(),
        entries: WalkDir::new(root_dir)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter(),
        done: false,
    }
}

impl FragmentWalker {
    fn next_fragment(&mut self) -> Option<Result<ConfigFragment, ConfigError>> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => return Some(Err(ConfigError::Walk(e))),
            };
            if !entry.file_type().is_file() || entry.file_name() != GROUPS_FILE_NAME {
                continue;
            }
            let fragment = ConfigFragment::read(entry.path(), &self.root);
            if let Ok(ref f) = fragment {
                debug!(path = %f.relative_path, groups = f.groups.len(), "found groups file");
            }
            return Some(fragment);
        }
        None
    }
}

impl Iterator for FragmentWalker {
    type Item = Result<ConfigFragment, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_fragment();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

impl std::iter::FusedIterator for FragmentWalker {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_finds_nested_fragments_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "groups.yaml", "groups:\n  - email-id: root@x.com\n");
        write(dir.path(), "b/groups.yaml", "groups:\n  - email-id: b@x.com\n");
        write(dir.path(), "a/deep/groups.yaml", "groups:\n  - email-id: a@x.com\n");

        let paths: Vec<String> = walk(dir.path())
            .map(|f| f.unwrap().relative_path)
            .collect();

        assert_eq!(paths, vec!["a/deep/groups.yaml", "b/groups.yaml", "groups.yaml"]);
    }

    #[test]
    fn test_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "restrictions.yaml", "restrictions: []\n");
        write(dir.path(), "x/groups.yml", "not: [valid");
        write(dir.path(), "x/my-groups.yaml", "not: [valid");
        write(dir.path(), "x/groups.yaml", "groups:\n  - email-id: x@x.com\n");

        let fragments: Vec<_> = walk(dir.path()).collect::<Result<_, _>>().unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].groups[0].email_id, "x@x.com");
    }

    #[test]
    fn test_directory_named_groups_yaml_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("groups.yaml")).unwrap();

        assert_eq!(walk(dir.path()).count(), 0);
    }

    #[test]
    fn test_parse_error_names_file_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/groups.yaml", "groups: [unterminated\n");
        write(dir.path(), "b/groups.yaml", "groups:\n  - email-id: b@x.com\n");

        let mut walker = walk(dir.path());
        let err = walker.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("groups.yaml"));
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_missing_root_is_walk_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut walker = walk(&dir.path().join("nope"));

        assert!(matches!(walker.next(), Some(Err(ConfigError::Walk(_)))));
        assert!(walker.next().is_none());
    }
}
