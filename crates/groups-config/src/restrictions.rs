//! Path restrictions for which groups may be defined where.
//!
//! A restrictions file binds a glob over `groups.yaml` locations (relative to
//! the groups root) to a list of regular expressions. A group defined in a
//! matching file must have an email-id matched by at least one expression.
//! Paths covered by no restriction accept any email-id.

use std::fs;
use std::io;
use std::path::{Component, Path};

use globset::{GlobBuilder, GlobMatcher};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Path pattern reported by the fallback restriction.
pub const DEFAULT_RESTRICTION_PATH: &str = "*";

/// On-disk form of a single restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionEntry {
    /// Glob relative to the groups root, e.g. `sig-foo/**`.
    pub path: String,

    /// Regular expressions for email-ids allowed under `path`.
    #[serde(rename = "allowedGroups", default)]
    pub allowed_groups: Vec<String>,
}

/// On-disk form of a restrictions file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionsFile {
    #[serde(default)]
    pub restrictions: Vec<RestrictionEntry>,
}

/// Which email-ids a restriction admits.
#[derive(Debug, Clone)]
enum GroupPolicy {
    /// Fallback for unrestricted paths.
    AnyGroup,
    /// At least one expression must match. An empty list admits nothing.
    Patterns(Vec<Regex>),
}

/// A compiled restriction.
#[derive(Debug, Clone)]
pub struct Restriction {
    path: String,
    glob: Option<GlobMatcher>,
    policy: GroupPolicy,
}

impl Restriction {
    /// The restriction applied to paths no declared restriction covers.
    pub fn permit_all() -> Self {
        Self {
            path: DEFAULT_RESTRICTION_PATH.to_string(),
            glob: None,
            policy: GroupPolicy::AnyGroup,
        }
    }

    /// Compile a restriction entry. Both the glob and every pattern must be valid.
    pub fn compile(entry: &RestrictionEntry) -> Result<Self, ConfigError> {
        let glob = GlobBuilder::new(&entry.path)
            .literal_separator(true)
            .build()
            .map_err(|source| ConfigError::InvalidGlob {
                path: entry.path.clone(),
                source,
            })?
            .compile_matcher();

        let patterns = entry
            .allowed_groups
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    path: entry.path.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            path: entry.path.clone(),
            glob: Some(glob),
            policy: GroupPolicy::Patterns(patterns),
        })
    }

    /// The glob this restriction was declared with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// True for the fallback restriction.
    pub fn is_default(&self) -> bool {
        matches!(self.policy, GroupPolicy::AnyGroup)
    }

    /// Whether a root-relative path falls under this restriction.
    pub fn covers(&self, relative_path: &str) -> bool {
        self.glob
            .as_ref()
            .map(|g| g.is_match(relative_path))
            .unwrap_or(false)
    }

    /// Whether a group email-id may be defined under this restriction.
    pub fn allows(&self, email_id: &str) -> bool {
        match &self.policy {
            GroupPolicy::AnyGroup => true,
            GroupPolicy::Patterns(patterns) => patterns.iter().any(|re| re.is_match(email_id)),
        }
    }
}

/// Restrictions in declaration order, plus the permit-all fallback.
#[derive(Debug, Clone)]
pub struct RestrictionSet {
    restrictions: Vec<Restriction>,
    fallback: Restriction,
}

impl Default for RestrictionSet {
    fn default() -> Self {
        Self {
            restrictions: Vec::new(),
            fallback: Restriction::permit_all(),
        }
    }
}

impl RestrictionSet {
    /// Load and compile a restrictions file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "reading restrictions config file");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Like [`RestrictionSet::load`], but a missing file yields an empty set.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "restrictions file not found, all paths are unrestricted"
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse restrictions from YAML text. `origin` is only used in errors.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: RestrictionsFile = if contents.trim().is_empty() {
            RestrictionsFile::default()
        } else {
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?
        };
        Self::from_entries(&file.restrictions)
    }

    /// Compile entries, failing on the first invalid glob or pattern.
    pub fn from_entries(entries: &[RestrictionEntry]) -> Result<Self, ConfigError> {
        let restrictions = entries
            .iter()
            .map(Restriction::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            restrictions,
            fallback: Restriction::permit_all(),
        })
    }

    pub fn len(&self) -> usize {
        self.restrictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restrictions.is_empty()
    }

    /// The first restriction covering `candidate`, or the permit-all fallback.
    pub fn matcher_for(&self, candidate: &Path, root_dir: &Path) -> &Restriction {
        let relative = relative_path(candidate, root_dir);
        self.restrictions
            .iter()
            .find(|r| r.covers(&relative))
            .unwrap_or(&self.fallback)
    }
}

/// `candidate` relative to `root_dir`, with `/` separators and no leading or
/// trailing separator. Paths outside the root keep their normal components.
pub fn relative_path(candidate: &Path, root_dir: &Path) -> String {
    let stripped = candidate.strip_prefix(root_dir).unwrap_or(candidate);
    stripped
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, allowed: &[&str]) -> RestrictionEntry {
        RestrictionEntry {
            path: path.to_string(),
            allowed_groups: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/groups");
        assert_eq!(
            relative_path(Path::new("/groups/team/sub/groups.yaml"), root),
            "team/sub/groups.yaml"
        );
        assert_eq!(relative_path(Path::new("/groups/groups.yaml"), root), "groups.yaml");
        assert_eq!(relative_path(Path::new("/groups"), root), "");
    }

    #[test]
    fn test_doublestar_matches_nested() {
        let set = RestrictionSet::from_entries(&[entry("team/**", &["^team-"])]).unwrap();
        let root = Path::new("/root");

        let r = set.matcher_for(Path::new("/root/team/sub/groups.yaml"), root);
        assert_eq!(r.path(), "team/**");
        assert!(!r.is_default());

        let r = set.matcher_for(Path::new("/root/team/groups.yaml"), root);
        assert_eq!(r.path(), "team/**");
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let set = RestrictionSet::from_entries(&[entry("team/*", &[".*"])]).unwrap();
        let root = Path::new("/root");

        assert!(!set
            .matcher_for(Path::new("/root/team/groups.yaml"), root)
            .is_default());
        assert!(set
            .matcher_for(Path::new("/root/team/sub/groups.yaml"), root)
            .is_default());
    }

    #[test]
    fn test_unmatched_path_gets_default() {
        let set = RestrictionSet::from_entries(&[entry("team/**", &["^team-"])]).unwrap();
        let r = set.matcher_for(Path::new("/root/other/groups.yaml"), Path::new("/root"));

        assert!(r.is_default());
        assert_eq!(r.path(), DEFAULT_RESTRICTION_PATH);
        assert!(r.allows("anything@example.com"));
    }

    #[test]
    fn test_first_declared_wins() {
        let set = RestrictionSet::from_entries(&[
            entry("team/**", &["^first-"]),
            entry("team/sub/**", &["^second-"]),
        ])
        .unwrap();

        for _ in 0..3 {
            let r = set.matcher_for(Path::new("/r/team/sub/groups.yaml"), Path::new("/r"));
            assert_eq!(r.path(), "team/**");
            assert!(r.allows("first-x@example.com"));
            assert!(!r.allows("second-x@example.com"));
        }
    }

    #[test]
    fn test_empty_pattern_list_allows_nothing() {
        let r = Restriction::compile(&entry("locked/**", &[])).unwrap();
        assert!(!r.allows("a@example.com"));
    }

    #[test]
    fn test_any_pattern_may_match() {
        let r = Restriction::compile(&entry("x/**", &["^a-", "^b-"])).unwrap();
        assert!(r.allows("a-1@example.com"));
        assert!(r.allows("b-1@example.com"));
        assert!(!r.allows("c-1@example.com"));
    }

    #[test]
    fn test_invalid_regex_names_pattern_and_path() {
        let err = RestrictionSet::from_entries(&[
            entry("ok/**", &["^fine"]),
            entry("bad/**", &["(unclosed"]),
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("(unclosed"));
        assert!(msg.contains("bad/**"));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let err = RestrictionSet::from_entries(&[entry("team/[", &[".*"])]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGlob { .. }));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
restrictions:
  - path: "sig-a/**"
    allowedGroups:
      - "^sig-a@example.com$"
  - path: "wg-*/groups.yaml"
    allowedGroups:
      - "^wg-"
"#;
        let set = RestrictionSet::parse(yaml, Path::new("restrictions.yaml")).unwrap();
        assert_eq!(set.len(), 2);

        let r = set.matcher_for(Path::new("/g/wg-x/groups.yaml"), Path::new("/g"));
        assert_eq!(r.path(), "wg-*/groups.yaml");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let set = RestrictionSet::load_or_default(&dir.path().join("restrictions.yaml")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RestrictionSet::load(&dir.path().join("restrictions.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
