//! Run configuration loaded from `config.yaml`.
//!
//! ```yaml
//! bot-id: groups-bot@example.com
//! secret-version: projects/p/secrets/groups-key/versions/latest
//! groups-path: /srv/groups            # optional, defaults to the config dir
//! restrictions-path: restrictions.yaml # optional
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use groups_config::{ConfigError, RestrictionSet};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default restrictions file name, relative to the groups path
pub const DEFAULT_RESTRICTIONS_FILE: &str = "restrictions.yaml";

/// Run configuration errors
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("error reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0} must be set in the config file")]
    MissingField(&'static str),

    #[error("groups-path must be an absolute path, got: {0}")]
    RelativeGroupsPath(PathBuf),
}

/// On-disk shape of `config.yaml`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFile {
    #[serde(default)]
    bot_id: String,
    #[serde(default)]
    secret_version: String,
    groups_path: Option<PathBuf>,
    restrictions_path: Option<PathBuf>,
}

/// Resolved run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Account the service identity acts as
    pub bot_id: String,
    /// Secret Manager version holding the service account key
    pub secret_version: String,
    /// Absolute root of the groups tree
    pub groups_path: PathBuf,
    pub restrictions_path: PathBuf,
    /// Whether `restrictions_path` was set in the file
    pub restrictions_explicit: bool,
}

impl RunConfig {
    /// Load and resolve a configuration file.
    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        info!(path = %path.display(), "reading config file");
        let contents = fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| RunConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        let config_dir = config_dir(path)?;
        Self::resolve(file, &config_dir)
    }

    fn resolve(file: ConfigFile, config_dir: &Path) -> Result<Self, RunConfigError> {
        if file.bot_id.is_empty() {
            return Err(RunConfigError::MissingField("bot-id"));
        }
        if file.secret_version.is_empty() {
            return Err(RunConfigError::MissingField("secret-version"));
        }

        let groups_path = match file.groups_path {
            Some(p) if p.is_absolute() => p,
            Some(p) => return Err(RunConfigError::RelativeGroupsPath(p)),
            None => config_dir.to_path_buf(),
        };

        let (restrictions_path, restrictions_explicit) = match file.restrictions_path {
            Some(p) if p.is_absolute() => (p, true),
            Some(p) => (config_dir.join(p), true),
            None => (groups_path.join(DEFAULT_RESTRICTIONS_FILE), false),
        };

        Ok(Self {
            bot_id: file.bot_id,
            secret_version: file.secret_version,
            groups_path,
            restrictions_path,
            restrictions_explicit,
        })
    }

    /// Load the restrictions file.
    ///
    /// A missing default file means no restrictions; a missing file that
    /// was named explicitly is an error.
    pub fn load_restrictions(&self) -> Result<RestrictionSet, ConfigError> {
        if self.restrictions_explicit {
            RestrictionSet::load(&self.restrictions_path)
        } else {
            RestrictionSet::load_or_default(&self.restrictions_path)
        }
    }

    pub fn log_summary(&self, confirm: bool) {
        info!(bot_id = %self.bot_id, "config");
        info!(secret_version = %self.secret_version, "config");
        info!(groups_path = %self.groups_path.display(), "config");
        info!(restrictions_path = %self.restrictions_path.display(), "config");
        info!(confirm, "config");
    }
}

/// Absolute directory containing the config file.
fn config_dir(path: &Path) -> Result<PathBuf, RunConfigError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::canonicalize(dir).map_err(|source| RunConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
