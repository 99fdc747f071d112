//! Error types for configuration loading and merging.

use std::path::PathBuf;

/// A group that cannot be merged into the accumulated configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("groups must have email-id")]
    MissingEmailId,

    #[error("cannot define group {email:?} in {path:?}")]
    Restricted { email: String, path: String },

    #[error("cannot overwrite group definitions (duplicate group name {email})")]
    Duplicate { email: String },
}

/// Errors raised while loading restrictions or group fragments.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("error parsing group pattern {pattern:?} for path {path:?}: {source}")]
    InvalidPattern {
        pattern: String,
        path: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("invalid restriction path glob {path:?}: {source}")]
    InvalidGlob {
        path: String,
        #[source]
        source: globset::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("couldn't merge groups from {path}: {source}")]
    Merge {
        path: String,
        #[source]
        source: MergeError,
    },
}
