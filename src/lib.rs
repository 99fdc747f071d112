//! groups-sync - declarative group membership for a Google Workspace domain
//!
//! Group definitions are read from a tree of `groups.yaml` files (see the
//! `groups-config` crate), checked against path restrictions, and then
//! reconciled against the Admin SDK Directory and Groups Settings APIs
//! using a delegated service account.

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod mock;
pub mod reconcile;
pub mod secrets;
pub mod settings;
pub mod snapshot;

pub use api::{ApiClient, RemoteError};
pub use auth::{
    ambient_token_source, key_file_token_source, AuthError, DelegatedCredentials,
    MetadataTokenSource, ServiceAccountKey, TokenSource,
};
pub use config::{RunConfig, RunConfigError};
pub use directory::{AdminDirectoryClient, DirectoryService, RemoteGroup, RemoteMember};
pub use error::{Error, Result};
pub use reconcile::{ReconcileError, ReconcileSummary, Reconciler};
pub use secrets::{SecretError, SecretManagerClient, SecretStore};
pub use settings::{GroupSettings, GroupsSettingsClient, SettingsService};
