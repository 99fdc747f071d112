//! Top-level error type for a run.

use groups_config::ConfigError;
use thiserror::Error;

use crate::api::RemoteError;
use crate::auth::AuthError;
use crate::config::RunConfigError;
use crate::reconcile::ReconcileError;
use crate::secrets::SecretError;

/// Any error that ends a run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    RunConfig(#[from] RunConfigError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unable to access secret-version: {0}")]
    Secret(#[from] SecretError),

    #[error("unable to authenticate: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("unable to render groups: {0}")]
    Render(#[from] serde_yaml::Error),
}

/// Result type for a run
pub type Result<T> = std::result::Result<T, Error>;
