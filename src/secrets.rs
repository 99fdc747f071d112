//! Secret Manager access for the service account key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::info;

use crate::api::{ApiClient, Call, RemoteError};

/// Base URL of the Secret Manager API.
pub const SECRET_MANAGER_API_BASE: &str = "https://secretmanager.googleapis.com/v1";

/// Secret access errors
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret-version must not be empty")]
    MissingVersion,

    #[error(
        "secret-version {0:?} must be of the form \
         projects/{{project}}/secrets/{{secret}}/versions/{{version}}"
    )]
    InvalidVersion(String),

    #[error("failed to access secret version: {0}")]
    Remote(#[from] RemoteError),

    #[error("secret version {0} not found")]
    NotFound(String),

    #[error("secret payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Resolves versioned secrets to their payload.
pub trait SecretStore {
    /// `version` is `projects/{project}/secrets/{secret}/versions/{version}`.
    fn access_secret_version(&self, version: &str) -> Result<Vec<u8>, SecretError>;
}

/// Check the shape of a fully-qualified secret version name.
pub fn validate_version_name(version: &str) -> Result<(), SecretError> {
    if version.is_empty() {
        return Err(SecretError::MissingVersion);
    }
    let parts: Vec<&str> = version.split('/').collect();
    let well_formed = parts.len() == 6
        && parts[0] == "projects"
        && parts[2] == "secrets"
        && parts[4] == "versions"
        && parts.iter().all(|p| !p.is_empty());
    if !well_formed {
        return Err(SecretError::InvalidVersion(version.to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    data: String,
}

fn decode_payload(response: AccessResponse, version: &str) -> Result<Vec<u8>, SecretError> {
    let payload = response
        .payload
        .ok_or_else(|| SecretError::NotFound(version.to_string()))?;
    Ok(STANDARD.decode(payload.data.as_bytes())?)
}

/// Secret Manager REST client.
pub struct SecretManagerClient {
    api: ApiClient,
    base_url: String,
}

impl SecretManagerClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            base_url: SECRET_MANAGER_API_BASE.to_string(),
        }
    }
}

impl SecretStore for SecretManagerClient {
    fn access_secret_version(&self, version: &str) -> Result<Vec<u8>, SecretError> {
        validate_version_name(version)?;
        info!(secret_version = version, "accessing secret version");

        // `{name}:access` keeps the slashes of the resource name.
        let url = ApiClient::url(&format!("{}/{}:access", self.base_url, version), &[])?;
        let response: AccessResponse = self
            .api
            .get(Call::new("access secret", version), url, &[])?
            .ok_or_else(|| SecretError::NotFound(version.to_string()))?;
        decode_payload(response, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_version_name() {
        assert!(validate_version_name("projects/p/secrets/s/versions/latest").is_ok());
        assert!(matches!(validate_version_name(""), Err(SecretError::MissingVersion)));
        assert!(matches!(
            validate_version_name("projects/p/secrets/s"),
            Err(SecretError::InvalidVersion(_))
        ));
        assert!(matches!(
            validate_version_name("projects//secrets/s/versions/1"),
            Err(SecretError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_decode_payload() {
        let response: AccessResponse = serde_json::from_str(
            r#"{
                "name": "projects/p/secrets/s/versions/1",
                "payload": {"data": "eyJhIjogMX0=", "dataCrc32c": "1"}
            }"#,
        )
        .unwrap();
        let bytes = decode_payload(response, "projects/p/secrets/s/versions/1").unwrap();
        assert_eq!(bytes, br#"{"a": 1}"#);
    }

    #[test]
    fn test_decode_missing_payload() {
        let response: AccessResponse = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(matches!(decode_payload(response, "x"), Err(SecretError::NotFound(_))));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let response: AccessResponse =
            serde_json::from_str(r#"{"payload": {"data": "!!!"}}"#).unwrap();
        assert!(matches!(decode_payload(response, "x"), Err(SecretError::Decode(_))));
    }
}
