//! Authenticated JSON client shared by the Google API clients.
//!
//! Every call carries an operation name and a target (group or member
//! address) so failures can be reported without further wrapping.

use std::sync::Arc;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{AuthError, TokenSource};

/// Failure of a remote API call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{operation} {target}: HTTP {status}: {message}")]
    Status {
        operation: String,
        target: String,
        status: u16,
        message: String,
    },

    #[error("{operation} {target}: {source}")]
    Transport {
        operation: String,
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} {target}: {message}")]
    InvalidResponse {
        operation: String,
        target: String,
        message: String,
    },

    #[error("{operation} {target}: {source}")]
    Auth {
        operation: String,
        target: String,
        #[source]
        source: AuthError,
    },

    #[error("invalid API url {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    /// A failure reported by the remote side, as produced by test doubles.
    pub fn status(operation: &str, target: &str, status: u16, message: impl Into<String>) -> Self {
        RemoteError::Status {
            operation: operation.to_string(),
            target: target.to_string(),
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the failed call, if the server answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(404)
    }
}

/// Google JSON error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Extract a readable message from an error response body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().to_string(),
    }
}

/// Identifies a call in errors and logs.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub operation: &'a str,
    pub target: &'a str,
}

impl<'a> Call<'a> {
    pub fn new(operation: &'a str, target: &'a str) -> Self {
        Self { operation, target }
    }

    fn transport(&self, source: reqwest::Error) -> RemoteError {
        RemoteError::Transport {
            operation: self.operation.to_string(),
            target: self.target.to_string(),
            source,
        }
    }

    fn invalid(&self, message: impl Into<String>) -> RemoteError {
        RemoteError::InvalidResponse {
            operation: self.operation.to_string(),
            target: self.target.to_string(),
            message: message.into(),
        }
    }
}

/// Blocking JSON client that injects bearer tokens.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .build()
            .map_err(|source| Call::new("create", "http client").transport(source))?;
        Ok(Self { http, tokens })
    }

    /// Build `base` followed by the given path segments, each percent-encoded.
    pub fn url(base: &str, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = Url::parse(base).map_err(|_| RemoteError::InvalidUrl(base.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a JSON document. `None` when the resource does not exist.
    pub fn get<T: DeserializeOwned>(
        &self,
        call: Call<'_>,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, RemoteError> {
        let request = self.http.get(url).query(query);
        match self.execute(call, request)? {
            Some(response) => Self::decode(call, response).map(Some),
            None => Ok(None),
        }
    }

    /// Send a JSON body. `None` when the resource does not exist.
    pub fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        call: Call<'_>,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<Option<T>, RemoteError> {
        let request = self.http.request(method, url).json(body);
        match self.execute(call, request)? {
            Some(response) => Self::decode(call, response).map(Some),
            None => Ok(None),
        }
    }

    /// DELETE a resource. A missing resource is an error.
    pub fn delete(&self, call: Call<'_>, url: Url) -> Result<(), RemoteError> {
        match self.execute(call, self.http.delete(url))? {
            Some(_) => Ok(()),
            None => Err(RemoteError::status(call.operation, call.target, 404, "not found")),
        }
    }

    fn execute(
        &self,
        call: Call<'_>,
        request: RequestBuilder,
    ) -> Result<Option<Response>, RemoteError> {
        let token = self.tokens.access_token().map_err(|source| RemoteError::Auth {
            operation: call.operation.to_string(),
            target: call.target.to_string(),
            source,
        })?;

        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|e| call.transport(e))?;
        let status = response.status();
        debug!(
            operation = call.operation,
            target = call.target,
            status = status.as_u16(),
            "api call"
        );

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::status(
                call.operation,
                call.target,
                status.as_u16(),
                error_message(&body),
            ));
        }
        Ok(Some(response))
    }

    fn decode<T: DeserializeOwned>(call: Call<'_>, response: Response) -> Result<T, RemoteError> {
        let body = response.text().map_err(|e| call.transport(e))?;
        // Empty bodies decode as JSON null so `()` and `Option<_>` work.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body)
            .map_err(|e| call.invalid(format!("invalid JSON response: {}", e)))
    }
}
