use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::response::GraphqlErrorDetail;
use crate::session::SessionError;

/// Errors returned by storefront client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request build error: {0}")]
    BuildError(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: status={status}")]
    Http { status: StatusCode, body: Bytes },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The API answered with a non-empty `errors` list. Displays as the
    /// first error's message only. `headers` holds the `Set-Cookie` to relay
    /// when the same response issued a new auth token.
    #[error("{message}")]
    Graphql {
        message: String,
        errors: Vec<GraphqlErrorDetail>,
        headers: HeaderMap,
    },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl ClientError {
    /// The remote error list, when this is an application-level failure.
    #[must_use]
    pub fn graphql_errors(&self) -> Option<&[GraphqlErrorDetail]> {
        match self {
            ClientError::Graphql { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Headers the calling layer must still relay although the call failed.
    #[must_use]
    pub fn relay_headers(&self) -> Option<&HeaderMap> {
        match self {
            ClientError::Graphql { headers, .. } if !headers.is_empty() => Some(headers),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<figment::Error> for ClientError {
    fn from(err: figment::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}
