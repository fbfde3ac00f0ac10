use std::{collections::BTreeMap, sync::Arc};

use api_types::ErrorResponse;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the client.
///
/// The type is `Clone` so that a single outcome of a deduplicated operation
/// (a shared fetch, a credential refresh) can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("token storage error: {0}")]
    Storage(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("operation ended without a result")]
    Interrupted,
}

/// Coarse classification used by callers deciding how to present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Auth,
    Validation,
    NotFound,
    Server,
}

impl ClientError {
    pub(crate) fn from_status(status: StatusCode, body: ErrorResponse) -> Self {
        let ErrorResponse { error, fields } = body;
        match status.as_u16() {
            401 => Self::Unauthorized(error),
            403 => Self::Forbidden(error),
            404 => Self::NotFound(error),
            409 => Self::Conflict(error),
            400 | 422 => Self::Validation {
                message: error,
                fields,
            },
            code => Self::Server {
                status: code,
                message: error,
            },
        }
    }

    /// Local payload validation failure for a single field.
    pub(crate) fn invalid_field(field: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), message.to_string());
        Self::Validation {
            message: format!("{field}: {message}"),
            fields,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Interrupted => ErrorKind::Transport,
            Self::Unauthorized(_) | Self::Forbidden(_) => ErrorKind::Auth,
            Self::Validation { .. } | Self::Conflict(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Server { .. } | Self::Decode(_) | Self::Storage(_) | Self::Config(_) => {
                ErrorKind::Server
            }
        }
    }

    /// `true` for an expired or invalid credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(Arc::new(value))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
