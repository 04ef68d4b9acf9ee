use std::fmt;

use thiserror::Error;

use apidrive_schema::ModelError;
use apidrive_spec::SpecError;

use crate::transport::TransportError;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum Error {
    /// The document failed to load.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// A parameter, request body or response body failed validation.
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    UnexpectedResponse(#[from] UnexpectedResponseError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller passed arguments the operation cannot accept.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// A response body could not be decoded as its declared media type.
    #[error("invalid response body from {operation_id}: {reason}")]
    InvalidResponseBody {
        operation_id: String,
        reason: String,
    },
}

/// A response status the operation does not declare, with no `default`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct UnexpectedResponseError {
    pub status_code: u16,
    pub operation_id: String,
    /// Declared status keys in declaration order, `default` excluded.
    pub expected_codes: Vec<String>,
    pub default_defined: bool,
}

impl fmt::Display for UnexpectedResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected response {} from {} (expected one of {}, {})",
            self.status_code,
            self.operation_id,
            self.expected_codes.join(", "),
            if self.default_defined {
                "default is defined"
            } else {
                "no default is defined"
            }
        )
    }
}

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("unknown security scheme '{0}'")]
    UnknownScheme(String),

    /// None of the operation's security alternatives has credentials.
    #[error("no credentials for {operation_id}; authenticate one of: {}", .alternatives.join(" | "))]
    NoCredentials {
        operation_id: String,
        alternatives: Vec<String>,
    },

    #[error("security scheme '{scheme}' expects {expected} credentials")]
    CredentialMismatch { scheme: String, expected: String },

    #[error("security scheme '{scheme}' of type {kind} is not supported")]
    Unsupported { scheme: String, kind: String },
}
