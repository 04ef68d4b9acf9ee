use thiserror::Error;

use crate::document::LoaderError;

/// Errors produced while loading an OpenAPI document.
///
/// All of these are fatal: a document that fails to load never yields a
/// registry, so no operation can be called against it.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The root is not an OpenAPI 3.x document (missing or foreign `openapi` field).
    #[error("not a valid OpenAPI 3.x document")]
    UnknownFormat,

    /// YAML/JSON decoding failed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A `$ref` points at something that does not exist.
    #[error("unresolved $ref '{pointer}' (referenced from {referrer})")]
    ReferenceResolution { pointer: String, referrer: String },

    /// The document is structurally malformed.
    #[error("invalid document: {0}")]
    Validation(String),

    /// An external document could not be fetched.
    #[error("failed to load external document '{uri}': {source}")]
    Loader {
        uri: String,
        #[source]
        source: LoaderError,
    },

    /// I/O error reading the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpecError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SpecError::Validation(message.into())
    }
}
