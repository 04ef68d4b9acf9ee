//! The decoded document tree and the external-document collaborator.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::error::SpecError;

/// A decoded OpenAPI document. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    base_uri: Option<String>,
}

impl Document {
    /// Wrap an already-decoded tree.
    pub fn new(root: Value) -> Self {
        Self {
            root,
            base_uri: None,
        }
    }

    /// Set the URI or path that relative external `$ref`s are joined against.
    pub fn with_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = Some(uri.into());
        self
    }

    /// Decode YAML (JSON is accepted too, being valid YAML).
    pub fn from_yaml_str(input: &str) -> Result<Self, SpecError> {
        let root: Value =
            serde_yaml::from_str(input).map_err(|e| SpecError::Parse(e.to_string()))?;
        Ok(Self::new(root))
    }

    /// Decode strict JSON.
    pub fn from_json_str(input: &str) -> Result<Self, SpecError> {
        let root: Value =
            serde_json::from_str(input).map_err(|e| SpecError::Parse(e.to_string()))?;
        Ok(Self::new(root))
    }

    /// Read and decode a file; its path becomes the base URI.
    pub fn from_path(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path)?;
        let document = Self::from_yaml_str(&content)?;
        Ok(document.with_base_uri(path.to_string_lossy()))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }
}

/// Errors from a [`DocumentLoader`].
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported URI scheme: {0}")]
    Unsupported(String),
}

/// Fetches external documents named by `$ref`s.
///
/// Called at most once per URI during load.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, uri: &str) -> Result<Value, LoaderError>;
}

/// Loads external documents from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn load(&self, uri: &str) -> Result<Value, LoaderError> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        if path.contains("://") {
            return Err(LoaderError::Unsupported(uri.to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| LoaderError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn yaml_and_json_decode_to_the_same_tree() {
        let yaml = Document::from_yaml_str("openapi: 3.0.0\ninfo:\n  title: T\n").unwrap();
        let json = Document::from_json_str(r#"{"openapi":"3.0.0","info":{"title":"T"}}"#).unwrap();
        assert_eq!(yaml.root()["info"], json.root()["info"]);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            Document::from_json_str("{not json"),
            Err(SpecError::Parse(_))
        ));
    }

    #[test]
    fn from_path_records_base_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "openapi: 3.1.0").unwrap();
        let doc = Document::from_path(file.path()).unwrap();
        assert_eq!(doc.base_uri(), Some(file.path().to_string_lossy().as_ref()));
    }

    #[test]
    fn fs_loader_rejects_remote_uris() {
        let result = FsLoader.load("https://example.com/pet.yaml");
        assert!(matches!(result, Err(LoaderError::Unsupported(_))));
    }
}
