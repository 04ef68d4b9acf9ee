use thiserror::Error;

/// A value failed validation against a model type.
///
/// `path` locates the failing value inside the validated document
/// (`pet.tags[2]`); it is empty for the top-level value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Schema {type_name} got unexpected attribute keys {{{}}}{}", .keys.join(", "), at(.path))]
    UnexpectedKeys {
        type_name: String,
        keys: Vec<String>,
        path: String,
    },

    #[error("Schema {type_name} missing required attribute keys {{{}}}{}", .keys.join(", "), at(.path))]
    MissingKeys {
        type_name: String,
        keys: Vec<String>,
        path: String,
    },

    #[error("Schema {type_name} expected {expected} but got {actual}{}", at(.path))]
    TypeMismatch {
        type_name: String,
        expected: String,
        actual: String,
        path: String,
    },

    #[error("Schema {type_name} value {value} is not one of {{{}}}{}", .allowed.join(", "), at(.path))]
    NotInEnum {
        type_name: String,
        value: String,
        allowed: Vec<String>,
        path: String,
    },

    #[error("Schema {type_name} matched none of its alternatives: {}{}", join_failures(.failures), at(.path))]
    NoMatchingAlternative {
        type_name: String,
        failures: Vec<ModelError>,
        path: String,
    },
}

impl ModelError {
    /// Name of the model type that rejected the value.
    pub fn type_name(&self) -> &str {
        match self {
            ModelError::UnexpectedKeys { type_name, .. }
            | ModelError::MissingKeys { type_name, .. }
            | ModelError::TypeMismatch { type_name, .. }
            | ModelError::NotInEnum { type_name, .. }
            | ModelError::NoMatchingAlternative { type_name, .. } => type_name,
        }
    }

    /// Location of the failing value.
    pub fn path(&self) -> &str {
        match self {
            ModelError::UnexpectedKeys { path, .. }
            | ModelError::MissingKeys { path, .. }
            | ModelError::TypeMismatch { path, .. }
            | ModelError::NotInEnum { path, .. }
            | ModelError::NoMatchingAlternative { path, .. } => path,
        }
    }
}

fn at(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" (at {})", path)
    }
}

fn join_failures(failures: &[ModelError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
