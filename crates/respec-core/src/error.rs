use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by typed access into the generic document tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document error: {0}")]
    Node(#[from] NodeError),

    #[error("unable to detect the document format")]
    UnknownFormat,

    #[error("no declared path matches {path} (declared: {})", .templates.join(", "))]
    PathNotFound {
        path: String,
        templates: Vec<String>,
    },

    #[error("invalid path template {template}: {reason}")]
    InvalidPathTemplate { template: String, reason: String },

    #[error("method {method} is not allowed on {path} (allowed: {})", .allowed.join(", "))]
    MethodNotAllowed {
        path: String,
        method: String,
        allowed: Vec<String>,
    },

    #[error("no response schema for {method} {status}{}", declared_suffix(.declared))]
    ResponseSchemaMissing {
        method: String,
        status: u16,
        declared: bool,
    },

    #[error("invalid schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("unresolved reference: {name}")]
    UnresolvedReference { name: String },
}

fn declared_suffix(declared: &bool) -> &'static str {
    if *declared {
        " (declared without content)"
    } else {
        ""
    }
}

impl SpecError {
    pub(crate) fn invalid_schema(reason: impl Into<String>) -> Self {
        SpecError::InvalidSchema {
            reason: reason.into(),
        }
    }
}
