use std::path::PathBuf;

/// Alias for `Result<T, GraphError>`.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur when loading or validating dialogue nodes.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No node with the requested id exists in the store.
    #[error("dialogue node not found: \"{0}\"")]
    NotFound(String),

    /// The node exists but failed validation.
    #[error("invalid dialogue node \"{node}\": {reason}")]
    Validation {
        /// Id of the offending node.
        node: String,
        /// Why validation failed.
        reason: String,
    },

    /// A node with the same id was already inserted.
    #[error("duplicate dialogue node id: \"{0}\"")]
    DuplicateNode(String),

    /// A node definition file or directory could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A node definition could not be parsed.
    #[error("cannot parse {source_name}: {source}")]
    Parse {
        /// File name or other label for the parsed input.
        source_name: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

impl GraphError {
    /// Build a validation error for the given node.
    pub fn validation(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            node: node.into(),
            reason: reason.into(),
        }
    }
}
