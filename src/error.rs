use thiserror::Error;

/// Every way a layer fetch can fail. Nothing is retried; each variant ends the
/// invocation.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid {name}:{value}")]
    InvalidArgument { name: &'static str, value: String },

    #[error("Unable to read {path}: {cause:#}")]
    PermissionOrNotFound { path: String, cause: anyhow::Error },

    #[error("Collection not found {path}: {cause:#}")]
    NotFound { path: String, cause: anyhow::Error },

    #[error("Unable to parse collection {path}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("No items found")]
    NoItemsFound,

    #[error("No relative path found: {0}")]
    UnsupportedPath(String),

    #[error("Not a valid object path: {0}")]
    InvalidPath(String),

    #[error("Failed to transfer {source_path} to {target}: {cause:#}")]
    Transfer {
        source_path: String,
        target: String,
        cause: anyhow::Error,
    },
}
