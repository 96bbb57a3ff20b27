use std::path::PathBuf;

/// Central error type for the zoek system.
#[derive(Debug, thiserror::Error)]
pub enum ZoekError {
    #[error("catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    #[error("catalog parse error on line {line}: {message}")]
    CatalogParse { line: usize, message: String },

    #[error("clone of {name} failed: {message}")]
    CloneFailed { name: String, message: String },

    #[error("pull of {name} failed: {message}")]
    PullFailed { name: String, message: String },

    #[error("indexing of {name} failed: {message}")]
    IndexFailed { name: String, message: String },

    #[error("{command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("cancelled: {message}")]
    Cancelled { message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("credential error: {message}")]
    Credential { message: String },

    #[error("path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}
