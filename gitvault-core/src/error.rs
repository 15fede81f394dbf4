use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Repository initialization failed at {path}: {reason}")]
    RepositoryInit { path: String, reason: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Commit failed for {path}: {reason}")]
    Commit { path: String, reason: String },

    #[error("Content not found: {path} at {commit}")]
    ContentNotFound { path: String, commit: String },

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Provider API error: {0}")]
    ProviderApi(String),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("git {command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the error means the requested content or commit does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ContentNotFound { .. } | Error::CommitNotFound(_))
    }
}
