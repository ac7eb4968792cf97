//! Error types for filetree-walker
//!
//! Two families of errors live here:
//! - Fatal errors (`TreeError`) abort a tree generation call and no tree is
//!   returned (except the partial tree carried by a timeout).
//! - Advisory issues (`WalkIssue`) are scoped to one entry or subtree. They
//!   are collected during the walk, logged, and returned with the result.

use crate::tree::FileTreeResult;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for tree generation
#[derive(Error, Debug)]
pub enum TreeError {
    /// The root could not be turned into an absolute path
    #[error("Failed to resolve path '{path}': {reason}")]
    PathResolution { path: String, reason: String },

    /// The root does not exist
    #[error("Path not found: '{path}'")]
    NotFound { path: String },

    /// The root exists but is not a directory
    #[error("Not a directory: '{path}'")]
    NotADirectory { path: String },

    /// The root exists but its own listing failed
    #[error("Failed to read root directory '{path}': {reason}")]
    RootUnreadable { path: String, reason: String },

    /// The walk exceeded its deadline; `partial` holds what was committed
    #[error("Walk timed out after {:.1}s", elapsed.as_secs_f64())]
    WalkTimeout {
        elapsed: Duration,
        partial: Box<FileTreeResult>,
    },

    /// Interrupted by signal
    #[error("Walk interrupted by signal")]
    Interrupted,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TreeError {
    /// Check if this error was raised while validating the root
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TreeError::PathResolution { .. }
                | TreeError::NotFound { .. }
                | TreeError::NotADirectory { .. }
                | TreeError::RootUnreadable { .. }
        )
    }
}

/// A non-fatal problem scoped to a single entry or subtree
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WalkIssue {
    /// A directory could not be listed; its subtree is missing
    #[error("Failed to read directory '{path}': {reason}")]
    ReadDir { path: String, reason: String },

    /// An entry's metadata could not be read; the entry is missing
    #[error("Failed to stat '{path}': {reason}")]
    Stat { path: String, reason: String },
}

impl WalkIssue {
    /// Returns the path associated with this issue
    pub fn path(&self) -> &str {
        match self {
            WalkIssue::ReadDir { path, .. } => path,
            WalkIssue::Stat { path, .. } => path,
        }
    }

    /// Returns true if this issue is a failed directory listing
    pub fn is_read_dir(&self) -> bool {
        matches!(self, WalkIssue::ReadDir { .. })
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid timeout
    #[error("Invalid timeout {secs}s: must be greater than zero")]
    InvalidTimeout { secs: u64 },

    /// Missing tree token
    #[error("A path token is required")]
    MissingToken,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker thread could not be spawned
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },
}

/// HTTP server errors
#[cfg(feature = "server")]
#[derive(Error, Debug)]
pub enum ServerError {
    /// Tree generation failed
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// I/O error (bind, accept)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed request parameter
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Blocking walk task failed to complete
    #[error("Walk task failed: {0}")]
    Task(String),
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        use crate::server::response::ApiResponse;
        use axum::http::StatusCode;
        use axum::Json;

        let status = match &self {
            ServerError::Tree(TreeError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServerError::Tree(TreeError::NotADirectory { .. })
            | ServerError::Tree(TreeError::PathResolution { .. }) => StatusCode::BAD_REQUEST,
            ServerError::Tree(TreeError::RootUnreadable { .. }) => StatusCode::FORBIDDEN,
            ServerError::Tree(TreeError::WalkTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

/// Result type alias for ServerError
#[cfg(feature = "server")]
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Result type alias for TreeError
pub type Result<T> = std::result::Result<T, TreeError>;
