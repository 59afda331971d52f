//! Error types for the GitHub provider

use bridge_traits::snapshot::RemoteStoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubError {
    /// Token missing, revoked or expired (HTTP 401)
    #[error("GitHub rejected the token: {0}")]
    Unauthorized(String),

    /// File, repository or branch does not exist (HTTP 404)
    #[error("Not found on GitHub: {path}")]
    NotFound { path: String },

    /// SHA precondition failed (HTTP 409 or 422)
    #[error("GitHub rejected the write (status {status_code}): {message}")]
    Conflict { status_code: u16, message: String },

    /// Any other non-success status
    #[error("GitHub API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Failed to parse GitHub response: {0}")]
    ParseError(String),

    /// File content could not be decoded to UTF-8 text
    #[error("Failed to decode file content: {0}")]
    DecodeError(String),

    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

impl From<GitHubError> for RemoteStoreError {
    fn from(error: GitHubError) -> Self {
        match error {
            GitHubError::Unauthorized(msg) => RemoteStoreError::CredentialExpired(msg),
            GitHubError::NotFound { .. } => RemoteStoreError::NotFound,
            GitHubError::Conflict { .. } => RemoteStoreError::VersionConflict { expected: None },
            GitHubError::ApiError {
                status_code,
                message,
            } => RemoteStoreError::Transport(format!("status {}: {}", status_code, message)),
            GitHubError::ParseError(msg) | GitHubError::DecodeError(msg) => {
                RemoteStoreError::InvalidResponse(msg)
            }
            GitHubError::BridgeError(e) => RemoteStoreError::Transport(e.to_string()),
        }
    }
}
