//! Remote Snapshot Store Abstraction
//!
//! A single versioned JSON document addressed by owner/repo coordinates.
//! Every revision carries an opaque version token (a content hash on
//! GitHub) used as an optimistic-concurrency precondition on upload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BridgeError;

/// Path used when the user does not configure one.
pub const DEFAULT_SNAPSHOT_PATH: &str = "tunesync/sync_data.json";

/// Where the remote snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCoordinates {
    pub owner: String,
    pub repo: String,
    pub path: String,
    /// Branch to read and write; the repository default when `None`.
    pub branch: Option<String>,
}

impl RemoteCoordinates {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: DEFAULT_SNAPSHOT_PATH.to_string(),
            branch: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Coordinates are usable only when owner, repo and path are all non-blank.
    pub fn is_complete(&self) -> bool {
        !self.owner.trim().is_empty()
            && !self.repo.trim().is_empty()
            && !self.path.trim().is_empty()
    }
}

impl std::fmt::Display for RemoteCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.owner, self.repo, self.path)?;
        if let Some(branch) = &self.branch {
            write!(f, "@{}", branch)?;
        }
        Ok(())
    }
}

/// One fetched revision of the remote document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    /// Raw document text, possibly empty.
    pub content: String,
    pub version_token: String,
}

#[derive(Error, Debug)]
pub enum RemoteStoreError {
    #[error("Remote snapshot not found")]
    NotFound,

    #[error("Remote credential rejected: {0}")]
    CredentialExpired(String),

    #[error("Remote snapshot changed since it was fetched (expected {expected:?})")]
    VersionConflict { expected: Option<String> },

    #[error("Remote transport error: {0}")]
    Transport(String),

    #[error("Unexpected response from remote store: {0}")]
    InvalidResponse(String),
}

impl From<BridgeError> for RemoteStoreError {
    fn from(error: BridgeError) -> Self {
        RemoteStoreError::Transport(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RemoteStoreError>;

/// Versioned blob store holding the cross-device snapshot.
///
/// Implementations must keep the three failure classes apart: a missing
/// document is [`RemoteStoreError::NotFound`], a rejected credential is
/// [`RemoteStoreError::CredentialExpired`], and everything else is a
/// transport or response error. The orchestrator reacts differently to each.
#[async_trait]
pub trait RemoteSnapshotStore: Send + Sync {
    /// Fetch the current revision.
    async fn fetch(&self, credential: &str, coordinates: &RemoteCoordinates)
        -> Result<RemoteSnapshot>;

    /// Write `content` and return the new version token.
    ///
    /// `expected_version` of `None` creates the document unconditionally.
    /// Otherwise the write is rejected with
    /// [`RemoteStoreError::VersionConflict`] when the remote moved on.
    async fn upload(
        &self,
        credential: &str,
        coordinates: &RemoteCoordinates,
        content: &str,
        expected_version: Option<&str>,
    ) -> Result<String>;
}
