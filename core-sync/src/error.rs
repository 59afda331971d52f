use bridge_traits::{BridgeError, RemoteStoreError};
use core_auth::AuthError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync is not configured: {0}")]
    NotConfigured(String),

    #[error("Sync credential expired or was rejected: {0}")]
    CredentialExpired(String),

    #[error("Remote store unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("Remote snapshot is corrupt: {reason}")]
    RemoteContentCorrupt { reason: String },

    #[error("Remote snapshot changed during sync, please retry")]
    VersionConflict,

    #[error("Upload failed: {0}")]
    UploadFailure(String),

    #[error("Local store error: {0}")]
    LocalStore(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    /// Whether re-triggering the sync later can succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnreachable(_)
                | SyncError::RemoteContentCorrupt { .. }
                | SyncError::VersionConflict
                | SyncError::UploadFailure(_)
                | SyncError::LocalStore(_)
        )
    }

    /// Stable tag used in events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::NotConfigured(_) => "not_configured",
            SyncError::CredentialExpired(_) => "credential_expired",
            SyncError::RemoteUnreachable(_) => "remote_unreachable",
            SyncError::RemoteContentCorrupt { .. } => "remote_content_corrupt",
            SyncError::VersionConflict => "version_conflict",
            SyncError::UploadFailure(_) => "upload_failure",
            SyncError::LocalStore(_) => "local_store",
            SyncError::Serialization(_) => "serialization",
        }
    }

    /// Map a fetch failure. Not-found is handled by the caller before this.
    pub(crate) fn from_fetch(error: RemoteStoreError) -> Self {
        match error {
            RemoteStoreError::CredentialExpired(msg) => SyncError::CredentialExpired(msg),
            RemoteStoreError::NotFound => {
                SyncError::RemoteUnreachable("remote snapshot not found".to_string())
            }
            RemoteStoreError::VersionConflict { .. } => SyncError::VersionConflict,
            RemoteStoreError::Transport(msg) | RemoteStoreError::InvalidResponse(msg) => {
                SyncError::RemoteUnreachable(msg)
            }
        }
    }

    pub(crate) fn from_upload(error: RemoteStoreError) -> Self {
        match error {
            RemoteStoreError::CredentialExpired(msg) => SyncError::CredentialExpired(msg),
            RemoteStoreError::VersionConflict { .. } => SyncError::VersionConflict,
            other => SyncError::UploadFailure(other.to_string()),
        }
    }
}

impl From<LibraryError> for SyncError {
    fn from(error: LibraryError) -> Self {
        SyncError::LocalStore(error.to_string())
    }
}

impl From<AuthError> for SyncError {
    fn from(error: AuthError) -> Self {
        SyncError::LocalStore(error.to_string())
    }
}

impl From<BridgeError> for SyncError {
    fn from(error: BridgeError) -> Self {
        SyncError::LocalStore(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
