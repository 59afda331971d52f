//! Atomic JSON file persistence shared by every local store.

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};

/// One JSON document on disk.
///
/// Writes go to a sibling temp file which is fsynced and then renamed over
/// the target, so a crash leaves either the old or the new document. A
/// missing file reads as `T::default()`.
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub async fn load(&self) -> Result<T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %self.display_name(), "Store file missing, using empty state");
                return Ok(T::default());
            }
            Err(e) => return Err(LibraryError::io(&self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        serde_json::from_slice(&bytes).map_err(|source| {
            warn!(file = %self.display_name(), error = %source, "Store file is not valid JSON");
            LibraryError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })
    }

    pub async fn save(&self, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LibraryError::io(parent, e))?;
        }

        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| LibraryError::io(&temp, e))?;
        file.write_all(&json)
            .await
            .map_err(|e| LibraryError::io(&temp, e))?;
        file.sync_all()
            .await
            .map_err(|e| LibraryError::io(&temp, e))?;
        drop(file);

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| LibraryError::io(&self.path, e))?;

        debug!(file = %self.display_name(), bytes = json.len(), "Store file written");
        Ok(())
    }

    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
