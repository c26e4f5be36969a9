//! File-based artifact storage with atomic writes.
//!
//! Artifacts live flat under one directory, named `<ticket_form_id>.svg`.
//! Uses temp file + rename so the static file server never sees a torn write.

use crate::TicketgateError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Where rendered artifacts are kept.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `file_name`, overwriting any previous artifact.
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<(), TicketgateError>;
}

/// Directory-backed [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for an artifact file name.
    ///
    /// Only a bare file name is accepted; anything with a path separator
    /// or a leading dot is refused.
    fn artifact_path(&self, file_name: &str) -> Result<PathBuf, TicketgateError> {
        if file_name.is_empty()
            || file_name.starts_with('.')
            || file_name.contains('/')
            || file_name.contains('\\')
        {
            return Err(TicketgateError::ArtifactIO(format!(
                "refusing artifact name {file_name:?}"
            )));
        }
        Ok(self.dir.join(file_name))
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<(), TicketgateError> {
        let target_path = self.artifact_path(file_name)?;
        let temp_path = self.dir.join(format!(".{}.tmp", file_name));

        fs::create_dir_all(&self.dir).await.map_err(|e| {
            TicketgateError::ArtifactIO(format!("Failed to create artifact dir: {}", e))
        })?;

        fs::write(&temp_path, bytes)
            .await
            .map_err(|e| TicketgateError::ArtifactIO(format!("Failed to write temp file: {}", e)))?;

        fs::rename(&temp_path, &target_path).await.map_err(|e| {
            TicketgateError::ArtifactIO(format!("Failed to rename artifact file: {}", e))
        })?;

        Ok(())
    }
}
