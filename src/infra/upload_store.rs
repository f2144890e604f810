use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::domain::ports::UploadStore;
use crate::error::AppError;

/// Keeps uploads on disk as `{root}/{event_id}/original.xlsx`.
pub struct LocalUploadStore {
    root: PathBuf,
}

impl LocalUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn event_dir(&self, event_id: &str) -> PathBuf {
        self.root.join(event_id)
    }

    fn original_path(&self, event_id: &str) -> PathBuf {
        self.event_dir(event_id).join("original.xlsx")
    }
}

fn io_error(context: &str, e: std::io::Error) -> AppError {
    error!("{}: {}", context, e);
    AppError::InternalWithMsg(format!("{}: {}", context, e))
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn save_original(&self, event_id: &str, content: &[u8]) -> Result<(), AppError> {
        tokio::fs::create_dir_all(self.event_dir(event_id))
            .await
            .map_err(|e| io_error("failed to create upload directory", e))?;
        tokio::fs::write(self.original_path(event_id), content)
            .await
            .map_err(|e| io_error("failed to store upload", e))?;
        debug!(event_id, bytes = content.len(), "original upload stored");
        Ok(())
    }

    async fn load_original(&self, event_id: &str) -> Result<Option<Vec<u8>>, AppError> {
        match tokio::fs::read(self.original_path(event_id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("failed to read upload", e)),
        }
    }

    async fn remove(&self, event_id: &str) -> Result<(), AppError> {
        match tokio::fs::remove_dir_all(self.event_dir(event_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("failed to remove uploads", e)),
        }
    }
}
