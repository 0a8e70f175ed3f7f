//! On-disk record of the active version.

use crate::migration::{ActiveVersionStore, BoxError};
use crate::utils::now_iso;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Contents of the state file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateFile {
    /// Normalized label of the active version, `None` when unset
    pub active_version: Option<String>,

    /// When the state was last written
    #[serde(default)]
    pub updated_at: String,
}

/// Global mutex for state file writes
static STATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_lock() -> &'static Mutex<()> {
    STATE_LOCK.get_or_init(|| Mutex::new(()))
}

/// Read the state file. A missing file means no state yet.
pub async fn read_state(path: &Path) -> Result<Option<StateFile>, StateError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let state: StateFile = serde_json::from_str(&content)?;
    Ok(Some(state))
}

/// Write the state file with locking and atomic write
pub async fn write_state(path: &Path, state: &StateFile) -> Result<(), StateError> {
    let _guard = get_lock().lock().await;

    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    // Write atomically using temp file + rename
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(state)?;
    fs::write(&temp_path, &content).await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}

/// [`ActiveVersionStore`] backed by a JSON state file.
///
/// The file is read on every `get`, so edits made by other tools between
/// runs are picked up. The context is not used.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl<C: Sync> ActiveVersionStore<C> for FileStore {
    async fn get(&self, _ctx: &C) -> Result<Option<String>, BoxError> {
        let state = read_state(&self.path).await?;
        Ok(state.and_then(|s| s.active_version))
    }

    async fn set(&self, version: Option<&str>, _ctx: &C) -> Result<Option<String>, BoxError> {
        let state = StateFile {
            active_version: version.map(str::to_string),
            updated_at: now_iso(),
        };
        write_state(&self.path, &state).await?;
        Ok(state.active_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = read_state(&temp_dir.path().join("state.json")).await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("state.json");
        let state = StateFile {
            active_version: Some("1.2.0".to_string()),
            updated_at: now_iso(),
        };

        write_state(&path, &state).await.unwrap();

        assert_eq!(read_state(&path).await.unwrap(), Some(state));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_state_file_is_camel_case() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("state.json");
        ActiveVersionStore::<()>::set(&FileStore::new(&path), Some("2.0.0"), &())
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"activeVersion\": \"2.0.0\""));
        assert!(raw.contains("\"updatedAt\""));
    }

    #[tokio::test]
    async fn test_corrupt_state_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_state(&path).await,
            Err(StateError::JsonError(_))
        ));
    }
}
