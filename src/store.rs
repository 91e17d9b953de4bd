use crate::errors::StoreError;
use crate::models::Todo;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};

/// Whole-file access to the todo collection. Every load reads the file fresh and
/// every save overwrites it in place; there is no cache and no atomic rename.
#[derive(Debug, Clone)]
pub struct TodoStore {
    path: PathBuf,
    request_lock: Option<Arc<Mutex<()>>>,
}

impl TodoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            request_lock: None,
        }
    }

    /// Serialize load-mutate-save spans across requests in this process.
    pub fn with_request_lock(mut self) -> Self {
        self.request_lock = Some(Arc::new(Mutex::new(())));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Held by the dispatcher for the lifetime of one request when serialization is enabled.
    pub async fn begin_request(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.request_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    pub async fn load_all(&self) -> Result<Vec<Todo>, StoreError> {
        let raw = fs::read_to_string(&self.path).await.map_err(|source| StoreError::Read {
            path: self.display(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.display(),
            source,
        })
    }

    pub async fn save_all(&self, todos: &[Todo]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(todos).map_err(|source| StoreError::Encode {
            path: self.display(),
            source,
        })?;
        fs::write(&self.path, json).await.map_err(|source| StoreError::Write {
            path: self.display(),
            source,
        })
    }

    /// Seeds an empty collection when the backing file does not exist yet.
    pub async fn ensure_exists(&self) -> Result<bool, StoreError> {
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        self.save_all(&[]).await?;
        Ok(true)
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}
