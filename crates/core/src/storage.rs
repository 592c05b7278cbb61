//! Storage backends that hold the actual files.
//!
//! Records only remember a storage by its hash, so two backends serving the
//! same names keep separate records.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::Error;

/// A place files live in.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stable description of this backend instance (kind plus location).
    fn identity(&self) -> String;

    /// Whether a file called `name` currently exists.
    async fn exists(&self, name: &str) -> Result<bool, Error>;
}

/// Stable identifier for a storage backend, as persisted in `storage_hash`.
pub fn storage_hash(storage: &dyn Storage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(storage.identity().as_bytes());
    hex::encode(hasher.finalize())
}

/// Files under a local directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` below the root, refusing names that would escape it.
    pub fn path(&self, name: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(Error::InvalidInput(format!("invalid storage name: {name:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Storage for FileSystemStorage {
    fn identity(&self) -> String {
        format!("filesystem:{}", self.root.display())
    }

    async fn exists(&self, name: &str) -> Result<bool, Error> {
        let path = self.path(name)?;
        Ok(tokio::fs::try_exists(path).await?)
    }
}
