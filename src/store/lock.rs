//! Path-scoped advisory lock.
//!
//! `config.yml` is guarded by a sibling `config.yml.lock` that never holds
//! content. The CLI, the daemon and the picker all take it exclusively around
//! each load and save, so concurrent processes serialize their writes.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::error::{StoreError, StoreResult};

/// Held exclusive lock. Released on drop.
#[derive(Debug)]
pub struct PathLock {
    file: File,
    path: PathBuf,
}

impl PathLock {
    /// Lock file path for a document path.
    pub fn lock_path(doc_path: &Path) -> PathBuf {
        let mut name = doc_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Block until the exclusive lock for `doc_path` is held.
    pub fn acquire(doc_path: &Path) -> StoreResult<Self> {
        let path = Self::lock_path(doc_path);
        let mut opts = OpenOptions::new();
        opts.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let file = opts.open(&path).map_err(|source| StoreError::Lock {
            path: path.clone(),
            source,
        })?;
        file.lock_exclusive().map_err(|source| StoreError::Lock {
            path: path.clone(),
            source,
        })?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to release {}: {e}", self.path.display());
        }
    }
}
