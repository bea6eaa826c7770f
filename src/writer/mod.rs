//! The staged writer.
//!
//! Every mutating operation is run against a private staging file that is then
//! moved onto the real target in one rename:
//!
//! 1. allocate a staging file, seeded with the target's current content;
//! 2. run the operation against the staging file;
//! 3. relocate the staging file onto the target, replacing it.
//!
//! A failure in 2 or 3 removes the staging file and returns
//! [`StageError::Staged`]; the target keeps its previous content. The async
//! runner chains the relocation into the same future, so awaiting it means
//! the target has been replaced.

mod passthrough;
mod staged;

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::trace;

use crate::config::StagedWriterConfig;
use crate::error::StageError;
use crate::locks::{PathLockGuard, PathLocks};
use crate::staging;

/// Drop-in file access where every write goes through a staging file.
#[derive(Debug, Clone)]
pub struct StagedWriter {
    staging_dir: PathBuf,
    path_locks: Option<Arc<PathLocks>>,
}

impl Default for StagedWriter {
    fn default() -> Self {
        Self::new(StagedWriterConfig::default())
    }
}

impl StagedWriter {
    pub fn new(config: StagedWriterConfig) -> Self {
        StagedWriter {
            staging_dir: config.resolved_staging_dir(),
            path_locks: config.serialize_same_target.then(PathLocks::new),
        }
    }

    /// Writer configured from `STAGEFS_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(StagedWriterConfig::from_env())
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// The per-target lock registry, when same-target writes are serialized.
    pub fn path_locks(&self) -> Option<&Arc<PathLocks>> {
        self.path_locks.as_ref()
    }

    /// Per-target lock for the blocking runners. Outside a runtime this just
    /// blocks. On a multi-thread runtime the wait moves off the worker with
    /// `block_in_place`; a current-thread runtime cannot wait for a holder that
    /// it has to run itself, so contention there is an error.
    fn lock_target(&self, target: &Path) -> Result<Option<PathLockGuard>, StageError> {
        let Some(locks) = &self.path_locks else {
            return Ok(None);
        };
        let Ok(handle) = Handle::try_current() else {
            return Ok(Some(locks.lock_blocking(target)));
        };
        if let Some(guard) = locks.try_lock(target) {
            return Ok(Some(guard));
        }
        match handle.runtime_flavor() {
            RuntimeFlavor::MultiThread => {
                Ok(Some(tokio::task::block_in_place(|| locks.lock_blocking(target))))
            }
            _ => Err(StageError::Contended { target: target.to_path_buf() }),
        }
    }

    async fn lock_target_async(&self, target: &Path) -> Option<PathLockGuard> {
        match &self.path_locks {
            Some(locks) => Some(locks.lock(target).await),
            None => None,
        }
    }

    /// Run `op` against a staging copy of `target`, then move it into place.
    pub fn stage<F>(&self, target: impl AsRef<Path>, op: F) -> Result<(), StageError>
    where
        F: FnOnce(&Path) -> io::Result<()>,
    {
        self.stage_with(target, op)
    }

    /// Like [`stage`](Self::stage), returning the value produced by `op`
    /// once the staging file has been relocated.
    pub fn stage_with<T, F>(&self, target: impl AsRef<Path>, op: F) -> Result<T, StageError>
    where
        F: FnOnce(&Path) -> io::Result<T>,
    {
        let target = target.as_ref();
        let _lock = self.lock_target(target)?;
        let staging = staging::allocate(&self.staging_dir, target)?;
        trace!(staging = %staging.display(), "running staged operation");
        let value = match op(&*staging) {
            Ok(value) => value,
            Err(e) => return Err(staging::discard(staging, target, e)),
        };
        staging::relocate(staging, target)?;
        Ok(value)
    }

    /// Async runner. `op` receives the staging path and returns a future; the
    /// returned future resolves after `op` completed *and* the staging file
    /// was relocated. Dropping it early removes the staging file and leaves
    /// the target alone, unless relocation had already been handed to the
    /// blocking pool, in which case that relocation still finishes.
    pub async fn stage_async<T, F, Fut>(
        &self,
        target: impl AsRef<Path>,
        op: F,
    ) -> Result<T, StageError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        let target = target.as_ref().to_path_buf();
        let lock = self.lock_target_async(&target).await;
        let staging = staging::allocate_async(&self.staging_dir, &target).await?;
        trace!(staging = %staging.display(), "running staged operation");
        let value = match op(staging.to_path_buf()).await {
            Ok(value) => value,
            Err(e) => return Err(staging::discard(staging, &target, e)),
        };
        // The lock rides along with the relocation so it is released only
        // once the target has been replaced, even if this future is dropped.
        staging::relocate_async(staging, target, lock).await?;
        Ok(value)
    }
}
