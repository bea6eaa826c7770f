//! Scoped reader/writer helpers and the per-target lock registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Run `op` under a shared lock. The lock is released when `op` returns or
/// unwinds.
pub fn read_guarded<T, R>(lock: &RwLock<T>, op: impl FnOnce(&T) -> R) -> R {
    let guard = lock.read();
    op(&guard)
}

/// [`read_guarded`] passing one extra argument through to `op`.
pub fn read_guarded_with<T, I, R>(lock: &RwLock<T>, input: I, op: impl FnOnce(&T, I) -> R) -> R {
    let guard = lock.read();
    op(&guard, input)
}

/// Run `op` under an exclusive lock. The lock is released when `op` returns
/// or unwinds.
pub fn write_guarded<T, R>(lock: &RwLock<T>, op: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = lock.write();
    op(&mut guard)
}

/// [`write_guarded`] passing one extra argument through to `op`.
pub fn write_guarded_with<T, I, R>(
    lock: &RwLock<T>,
    input: I,
    op: impl FnOnce(&mut T, I) -> R,
) -> R {
    let mut guard = lock.write();
    op(&mut guard, input)
}

/// One mutex per target path, created on first use and dropped again once
/// nobody holds or waits for it.
///
/// Keys are canonical paths, so `dir/../dir/file` and `dir/file` share an
/// entry. For a target that does not exist yet its parent is canonicalized
/// instead.
#[derive(Debug, Default)]
pub struct PathLocks {
    entries: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

/// Held while a staged operation runs against one target.
#[derive(Debug)]
pub struct PathLockGuard {
    locks: Arc<PathLocks>,
    key: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PathLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn entry(&self, key: &Path) -> Arc<AsyncMutex<()>> {
        self.entries.lock().entry(key.to_path_buf()).or_default().clone()
    }

    /// Block the current thread until `target` is free. Panics on a tokio
    /// worker thread unless wrapped in `block_in_place`.
    pub fn lock_blocking(self: &Arc<Self>, target: &Path) -> PathLockGuard {
        let key = canonical_key(target);
        let guard = self.entry(&key).blocking_lock_owned();
        PathLockGuard { locks: Arc::clone(self), key, guard: Some(guard) }
    }

    /// Take the lock for `target` only if nobody holds it.
    pub fn try_lock(self: &Arc<Self>, target: &Path) -> Option<PathLockGuard> {
        let key = canonical_key(target);
        match self.entry(&key).try_lock_owned() {
            Ok(guard) => Some(PathLockGuard { locks: Arc::clone(self), key, guard: Some(guard) }),
            Err(_) => {
                self.prune(&key);
                None
            }
        }
    }

    pub async fn lock(self: &Arc<Self>, target: &Path) -> PathLockGuard {
        let key = canonical_key(target);
        let guard = self.entry(&key).lock_owned().await;
        PathLockGuard { locks: Arc::clone(self), key, guard: Some(guard) }
    }

    // Callers must have dropped their own handle to the entry first.
    fn prune(&self, key: &Path) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|m| Arc::strong_count(m) == 1) {
            entries.remove(key);
        }
    }

    /// Number of targets currently locked or waited on.
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        // Release first so the count below only sees the map and any waiters.
        self.guard.take();
        self.locks.prune(&self.key);
    }
}

fn canonical_key(target: &Path) -> PathBuf {
    if let Ok(path) = std::fs::canonicalize(target) {
        return path;
    }
    match (target.parent(), target.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            std::fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| target.to_path_buf())
        }
        _ => target.to_path_buf(),
    }
}
