//! Staging file allocation, relocation and cleanup.
//!
//! A staging file is a [`TempPath`]: dropping it deletes the file, so every
//! early return, unwind or dropped future discards it. The only way a staging
//! file survives is [`relocate`], which consumes it by renaming it onto the
//! target.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

use crate::error::StageError;
use crate::fsx as fs;

/// File name prefix of every staging file.
pub const STAGING_PREFIX: &str = ".stagefs-";

fn placeholder(dir: &Path) -> io::Result<TempPath> {
    Ok(Builder::new().prefix(STAGING_PREFIX).tempfile_in(dir)?.into_temp_path())
}

/// Allocate a fresh staging file in `staging_dir`, seeded with the content of
/// `target` when it exists.
pub fn allocate(staging_dir: &Path, target: &Path) -> Result<TempPath, StageError> {
    let staging = placeholder(staging_dir).map_err(|e| StageError::allocation(target, e))?;
    if target.exists() {
        fs::copy(target, &staging).map_err(|e| StageError::allocation(target, e))?;
    }
    debug!(staging = %staging.display(), target = %target.display(), "allocated staging file");
    Ok(staging)
}

/// Async counterpart of [`allocate`]; the seeding copy runs on tokio's
/// filesystem pool.
pub async fn allocate_async(staging_dir: &Path, target: &Path) -> Result<TempPath, StageError> {
    let staging = placeholder(staging_dir).map_err(|e| StageError::allocation(target, e))?;
    if tokio::fs::metadata(target).await.is_ok() {
        tokio::fs::copy(target, &staging)
            .await
            .map_err(|e| StageError::allocation(target, e))?;
    }
    debug!(staging = %staging.display(), target = %target.display(), "allocated staging file");
    Ok(staging)
}

/// Delete a staging file after a failed operation and build the error that
/// reports it.
pub fn discard(staging: TempPath, target: &Path, source: io::Error) -> StageError {
    let staging_path = staging.to_path_buf();
    warn!(
        staging = %staging_path.display(),
        target = %target.display(),
        error = %source,
        "staged operation failed, discarding staging file"
    );
    match staging.close() {
        Ok(()) => {}
        // The operation itself may have removed it.
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(staging = %staging_path.display(), error = %e, "could not remove staging file")
        }
    }
    StageError::staged(staging_path, target, source)
}

/// Move the staging file onto `target`, replacing it.
pub fn relocate(staging: TempPath, target: &Path) -> Result<(), StageError> {
    let staging_path = staging.to_path_buf();
    match staging.persist(target) {
        Ok(()) => {
            debug!(
                staging = %staging_path.display(),
                target = %target.display(),
                "relocated staging file"
            );
            Ok(())
        }
        Err(err) if fs::is_cross_device(&err.error) => relocate_across_devices(err.path, target),
        Err(err) => Err(discard(err.path, target, err.error)),
    }
}

/// Relocate when the staging directory and the target are on different
/// filesystems: copy into a sibling of the target, then rename the sibling, so
/// the target is still replaced in a single step.
fn relocate_across_devices(staging: TempPath, target: &Path) -> Result<(), StageError> {
    debug!(
        staging = %staging.display(),
        target = %target.display(),
        "relocating across filesystems"
    );
    let result = (|| -> io::Result<()> {
        let sibling = placeholder(parent_dir(target))?;
        fs::copy(&staging, &sibling)?;
        sibling.persist(target).map_err(|e| e.error)
    })();
    match result {
        Ok(()) => {
            if let Err(e) = staging.close() {
                warn!(
                    target = %target.display(),
                    error = %e,
                    "could not remove staging file after relocation"
                );
            }
            Ok(())
        }
        Err(e) => Err(discard(staging, target, e)),
    }
}

/// Async counterpart of [`relocate`]. The rename runs on the blocking pool and
/// the returned future resolves only once it has finished.
///
/// `held` moves into the blocking task and is dropped after the rename, so a
/// lock passed here stays held even if the caller stops waiting.
pub async fn relocate_async<G>(
    staging: TempPath,
    target: PathBuf,
    held: G,
) -> Result<(), StageError>
where
    G: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let result = relocate(staging, &target);
        drop(held);
        result
    })
    .await?
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn allocate_seeds_from_existing_target() {
        let staging_dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        let target = work.path().join("t.txt");
        std::fs::write(&target, b"prior").unwrap();

        let staging = allocate(staging_dir.path(), &target).unwrap();
        assert_eq!(std::fs::read(&staging).unwrap(), b"prior");
        assert!(staging.file_name().unwrap().to_string_lossy().starts_with(STAGING_PREFIX));
        drop(staging);
        assert_eq!(entries(staging_dir.path()), 0);
    }

    #[test]
    fn allocate_leaves_placeholder_empty_for_new_target() {
        let staging_dir = tempdir().unwrap();
        let staging = allocate(staging_dir.path(), &staging_dir.path().join("missing")).unwrap();
        assert_eq!(std::fs::metadata(&staging).unwrap().len(), 0);
    }

    #[test]
    fn allocate_failure_leaves_nothing_behind() {
        let staging_dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        // A directory exists but cannot be copied as a file.
        let err = allocate(staging_dir.path(), work.path()).unwrap_err();
        assert!(matches!(err, StageError::Allocation { .. }));
        assert_eq!(entries(staging_dir.path()), 0);
    }

    #[test]
    fn relocate_failure_discards_staging_file() {
        let staging_dir = tempdir().unwrap();
        let target = staging_dir.path().join("no-such-dir").join("t.txt");
        let staging = allocate(staging_dir.path(), &target).unwrap();

        let err = relocate(staging, &target).unwrap_err();
        assert!(matches!(err, StageError::Staged { .. }));
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(entries(staging_dir.path()), 0);
    }

    #[test]
    fn cross_device_path_copies_through_a_sibling() {
        let staging_dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        let target = work.path().join("t.txt");
        std::fs::write(&target, b"old").unwrap();

        let staging = allocate(staging_dir.path(), &target).unwrap();
        std::fs::write(&staging, b"new").unwrap();
        relocate_across_devices(staging, &target).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        assert_eq!(entries(staging_dir.path()), 0);
        assert_eq!(entries(work.path()), 1);
    }

    // Records, at drop time, whether the target already had the new content.
    struct DropCheck {
        target: PathBuf,
        saw_new: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    impl Drop for DropCheck {
        fn drop(&mut self) {
            let new = std::fs::read(&self.target).map(|b| b == b"new").unwrap_or(false);
            self.saw_new.store(new, Ordering::SeqCst);
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn held_value_outlives_an_abandoned_relocation() {
        let staging_dir = tempdir().unwrap();
        let work = tempdir().unwrap();
        let target = work.path().join("t.txt");
        std::fs::write(&target, b"old").unwrap();

        let staging = allocate(staging_dir.path(), &target).unwrap();
        std::fs::write(&staging, b"new").unwrap();
        let saw_new = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        let held = DropCheck {
            target: target.clone(),
            saw_new: Arc::clone(&saw_new),
            dropped: Arc::clone(&dropped),
        };

        // Poll once so the blocking task is spawned, then walk away from it.
        let fut = relocate_async(staging, target.clone(), held);
        let _ = tokio::time::timeout(Duration::ZERO, fut).await;

        for _ in 0..500 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(dropped.load(Ordering::SeqCst));
        assert!(saw_new.load(Ordering::SeqCst));
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        assert_eq!(entries(staging_dir.path()), 0);
    }
}
