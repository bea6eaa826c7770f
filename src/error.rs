use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The error type returned by staged operations.
///
/// Pass-through operations keep returning the plain [`io::Error`] of the
/// underlying filesystem call; only operations that go through a staging
/// file produce a `StageError`.
#[derive(Debug, Error)]
pub enum StageError {
    /// The staging file could not be created, or could not be seeded with the
    /// current content of the target. Nothing is left behind.
    #[error("could not prepare a staging file for '{}': {source}", .target.display())]
    Allocation {
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The operation against the staging file, or the relocation of the
    /// staging file onto the target, failed. The staging file has already
    /// been removed and the target still holds its previous content.
    #[error(
        "staged write to '{}' via '{}' failed: {source}",
        .target.display(),
        .staging.display()
    )]
    Staged {
        staging: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A blocking staged operation ran on a current-thread tokio runtime while
    /// another staged operation held the same target. Waiting would stall the
    /// runtime that has to release the lock.
    #[error("'{}' is locked by another staged write", .target.display())]
    Contended { target: PathBuf },

    /// The blocking task that relocates an asynchronously staged file
    /// panicked or was cancelled by the runtime.
    #[error("relocation task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl StageError {
    pub(crate) fn staged(staging: impl Into<PathBuf>, target: &Path, source: io::Error) -> Self {
        StageError::Staged { staging: staging.into(), target: target.to_path_buf(), source }
    }

    pub(crate) fn allocation(target: &Path, source: io::Error) -> Self {
        StageError::Allocation { target: target.to_path_buf(), source }
    }

    /// The path the caller asked to write, when known.
    pub fn target(&self) -> Option<&Path> {
        match self {
            StageError::Allocation { target, .. }
            | StageError::Staged { target, .. }
            | StageError::Contended { target } => Some(target),
            StageError::Join(_) => None,
        }
    }

    /// The staging file that was used (and discarded) by the failed operation.
    pub fn staging(&self) -> Option<&Path> {
        match self {
            StageError::Staged { staging, .. } => Some(staging),
            _ => None,
        }
    }

    /// The [`io::ErrorKind`] of the underlying failure.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            StageError::Allocation { source, .. } | StageError::Staged { source, .. } => {
                source.kind()
            }
            StageError::Contended { .. } => io::ErrorKind::WouldBlock,
            StageError::Join(_) => io::ErrorKind::Other,
        }
    }
}

// Lets callers mix staged and pass-through calls behind a single `io::Result`.
impl From<StageError> for io::Error {
    fn from(err: StageError) -> Self {
        io::Error::new(err.kind(), err)
    }
}
