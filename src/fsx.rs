//! Cross-platform filesystem wrapper.
//!
//! Re-exports `std::fs` so the rest of the crate can import `crate::fsx as fs`
//! and adds the handful of primitives the staged writer needs on top of it:
//! copy and move with an explicit overwrite flag, and detection of
//! cross-device renames so relocation can fall back to copying.

use std::io;
use std::path::Path;

pub use std::fs::*;

/// Returns `true` when `err` is the platform's "rename across filesystems"
/// error (`EXDEV` on Unix, `ERROR_NOT_SAME_DEVICE` on Windows).
#[cfg(unix)]
pub fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(windows)]
pub fn is_cross_device(err: &io::Error) -> bool {
    const ERROR_NOT_SAME_DEVICE: i32 = 17;
    err.raw_os_error() == Some(ERROR_NOT_SAME_DEVICE)
}

#[cfg(not(any(unix, windows)))]
pub fn is_cross_device(_err: &io::Error) -> bool {
    false
}

fn refuse_existing(dest: &Path) -> io::Result<()> {
    if dest.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination '{}' already exists", dest.display()),
        ));
    }
    Ok(())
}

/// Copy `source` to `dest`. With `overwrite == false` an existing destination
/// is an `AlreadyExists` error.
pub fn copy_file(source: &Path, dest: &Path, overwrite: bool) -> io::Result<u64> {
    if !overwrite {
        refuse_existing(dest)?;
    }
    copy(source, dest)
}

/// Move `source` to `dest`. Uses a rename when both live on the same
/// filesystem and copy + delete otherwise.
pub fn move_file(source: &Path, dest: &Path, overwrite: bool) -> io::Result<()> {
    if !overwrite {
        refuse_existing(dest)?;
    }
    match rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            copy(source, dest)?;
            remove_file(source)
        }
        Err(e) => Err(e),
    }
}

/// Toggle the read-only flag of `path`.
pub fn set_readonly(path: &Path, readonly: bool) -> io::Result<()> {
    let mut perms = metadata(path)?.permissions();
    perms.set_readonly(readonly);
    set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copy_without_overwrite_refuses_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        write(&src, b"new").unwrap();
        write(&dst, b"old").unwrap();

        let err = copy_file(&src, &dst, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(read(&dst).unwrap(), b"old");

        copy_file(&src, &dst, true).unwrap();
        assert_eq!(read(&dst).unwrap(), b"new");
    }

    #[test]
    fn move_replaces_destination_when_allowed() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        write(&src, b"payload").unwrap();
        write(&dst, b"old").unwrap();

        move_file(&src, &dst, true).unwrap();
        assert!(!src.exists());
        assert_eq!(read(&dst).unwrap(), b"payload");
    }

    #[cfg(unix)]
    #[test]
    fn recognises_exdev() {
        assert!(is_cross_device(&io::Error::from_raw_os_error(libc::EXDEV)));
        assert!(!is_cross_device(&io::Error::from(io::ErrorKind::NotFound)));
    }
}
