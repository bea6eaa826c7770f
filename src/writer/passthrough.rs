//! Operations that need no staging. They forward straight to the filesystem
//! and return its errors untouched, so callers can use one [`StagedWriter`]
//! for all file access.

use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::SystemTime;

use super::StagedWriter;
use crate::encoding::TextEncoding;
use crate::fsx as fs;

impl StagedWriter {
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().exists()
    }

    pub fn metadata(&self, path: impl AsRef<Path>) -> io::Result<fs::Metadata> {
        fs::metadata(path)
    }

    pub fn copy(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        overwrite: bool,
    ) -> io::Result<u64> {
        fs::copy_file(source.as_ref(), dest.as_ref(), overwrite)
    }

    /// Move a file. Falls back to copy + delete across filesystems.
    pub fn rename(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        overwrite: bool,
    ) -> io::Result<()> {
        fs::move_file(source.as_ref(), dest.as_ref(), overwrite)
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::remove_file(path)
    }

    pub fn is_readonly(&self, path: impl AsRef<Path>) -> io::Result<bool> {
        Ok(fs::metadata(path)?.permissions().readonly())
    }

    pub fn set_readonly(&self, path: impl AsRef<Path>, readonly: bool) -> io::Result<()> {
        fs::set_readonly(path.as_ref(), readonly)
    }

    pub fn modified(&self, path: impl AsRef<Path>) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) -> io::Result<()> {
        fs::OpenOptions::new().write(true).open(path)?.set_modified(time)
    }

    // --- streams, not staged ---------------------------------------------------

    pub fn open(&self, path: impl AsRef<Path>) -> io::Result<fs::File> {
        fs::File::open(path)
    }

    /// Create or truncate `path` for writing. Writes through this handle go
    /// straight to the target.
    pub fn create(&self, path: impl AsRef<Path>) -> io::Result<fs::File> {
        fs::File::create(path)
    }

    pub fn open_append(&self, path: impl AsRef<Path>) -> io::Result<fs::File> {
        fs::OpenOptions::new().create(true).append(true).open(path)
    }

    // --- reads ---------------------------------------------------------------

    pub fn read_all_bytes(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    /// Read `path` as text, picking the encoding from its byte order mark.
    pub fn read_all_text(&self, path: impl AsRef<Path>) -> io::Result<String> {
        let bytes = fs::read(path)?;
        TextEncoding::detect(&bytes).decode(&bytes)
    }

    pub fn read_all_text_with(
        &self,
        path: impl AsRef<Path>,
        encoding: TextEncoding,
    ) -> io::Result<String> {
        encoding.decode(&fs::read(path)?)
    }

    pub fn read_all_lines(&self, path: impl AsRef<Path>) -> io::Result<Vec<String>> {
        Ok(self.read_all_text(path)?.lines().map(String::from).collect())
    }

    pub fn read_all_lines_with(
        &self,
        path: impl AsRef<Path>,
        encoding: TextEncoding,
    ) -> io::Result<Vec<String>> {
        Ok(self.read_all_text_with(path, encoding)?.lines().map(String::from).collect())
    }

    /// Lazily iterate the UTF-8 lines of `path`.
    pub fn read_lines(&self, path: impl AsRef<Path>) -> io::Result<io::Lines<BufReader<fs::File>>> {
        Ok(BufReader::new(fs::File::open(path)?).lines())
    }

    pub async fn read_all_bytes_async(&self, path: impl AsRef<Path>) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    pub async fn read_all_text_async(&self, path: impl AsRef<Path>) -> io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        TextEncoding::detect(&bytes).decode(&bytes)
    }

    pub async fn read_all_text_with_async(
        &self,
        path: impl AsRef<Path>,
        encoding: TextEncoding,
    ) -> io::Result<String> {
        encoding.decode(&tokio::fs::read(path).await?)
    }

    pub async fn read_all_lines_async(&self, path: impl AsRef<Path>) -> io::Result<Vec<String>> {
        Ok(self.read_all_text_async(path).await?.lines().map(String::from).collect())
    }
}
