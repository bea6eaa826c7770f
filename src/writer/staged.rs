//! The mutating operations: whole-file writes and appends of bytes, text and
//! lines, each in a blocking and an async flavour. All of them go through the
//! staged runners in the parent module.

use std::io::{self, Write};
use std::path::Path;

use tokio::io::AsyncWriteExt;

use super::StagedWriter;
use crate::encoding::TextEncoding;
use crate::error::StageError;
use crate::fsx as fs;

fn join_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    text
}

/// Bytes to append to `staging` for `text`. The preamble is only written
/// into an empty file.
fn append_payload(staging: &Path, text: &str, encoding: TextEncoding) -> io::Result<Vec<u8>> {
    if fs::metadata(staging)?.len() == 0 {
        encoding.encode_with_preamble(text)
    } else {
        encoding.encode(text)
    }
}

async fn append_payload_async(
    staging: &Path,
    text: &str,
    encoding: TextEncoding,
) -> io::Result<Vec<u8>> {
    if tokio::fs::metadata(staging).await?.len() == 0 {
        encoding.encode_with_preamble(text)
    } else {
        encoding.encode(text)
    }
}

fn append_bytes(staging: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new().append(true).open(staging)?;
    file.write_all(bytes)
}

async fn append_bytes_async(staging: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new().append(true).open(staging).await?;
    file.write_all(bytes).await?;
    file.flush().await
}

impl StagedWriter {
    // --- bytes ---------------------------------------------------------------

    /// Replace the content of `path` with `bytes`.
    pub fn write_all_bytes(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), StageError> {
        self.stage(path, |staging| fs::write(staging, bytes.as_ref()))
    }

    pub fn append_all_bytes(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), StageError> {
        self.stage(path, |staging| append_bytes(staging, bytes.as_ref()))
    }

    pub async fn write_all_bytes_async(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), StageError> {
        self.stage_async(path, |staging| async move { tokio::fs::write(&staging, bytes).await })
            .await
    }

    pub async fn append_all_bytes_async(
        &self,
        path: impl AsRef<Path>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), StageError> {
        self.stage_async(path, |staging| async move {
            append_bytes_async(&staging, bytes.as_ref()).await
        })
        .await
    }

    // --- text ----------------------------------------------------------------

    /// Replace the content of `path` with `text` encoded as UTF-8.
    pub fn write_all_text(&self, path: impl AsRef<Path>, text: &str) -> Result<(), StageError> {
        self.write_all_text_with(path, text, TextEncoding::Utf8)
    }

    /// Replace the content of `path` with `text` in `encoding`, preamble
    /// included.
    pub fn write_all_text_with(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        encoding: TextEncoding,
    ) -> Result<(), StageError> {
        self.stage(path, |staging| fs::write(staging, encoding.encode_with_preamble(text)?))
    }

    /// Append `text` as UTF-8, creating the file if needed.
    pub fn append_all_text(&self, path: impl AsRef<Path>, text: &str) -> Result<(), StageError> {
        self.append_all_text_with(path, text, TextEncoding::Utf8)
    }

    pub fn append_all_text_with(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        encoding: TextEncoding,
    ) -> Result<(), StageError> {
        self.stage(path, |staging| {
            let payload = append_payload(staging, text, encoding)?;
            append_bytes(staging, &payload)
        })
    }

    pub async fn write_all_text_async(
        &self,
        path: impl AsRef<Path>,
        text: &str,
    ) -> Result<(), StageError> {
        self.write_all_text_with_async(path, text, TextEncoding::Utf8).await
    }

    pub async fn write_all_text_with_async(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        encoding: TextEncoding,
    ) -> Result<(), StageError> {
        self.stage_async(path, |staging| async move {
            let payload = encoding.encode_with_preamble(text)?;
            tokio::fs::write(&staging, payload).await
        })
        .await
    }

    pub async fn append_all_text_async(
        &self,
        path: impl AsRef<Path>,
        text: &str,
    ) -> Result<(), StageError> {
        self.append_all_text_with_async(path, text, TextEncoding::Utf8).await
    }

    pub async fn append_all_text_with_async(
        &self,
        path: impl AsRef<Path>,
        text: &str,
        encoding: TextEncoding,
    ) -> Result<(), StageError> {
        self.stage_async(path, |staging| async move {
            let payload = append_payload_async(&staging, text, encoding).await?;
            append_bytes_async(&staging, &payload).await
        })
        .await
    }

    // --- lines ---------------------------------------------------------------
    //
    // Each line is terminated with '\n'.

    pub fn write_all_lines<I, S>(&self, path: impl AsRef<Path>, lines: I) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write_all_text(path, &join_lines(lines))
    }

    pub fn write_all_lines_with<I, S>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        encoding: TextEncoding,
    ) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write_all_text_with(path, &join_lines(lines), encoding)
    }

    pub fn append_all_lines<I, S>(&self, path: impl AsRef<Path>, lines: I) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.append_all_text(path, &join_lines(lines))
    }

    pub fn append_all_lines_with<I, S>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        encoding: TextEncoding,
    ) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.append_all_text_with(path, &join_lines(lines), encoding)
    }

    pub async fn write_all_lines_async<I, S>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
    ) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = join_lines(lines);
        self.write_all_text_async(path, &text).await
    }

    pub async fn write_all_lines_with_async<I, S>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        encoding: TextEncoding,
    ) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = join_lines(lines);
        self.write_all_text_with_async(path, &text, encoding).await
    }

    pub async fn append_all_lines_async<I, S>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
    ) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = join_lines(lines);
        self.append_all_text_async(path, &text).await
    }

    pub async fn append_all_lines_with_async<I, S>(
        &self,
        path: impl AsRef<Path>,
        lines: I,
        encoding: TextEncoding,
    ) -> Result<(), StageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = join_lines(lines);
        self.append_all_text_with_async(path, &text, encoding).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_lines_terminates_every_line() {
        assert_eq!(join_lines(["a", "b"]), "a\nb\n");
        assert_eq!(join_lines(Vec::<String>::new()), "");
    }

    #[test]
    fn preamble_only_goes_into_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(append_payload(&path, "x", TextEncoding::Utf8Bom).unwrap(), b"\xEF\xBB\xBFx");
        std::fs::write(&path, b"y").unwrap();
        assert_eq!(append_payload(&path, "x", TextEncoding::Utf8Bom).unwrap(), b"x");
    }
}
