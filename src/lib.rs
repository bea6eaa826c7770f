//! # stagefs
//!
//! Staged atomic file writes for volumes where writing a file in place is
//! unreliable (some container bind mounts and network shares silently
//! truncate or drop direct writes, while copies and renames onto the same
//! path work).
//!
//! Every mutating call on a [`StagedWriter`] runs against a private staging
//! file in a local directory, which is then moved onto the target in a single
//! rename. Readers of the target see either the old or the new content, and a
//! failed call never leaves the staging file behind.
//!
//! ## Key Modules
//!
//! - [`writer`]: the [`StagedWriter`] with its staged and pass-through operations.
//! - [`staging`]: staging file allocation, relocation and cleanup.
//! - [`encoding`]: text encodings for the text and line operations.
//! - [`locks`]: scoped reader/writer helpers and the per-target lock registry.
//! - [`env`]: environment snapshots.
//!
//! ## Examples
//!
//! ```no_run
//! use stagefs::StagedWriter;
//!
//! let writer = StagedWriter::default();
//! writer.write_all_text("/mnt/share/report.txt", "hello\n")?;
//! writer.append_all_lines("/mnt/share/report.txt", ["world"])?;
//! # Ok::<(), stagefs::StageError>(())
//! ```

pub mod cli;
pub mod cli_runner;
pub mod config;
pub mod encoding;
pub mod env;
pub mod error;
pub mod locks;
pub mod staging;
pub mod writer;

// Cross-platform filesystem wrapper
pub mod fsx;

pub use config::StagedWriterConfig;
pub use encoding::TextEncoding;
pub use env::{EnvSnapshot, KeyComparison};
pub use error::StageError;
pub use writer::StagedWriter;
