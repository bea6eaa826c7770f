use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StagedWriterConfig;
use crate::encoding::TextEncoding;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory for staging files. Defaults to $STAGEFS_STAGING_DIR, then the system temp dir.
    #[arg(long, global = true)]
    pub staging_dir: Option<PathBuf>,

    /// Serialize concurrent staged writes to the same file (also $STAGEFS_SERIALIZE_WRITES).
    #[arg(long, global = true)]
    pub serialize: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Write standard input to a file through a staging file.
    #[command(alias = "w")]
    Write {
        /// The file to write.
        #[arg(required = true)]
        path: PathBuf,

        /// Append to the existing content instead of replacing it.
        #[arg(short, long)]
        append: bool,

        /// Copy standard input byte for byte instead of re-encoding it as text.
        #[arg(long, conflicts_with = "encoding")]
        binary: bool,

        /// Encoding of the written text (utf-8, utf-8-bom, utf-16le, utf-16be, latin1, ascii).
        #[arg(short, long, default_value_t = TextEncoding::Utf8)]
        encoding: TextEncoding,
    },

    /// Print a file as text.
    #[command(alias = "c")]
    Cat {
        /// The file to read.
        #[arg(required = true)]
        path: PathBuf,

        /// Encoding of the file. Detected from its byte order mark when omitted.
        #[arg(short, long)]
        encoding: Option<TextEncoding>,
    },

    /// Print the process environment.
    Env {
        /// Compare variable names ignoring case.
        #[arg(long)]
        ignore_case: bool,

        /// Print a JSON object instead of KEY=VALUE lines.
        #[arg(long)]
        json: bool,
    },
}

/// Builds the writer configuration.
///
/// Priority:
/// 1. `--staging-dir` / `--serialize` command-line arguments.
/// 2. `STAGEFS_STAGING_DIR` / `STAGEFS_SERIALIZE_WRITES` environment variables.
/// 3. Defaults (system temp dir, last writer wins).
pub fn resolve_config(args: &Args) -> StagedWriterConfig {
    let mut config = StagedWriterConfig::from_env();
    if let Some(dir) = &args.staging_dir {
        config.staging_dir = Some(dir.clone());
    }
    if args.serialize {
        config.serialize_same_target = true;
    }
    tracing::debug!(?config, "resolved configuration");
    config
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Result<Args, Box<dyn std::error::Error>> {
    Ok(Args::try_parse()?)
}
