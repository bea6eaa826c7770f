//! CLI runner shared by the `stagefs` binary and the integration tests.

use std::io::{self, Read, Write};

use tracing_subscriber::EnvFilter;

use crate::cli::{self, Commands};
use crate::env::{EnvSnapshot, KeyComparison};
use crate::writer::StagedWriter;

/// Environment variable holding the log filter, e.g. `STAGEFS_LOG=debug`.
pub const LOG_ENV: &str = "STAGEFS_LOG";

/// Install the stderr subscriber. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Public entry for running CLI logic.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run()?;
    init_logging();
    let writer = StagedWriter::new(cli::resolve_config(&args));

    match &args.command {
        Commands::Write { path, append, binary, encoding } => {
            let mut input = Vec::new();
            io::stdin().lock().read_to_end(&mut input)?;

            if *binary {
                if *append {
                    writer.append_all_bytes(path, &input)?;
                } else {
                    writer.write_all_bytes(path, &input)?;
                }
            } else {
                let text = String::from_utf8(input).map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("standard input is not UTF-8: {e}"),
                    )
                })?;
                if *append {
                    writer.append_all_text_with(path, &text, *encoding)?;
                } else {
                    writer.write_all_text_with(path, &text, *encoding)?;
                }
            }
        }
        Commands::Cat { path, encoding } => {
            let text = match encoding {
                Some(enc) => writer.read_all_text_with(path, *enc)?,
                None => writer.read_all_text(path)?,
            };
            let mut out = io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
        Commands::Env { ignore_case, json } => {
            let comparison = if *ignore_case {
                KeyComparison::CaseInsensitive
            } else {
                KeyComparison::CaseSensitive
            };
            let snapshot = EnvSnapshot::capture(comparison);
            let mut out = io::stdout().lock();
            if *json {
                serde_json::to_writer_pretty(&mut out, &snapshot)?;
                writeln!(out)?;
            } else {
                for (name, value) in snapshot.iter() {
                    writeln!(out, "{name}={value}")?;
                }
            }
        }
    }

    Ok(())
}
