//! Main entry point for the stagefs CLI app

fn main() -> std::process::ExitCode {
    match stagefs::cli_runner::run_cli_app() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
                // Prints help/version to stdout and usage errors to stderr.
                let _ = clap_err.print();
                return if clap_err.use_stderr() {
                    std::process::ExitCode::FAILURE
                } else {
                    std::process::ExitCode::SUCCESS
                };
            }
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
