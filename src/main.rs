// LogLens - main.rs
//
// Binary entry point: parse arguments, initialise logging, run the
// command, print the report. Exit code 1 on any error, 2 on
// cancellation (reserved for interactive use).

use clap::Parser;
use loglens::cli::{self, Cli};
use loglens::util::logging;

fn main() {
    let args = Cli::parse();
    logging::init(args.debug, false);

    match cli::run(&args) {
        Ok(report) => {
            println!("{report}");
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            let code = if e.is_cancelled() { 2 } else { 1 };
            std::process::exit(code);
        }
    }
}
