use std::process::ExitCode;

use clap::Parser;

use crate::cli::App;

mod cli;
mod config;
mod session;

/// Exit status when the user backs out of the browser session.
const EXIT_CANCELLED: u8 = 130;

fn main() -> ExitCode {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        // Keep `anyhow` from capturing backtraces for expected failures.
        // SAFETY: There is only a single thread at the moment.
        unsafe { std::env::set_var("RUST_LIB_BACKTRACE", "0") };
    }

    match App::parse().run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_cancelled(&err) => {
            eprintln!("Sign-in cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<gsignin::Error>())
        .any(gsignin::Error::is_cancelled)
}
