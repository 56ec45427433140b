//! Shellsurf - command-line tool for compositing character shell surfaces

use std::process::ExitCode;

use shellsurf::cli;

fn main() -> ExitCode {
    cli::run()
}
