//! crmcore CLI entry point
//!
//! Parses arguments, dispatches through `cli::run` and exits non-zero on
//! failure. The error response itself is already on stdout.

use crmcore::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
