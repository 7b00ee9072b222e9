//! CLI module for crmcore
//!
//! One-shot commands over a configured data directory:
//! - query / compile: filtered, sorted, paged reads and their explain plan
//! - get / create / update / delete: entity CRUD with audit mirroring
//! - audit: activity feed

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run, run_command, Runtime};
pub use errors::{CliError, CliResult};
pub use io::{parse_request, read_request, write_error, write_response};
