//! # pkgmgr CLI
//!
//! This is the binary entry point for the `pkgmgr` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating top-level errors into an exit code. When an external
//!   command failed, `pkgmgr` exits with that command's code; every other
//!   error exits with 1.
//!
//! The core application logic is defined in the `lib.rs` library crate, ensuring
//! that the binary is a thin wrapper around the reusable library functionality.

mod cli;
mod commands;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    if let Err(err) = cli.execute() {
        eprintln!("Error: {:?}", err);
        std::process::exit(exit_code(&err));
    }
}

/// Exit code of the first failed external command in the error chain, or 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<pkgmgr::error::Error>())
        .find_map(pkgmgr::error::Error::exit_code)
        .unwrap_or(1)
}
