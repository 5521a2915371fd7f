//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// pkgmgr - Clone, verify and install a declared set of repositories
#[derive(Parser, Debug)]
#[command(name = "pkgmgr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone, verify and install repositories
    Install(commands::install::InstallArgs),

    /// Fetch, verify and fast-forward repositories, then reinstall them
    Update(commands::update::UpdateArgs),

    /// Check repositories against their pinned commit and signing keys
    Verify(commands::verify::VerifyArgs),

    /// Resolve an API token for a forge host
    Token(commands::token::TokenArgs),

    /// List configured repositories
    List(commands::list::ListArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Install(args) => commands::install::execute(args, &self.color),
            Commands::Update(args) => commands::update::execute(args, &self.color),
            Commands::Verify(args) => commands::verify::execute(args, &self.color),
            Commands::Token(args) => commands::token::execute(args, &self.color),
            Commands::List(args) => commands::list::execute(args, &self.color),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // Already initialized when called twice in one process (tests).
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
