//! # List Command Implementation
//!
//! `pkgmgr list` prints every configured repository with its identifier,
//! checkout state and trust pinning. It is read-only.

use anyhow::Result;
use clap::Args;

use super::{contexts, ConfigArgs};
use pkgmgr::context::{RepoContext, RunFlags};
use pkgmgr::git;
use pkgmgr::output::OutputConfig;

/// List configured repositories
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print only the checkout directories, one per line.
    #[arg(long)]
    pub paths: bool,
}

/// Execute the `list` command.
pub fn execute(args: ListArgs, color: &str) -> Result<()> {
    let config = args.config.load()?;
    let output = OutputConfig::from_env_and_flag(color, false);
    let contexts = contexts(&config, &config.repositories, RunFlags::default());

    if contexts.is_empty() {
        println!("No repositories configured.");
        return Ok(());
    }

    for ctx in &contexts {
        if args.paths {
            println!("{}", ctx.repo_dir.display());
        } else {
            println!("{}", line(ctx, &output));
        }
    }
    Ok(())
}

fn line(ctx: &RepoContext, output: &OutputConfig) -> String {
    let state = if git::is_checkout(&ctx.repo_dir) {
        output.success("cloned")
    } else {
        output.failure("missing")
    };
    let trust = if ctx.repo.has_trust_checks() {
        "pinned"
    } else {
        "unpinned"
    };
    format!(
        "{:<24} {:<40} {} {}",
        ctx.identifier,
        ctx.repo.full_name(),
        trust,
        state
    )
}
