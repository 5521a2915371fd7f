//! # Verify Command Implementation
//!
//! `pkgmgr verify` checks checkouts against their pinned commit and
//! signing keys without changing anything. Verification is read-only, so
//! repositories are checked in parallel; results are printed in
//! configuration order.

use anyhow::Result;
use clap::Args;
use rayon::prelude::*;

use super::{contexts, ConfigArgs, SelectionArgs};
use pkgmgr::context::{RepoContext, RunFlags};
use pkgmgr::error::GitError;
use pkgmgr::git::{GitQueries, SystemGit};
use pkgmgr::output::OutputConfig;
use pkgmgr::suggestions;
use pkgmgr::verify::{verify_repository, VerificationOutcome, VerifyMode};

/// Check repositories against their pinned commit and signing keys
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Check the remote HEAD instead of the local checkout.
    #[arg(long)]
    pub remote: bool,

    /// Only print failures.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `verify` command.
pub fn execute(args: VerifyArgs, color: &str) -> Result<()> {
    let config = args.config.load()?;
    let selected = args.selection.select(&config)?;
    let output = OutputConfig::from_env_and_flag(color, args.quiet);
    let mode = if args.remote {
        VerifyMode::Pull
    } else {
        VerifyMode::Local
    };

    let contexts = contexts(&config, &selected, RunFlags::default());
    let results = verify_all(&contexts, mode, &SystemGit);
    report(&results, &output)
}

/// Verify every context in parallel. Results are in input order.
fn verify_all(
    contexts: &[RepoContext],
    mode: VerifyMode,
    git: &dyn GitQueries,
) -> Vec<(String, Result<VerificationOutcome, GitError>)> {
    contexts
        .par_iter()
        .map(|ctx| {
            (
                ctx.identifier.clone(),
                verify_repository(&ctx.repo, &ctx.repo_dir, mode, git),
            )
        })
        .collect()
}

fn report(
    results: &[(String, Result<VerificationOutcome, GitError>)],
    output: &OutputConfig,
) -> Result<()> {
    let mut failed = Vec::new();
    for (identifier, result) in results {
        match result {
            Ok(outcome) if outcome.ok => {
                let commit = if outcome.commit.is_empty() {
                    "unknown commit"
                } else {
                    outcome.commit.as_str()
                };
                output.print(output.success(&format!("{}: {}", identifier, commit)));
            }
            Ok(outcome) => {
                eprintln!("{}", output.failure(identifier));
                for error in &outcome.errors {
                    eprintln!("    {}", error);
                }
                failed.push(identifier.clone());
            }
            Err(e) => {
                eprintln!("{}", output.failure(&format!("{}: {}", identifier, e)));
                failed.push(identifier.clone());
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(suggestions::repositories_failed(&failed))
    }
}
