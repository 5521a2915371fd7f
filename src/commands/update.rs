//! # Update Command Implementation
//!
//! `pkgmgr update` fetches each selected repository, checks the incoming
//! remote HEAD against the pinned trust block before merging anything,
//! fast-forwards, and reinstalls with dependency upgrades enabled.
//! Repositories that were never cloned are installed instead.

use anyhow::Result;
use clap::Args;

use super::{contexts, run_each, ConfigArgs, RunArgs, SelectionArgs};
use pkgmgr::operations::Workflow;
use pkgmgr::output::OutputConfig;

/// Fetch, verify and fast-forward repositories, then reinstall them
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, color: &str) -> Result<()> {
    let config = args.config.load()?;
    let selected = args.selection.select(&config)?;
    let output = OutputConfig::from_env_and_flag(color, args.run.quiet);
    let workflow = Workflow::default();

    run_each(
        contexts(&config, &selected, args.run.flags(true)),
        &output,
        |ctx| workflow.update(ctx),
    )
}
