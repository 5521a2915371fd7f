//! # Install Command Implementation
//!
//! `pkgmgr install` clones each selected repository if needed, verifies it
//! against its pinned trust block and runs the installation pipeline. A
//! failure in one repository is reported and the next one is processed;
//! the command fails at the end if any repository failed.

use anyhow::Result;
use clap::Args;

use super::{contexts, run_each, ConfigArgs, RunArgs, SelectionArgs};
use pkgmgr::operations::Workflow;
use pkgmgr::output::OutputConfig;

/// Clone, verify and install repositories
#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Execute the `install` command.
pub fn execute(args: InstallArgs, color: &str) -> Result<()> {
    let config = args.config.load()?;
    let selected = args.selection.select(&config)?;
    let output = OutputConfig::from_env_and_flag(color, args.run.quiet);
    let workflow = Workflow::default();

    run_each(
        contexts(&config, &selected, args.run.flags(false)),
        &output,
        |ctx| workflow.install(ctx),
    )
}
