//! Fallback installer: `make install`.

use super::{capability, Capability, Installer, Layer};
use crate::context::RepoContext;
use crate::error::Result;
use crate::runner::{CommandRunner, CommandSpec};
use std::collections::BTreeSet;

pub struct MakefileInstaller;

impl Installer for MakefileInstaller {
    fn name(&self) -> &'static str {
        "makefile"
    }

    fn layer(&self) -> Layer {
        Layer::Makefile
    }

    fn supports(&self, ctx: &RepoContext) -> bool {
        capability::makefile_has_install_target(&ctx.repo_dir)
    }

    fn discover_capabilities(&self, ctx: &RepoContext) -> BTreeSet<Capability> {
        capability::discover(Layer::Makefile, &ctx.repo_dir)
    }

    fn run(&self, ctx: &RepoContext, runner: &CommandRunner) -> Result<()> {
        runner.run(
            &CommandSpec::args(["make", "install"]),
            &ctx.repo_dir,
            ctx.preview,
            false,
        )?;
        Ok(())
    }
}
