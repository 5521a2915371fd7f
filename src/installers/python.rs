//! Python installer: `pip install .` from the checkout.

use super::{capability, Capability, Installer, Layer};
use crate::context::RepoContext;
use crate::defaults::PIP_ENV;
use crate::error::Result;
use crate::runner::{CommandRunner, CommandSpec};
use std::collections::BTreeSet;

pub struct PythonInstaller {
    /// Command prefix that runs pip, e.g. `python3 -m pip`.
    pip: Vec<String>,
}

impl Default for PythonInstaller {
    fn default() -> Self {
        Self::new("python3 -m pip")
    }
}

impl PythonInstaller {
    /// `pip` is split on whitespace, so `"uv pip"` works too.
    pub fn new(pip: &str) -> Self {
        Self {
            pip: pip.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Uses `PKGMGR_PIP` when it is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(PIP_ENV) {
            Ok(pip) if !pip.trim().is_empty() => Self::new(&pip),
            _ => Self::default(),
        }
    }

    pub fn command(&self, update_dependencies: bool) -> CommandSpec {
        let mut args = self.pip.clone();
        args.push("install".to_string());
        if update_dependencies {
            args.push("--upgrade".to_string());
        }
        args.push(".".to_string());
        CommandSpec::args(args)
    }
}

impl Installer for PythonInstaller {
    fn name(&self) -> &'static str {
        "python"
    }

    fn layer(&self) -> Layer {
        Layer::Python
    }

    fn supports(&self, ctx: &RepoContext) -> bool {
        ctx.repo_dir.join("pyproject.toml").is_file() || ctx.repo_dir.join("setup.py").is_file()
    }

    fn discover_capabilities(&self, ctx: &RepoContext) -> BTreeSet<Capability> {
        capability::discover(Layer::Python, &ctx.repo_dir)
    }

    fn run(&self, ctx: &RepoContext, runner: &CommandRunner) -> Result<()> {
        runner.run(
            &self.command(ctx.update_dependencies),
            &ctx.repo_dir,
            ctx.preview,
            false,
        )?;
        Ok(())
    }
}
