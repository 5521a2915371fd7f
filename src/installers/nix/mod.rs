//! # Nix Flake Installer
//!
//! Installs a repository's `flake.nix` into the user's Nix profile.
//!
//! ## Flow
//!
//! 1. List the profile. If an element already came from this repository it
//!    is upgraded in place.
//! 2. Otherwise the flake is installed. Installs and upgrades download from
//!    the forge, so they go through the [`RateLimitRetrier`].
//! 3. When the install fails because an older element provides the same
//!    files, the elements nix names are removed and the install is tried
//!    once more.
//!
//! Any failure left after that is fatal for the repository.
//!
//! Setting `PKGMGR_DISABLE_NIX_FLAKE_INSTALLER` (to anything) turns this
//! installer off, which is useful on hosts where the profile is managed
//! declaratively.

pub mod conflict;
pub mod profile;

pub use profile::{parse_profile, ProfileEntry};

use super::{capability, Capability, Installer, Layer, ToolLocator};
use crate::context::RepoContext;
use crate::defaults::DISABLE_NIX_ENV;
use crate::error::{Error, Result};
use crate::retry::RateLimitRetrier;
use crate::runner::{CommandRunner, CommandSpec, RunResult};
use std::collections::BTreeSet;

pub struct NixFlakeInstaller {
    tools: Box<dyn ToolLocator>,
    disabled: bool,
    retrier: RateLimitRetrier,
}

impl NixFlakeInstaller {
    pub fn new(tools: Box<dyn ToolLocator>, disabled: bool) -> Self {
        Self {
            tools,
            disabled,
            retrier: RateLimitRetrier::default(),
        }
    }

    /// Installer honouring the disable switch in the environment.
    pub fn from_env(tools: Box<dyn ToolLocator>) -> Self {
        Self::new(tools, std::env::var_os(DISABLE_NIX_ENV).is_some())
    }

    pub fn with_retrier(mut self, retrier: RateLimitRetrier) -> Self {
        self.retrier = retrier;
        self
    }

    /// `nix <args>` with the flake features enabled regardless of the
    /// user's nix.conf.
    fn nix(args: &[&str]) -> CommandSpec {
        let mut argv = vec!["nix", "--extra-experimental-features", "nix-command flakes"];
        argv.extend_from_slice(args);
        CommandSpec::args(argv)
    }

    fn flake_ref(ctx: &RepoContext) -> String {
        format!("{}#default", ctx.repo_dir.display())
    }

    fn list_profile(&self, ctx: &RepoContext, runner: &CommandRunner) -> Result<Vec<ProfileEntry>> {
        let result = runner.run(
            &Self::nix(&["profile", "list", "--json"]),
            &ctx.repo_dir,
            ctx.preview,
            false,
        )?;
        parse_profile(&result.stdout)
    }

    fn install(&self, ctx: &RepoContext, runner: &CommandRunner) -> Result<RunResult> {
        let flake = Self::flake_ref(ctx);
        self.retrier
            .run_with_retry(ctx, runner, &Self::nix(&["profile", "install", &flake]))
    }

    fn remove(&self, ctx: &RepoContext, runner: &CommandRunner, entry: &str) -> Result<()> {
        runner.run(
            &Self::nix(&["profile", "remove", entry]),
            &ctx.repo_dir,
            ctx.preview,
            false,
        )?;
        Ok(())
    }
}

fn ensure_success(command: CommandSpec, result: RunResult) -> Result<()> {
    if result.success() {
        return Ok(());
    }
    Err(Error::CommandFailed {
        command: command.to_string(),
        code: result.returncode,
        stderr: result.stderr,
    })
}

impl Installer for NixFlakeInstaller {
    fn name(&self) -> &'static str {
        "nix-flake"
    }

    fn layer(&self) -> Layer {
        Layer::Nix
    }

    fn supports(&self, ctx: &RepoContext) -> bool {
        if self.disabled {
            log::debug!("nix flake installer disabled by {}", DISABLE_NIX_ENV);
            return false;
        }
        ctx.repo_dir.join("flake.nix").is_file() && self.tools.has("nix")
    }

    fn discover_capabilities(&self, ctx: &RepoContext) -> BTreeSet<Capability> {
        capability::discover(Layer::Nix, &ctx.repo_dir)
    }

    fn run(&self, ctx: &RepoContext, runner: &CommandRunner) -> Result<()> {
        let entries = self.list_profile(ctx, runner)?;
        if let Some(entry) = entries.iter().find(|e| e.matches(ctx)) {
            log::info!("{}: upgrading nix profile entry {}", ctx.identifier, entry.name);
            let upgrade = Self::nix(&["profile", "upgrade", &entry.name]);
            let result = self.retrier.run_with_retry(ctx, runner, &upgrade)?;
            return ensure_success(upgrade, result);
        }

        let result = self.install(ctx, runner)?;
        if result.success() {
            return Ok(());
        }

        let output = result.combined_output();
        let install = Self::nix(&["profile", "install", &Self::flake_ref(ctx)]);
        if !conflict::is_conflict(&output) {
            return ensure_success(install, result);
        }
        let conflicts = conflict::conflicting_entries(&output)?;
        if conflicts.is_empty() {
            return ensure_success(install, result);
        }

        log::warn!(
            "{}: nix profile conflict, removing {}",
            ctx.identifier,
            conflicts.join(", ")
        );
        for entry in &conflicts {
            self.remove(ctx, runner, entry)?;
        }
        let retried = self.install(ctx, runner)?;
        ensure_success(install, retried)
    }
}
