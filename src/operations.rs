//! # Repository Operations
//!
//! The per-repository workflows behind `pkgmgr install` and
//! `pkgmgr update`:
//!
//! - **install**: clone when the checkout is missing, verify the local HEAD
//!   against the trust block, then run the installation pipeline.
//! - **update**: fetch, verify the remote HEAD before anything is merged,
//!   fast-forward, then run the pipeline with dependency upgrades on.
//!
//! A failed verification stops the repository before any installer runs.
//! `--no-verification` skips the gate entirely.

use crate::context::RepoContext;
use crate::error::{Error, Result};
use crate::git::{self, GitQueries, SystemGit};
use crate::installers::{default_installers, InstallationPipeline, PipelineReport};
use crate::runner::CommandRunner;
use crate::verify::{verify_repository, VerifyMode};

pub struct Workflow {
    runner: CommandRunner,
    git: Box<dyn GitQueries>,
    pipeline: InstallationPipeline,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(
            CommandRunner::new(),
            Box::new(SystemGit),
            InstallationPipeline::new(default_installers()),
        )
    }
}

impl Workflow {
    pub fn new(
        runner: CommandRunner,
        git: Box<dyn GitQueries>,
        pipeline: InstallationPipeline,
    ) -> Self {
        Self {
            runner,
            git,
            pipeline,
        }
    }

    pub fn install(&self, ctx: &mut RepoContext) -> Result<PipelineReport> {
        if !git::is_checkout(&ctx.repo_dir) {
            log::info!("{}: cloning into {}", ctx.identifier, ctx.repo_dir.display());
            git::clone(ctx, &self.runner)?;
            if ctx.preview {
                // Nothing on disk to verify or install from.
                return Ok(PipelineReport::default());
            }
        }
        self.gate(ctx, VerifyMode::Local)?;
        self.pipeline.run(ctx, &self.runner)
    }

    pub fn update(&self, ctx: &mut RepoContext) -> Result<PipelineReport> {
        if !git::is_checkout(&ctx.repo_dir) {
            log::info!("{}: not cloned yet, installing instead", ctx.identifier);
            return self.install(ctx);
        }
        git::fetch(ctx, &self.runner)?;
        self.gate(ctx, VerifyMode::Pull)?;
        git::pull(ctx, &self.runner)?;
        ctx.update_dependencies = true;
        self.pipeline.run(ctx, &self.runner)
    }

    fn gate(&self, ctx: &RepoContext, mode: VerifyMode) -> Result<()> {
        if ctx.no_verification {
            log::debug!("{}: verification skipped", ctx.identifier);
            return Ok(());
        }
        if !ctx.repo.has_trust_checks() {
            return Ok(());
        }

        let outcome = verify_repository(&ctx.repo, &ctx.repo_dir, mode, self.git.as_ref())?;
        if !outcome.ok {
            return Err(Error::VerificationFailed {
                repository: ctx.identifier.clone(),
                errors: outcome.errors,
            });
        }
        log::info!("{}: verified at {}", ctx.identifier, outcome.commit);
        Ok(())
    }
}
