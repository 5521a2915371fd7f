//! # Installation Pipeline
//!
//! Decides which installers run for a repository, and in which order.
//!
//! 1. Resolve an existing entry point. If found, attach it to the record and
//!    link it. Its layer pre-empts every installer of lower priority.
//! 2. Walk the installers in priority order. Skip those that do not support
//!    the repository, and those whose every capability was already provided
//!    by an installer that ran earlier in this invocation. Run the rest and
//!    record what they provided.
//! 3. Resolve again and link whatever is now available.
//!
//! Installer failures are not caught here. They abort the repository, and
//! the caller decides whether to continue with the next one.

use super::{Capability, Installer, Layer};
use crate::command::{CommandResolver, FilesystemResolver, ResolvedCommand};
use crate::context::RepoContext;
use crate::error::Result;
use crate::link;
use crate::runner::CommandRunner;
use std::collections::BTreeSet;
use std::fmt;

/// Why an installer did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unsupported,
    /// An existing command came from a higher-priority layer.
    Preempted(Layer),
    /// Everything it would provide is already provided.
    AlreadyProvided,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unsupported => f.write_str("not applicable"),
            SkipReason::Preempted(layer) => write!(f, "command already provided by {}", layer),
            SkipReason::AlreadyProvided => f.write_str("capabilities already provided"),
        }
    }
}

/// What the pipeline did for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub ran: Vec<&'static str>,
    pub skipped: Vec<(&'static str, SkipReason)>,
    pub provided: BTreeSet<Capability>,
    pub command: Option<ResolvedCommand>,
}

pub struct InstallationPipeline {
    installers: Vec<Box<dyn Installer>>,
    resolver: Box<dyn CommandResolver>,
}

impl InstallationPipeline {
    /// Pipeline over `installers`, sorted by layer. Installers of the same
    /// layer keep their relative order.
    pub fn new(mut installers: Vec<Box<dyn Installer>>) -> Self {
        installers.sort_by_key(|i| i.layer());
        Self {
            installers,
            resolver: Box::new(FilesystemResolver::default()),
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn CommandResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn run(&self, ctx: &mut RepoContext, runner: &CommandRunner) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();

        let existing = self.resolver.resolve(ctx);
        let preempting_layer = existing.as_ref().and_then(|c| c.layer);
        if let Some(command) = &existing {
            log::debug!(
                "{}: existing command {} ({})",
                ctx.identifier,
                command.path.display(),
                command.layer.map(|l| l.to_string()).unwrap_or_else(|| "local".to_string())
            );
            self.attach(ctx, command)?;
        }

        for installer in &self.installers {
            let name = installer.name();

            if let Some(layer) = preempting_layer {
                if layer.outranks(installer.layer()) {
                    log::info!("{}: skipping {}, command provided by {}", ctx.identifier, name, layer);
                    report.skipped.push((name, SkipReason::Preempted(layer)));
                    continue;
                }
            }

            if !installer.supports(ctx) {
                report.skipped.push((name, SkipReason::Unsupported));
                continue;
            }

            let capabilities = installer.discover_capabilities(ctx);
            if !capabilities.is_empty() && capabilities.is_subset(&report.provided) {
                log::info!(
                    "{}: skipping {}, already provided: {}",
                    ctx.identifier,
                    name,
                    join(&capabilities)
                );
                report.skipped.push((name, SkipReason::AlreadyProvided));
                continue;
            }

            log::info!("{}: running {} installer", ctx.identifier, name);
            installer.run(ctx, runner)?;
            report.ran.push(name);
            report.provided.extend(capabilities);
        }

        report.command = self.resolver.resolve(ctx);
        if let Some(command) = &report.command {
            if existing.as_ref() != Some(command) {
                self.attach(ctx, command)?;
            }
        }
        Ok(report)
    }

    fn attach(&self, ctx: &mut RepoContext, command: &ResolvedCommand) -> Result<()> {
        ctx.repo.command = Some(command.path.display().to_string());
        link::create_link(ctx, command)?;
        Ok(())
    }
}

fn join(capabilities: &BTreeSet<Capability>) -> String {
    capabilities
        .iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
