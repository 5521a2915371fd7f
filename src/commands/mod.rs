//! # CLI Command Implementations
//!
//! Each subcommand of `pkgmgr` lives in its own file with:
//! - an `Args` struct derived with `clap`;
//! - an `execute` function that loads the configuration, builds
//!   per-repository contexts and calls into the `pkgmgr` library.
//!
//! The argument groups and helpers shared by several commands (config
//! location, repository selection, run-mode flags, the per-repository loop)
//! are defined here.

pub mod install;
pub mod list;
pub mod token;
pub mod update;
pub mod verify;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use pkgmgr::config::{self, Config, RepositoryRecord};
use pkgmgr::context::{repo_identifier, CloneMode, RepoContext, RunFlags};
use pkgmgr::defaults::default_config_path;
use pkgmgr::installers::PipelineReport;
use pkgmgr::output::OutputConfig;
use pkgmgr::suggestions;

/// Where the configuration file is.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the configuration file.
    ///
    /// Defaults to `~/.config/pkgmgr/config.yaml`.
    #[arg(short, long, value_name = "FILE", env = "PKGMGR_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    pub fn load(&self) -> Result<Config> {
        let path = self.path();
        if !path.exists() {
            return Err(suggestions::config_not_found(&path));
        }
        config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }
}

/// Which repositories a command acts on.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Repositories to act on, by identifier, alias, name or
    /// provider/account/name.
    #[arg(value_name = "REPOSITORY")]
    pub identifiers: Vec<String>,

    /// Act on every configured repository.
    #[arg(long, conflicts_with = "identifiers")]
    pub all: bool,
}

impl SelectionArgs {
    /// Selected records in configuration order.
    pub fn select(&self, config: &Config) -> Result<Vec<RepositoryRecord>> {
        let all = &config.repositories;
        if self.all {
            return Ok(all.clone());
        }
        if self.identifiers.is_empty() {
            return Err(suggestions::nothing_selected());
        }

        let unknown: Vec<String> = self
            .identifiers
            .iter()
            .filter(|wanted| !all.iter().any(|repo| matches_identifier(repo, all, wanted)))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            let known: Vec<String> = all.iter().map(|r| repo_identifier(r, all)).collect();
            return Err(suggestions::unknown_repositories(&unknown, &known));
        }

        Ok(all
            .iter()
            .filter(|repo| {
                self.identifiers
                    .iter()
                    .any(|wanted| matches_identifier(repo, all, wanted))
            })
            .cloned()
            .collect())
    }
}

fn matches_identifier(repo: &RepositoryRecord, all: &[RepositoryRecord], wanted: &str) -> bool {
    wanted == repo_identifier(repo, all)
        || wanted == repo.full_name()
        || repo.alias.as_deref() == Some(wanted)
        || wanted == repo.repository
}

/// Run-mode flags for commands that change the system.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Print the commands that would run without running them.
    #[arg(long)]
    pub preview: bool,

    /// Only print failures.
    #[arg(short, long)]
    pub quiet: bool,

    /// Skip pinned commit and signing key checks.
    #[arg(long)]
    pub no_verification: bool,

    /// How missing repositories are cloned (ssh, https, shallow).
    #[arg(long, value_name = "MODE", default_value_t = CloneMode::Ssh)]
    pub clone_mode: CloneMode,
}

impl RunArgs {
    pub fn flags(&self, update_dependencies: bool) -> RunFlags {
        RunFlags {
            no_verification: self.no_verification,
            preview: self.preview,
            quiet: self.quiet,
            clone_mode: self.clone_mode,
            update_dependencies,
        }
    }
}

/// Contexts for `selected`, in order.
pub fn contexts(config: &Config, selected: &[RepositoryRecord], flags: RunFlags) -> Vec<RepoContext> {
    let base_dir = config.repositories_dir();
    let bin_dir = config.binaries_dir();
    selected
        .iter()
        .map(|repo| {
            RepoContext::new(
                repo.clone(),
                &config.repositories,
                &base_dir,
                &bin_dir,
                flags,
            )
        })
        .collect()
}

/// One-line summary of a pipeline run.
pub fn describe(report: &PipelineReport) -> String {
    let installed = if report.ran.is_empty() {
        "nothing to install".to_string()
    } else {
        format!("installed via {}", report.ran.join(", "))
    };
    match &report.command {
        Some(command) => format!("{} (command: {})", installed, command.path.display()),
        None => installed,
    }
}

/// Run `operation` for every context, reporting each outcome and carrying
/// on after failures. Fails at the end when any repository failed.
///
/// When a failure came from an external command, that error stays in the
/// chain so the process exits with the command's code.
pub fn run_each<F>(contexts: Vec<RepoContext>, output: &OutputConfig, mut operation: F) -> Result<()>
where
    F: FnMut(&mut RepoContext) -> pkgmgr::error::Result<PipelineReport>,
{
    let mut failed = Vec::new();
    let mut first_command_failure = None;

    for mut ctx in contexts {
        output.print(output.heading(&ctx.identifier));
        match operation(&mut ctx) {
            Ok(report) => {
                output.print(output.success(&format!("{}: {}", ctx.identifier, describe(&report))));
            }
            Err(e) => {
                eprintln!("{}", output.failure(&format!("{}: {}", ctx.identifier, e)));
                failed.push(ctx.identifier.clone());
                if first_command_failure.is_none() && e.exit_code().is_some() {
                    first_command_failure = Some(e);
                }
            }
        }
    }

    if failed.is_empty() {
        return Ok(());
    }
    let summary = suggestions::repositories_failed(&failed);
    match first_command_failure {
        Some(e) => Err(anyhow::Error::new(e).context(summary.to_string())),
        None => Err(summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmgr::command::ResolvedCommand;
    use pkgmgr::error::Error;
    use std::path::Path;

    fn sample_config() -> Config {
        config::parse(
            r#"
directories:
  repositories: /srv/repos
  binaries: /srv/bin
repositories:
  - provider: github.com
    account: octo
    repository: tool
  - provider: gitea.example.org
    account: team
    repository: tool
    alias: team-tool
  - provider: github.com
    account: octo
    repository: other
"#,
        )
        .unwrap()
    }

    fn selection(identifiers: &[&str]) -> SelectionArgs {
        SelectionArgs {
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            all: false,
        }
    }

    #[test]
    fn test_select_all() {
        let selected = SelectionArgs {
            identifiers: vec![],
            all: true,
        }
        .select(&sample_config())
        .unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_select_by_identifier_alias_and_full_name() {
        let config = sample_config();
        let selected = selection(&["team-tool", "github.com/octo/tool"])
            .select(&config)
            .unwrap();
        let names: Vec<String> = selected.iter().map(|r| r.full_name()).collect();
        assert_eq!(
            names,
            vec!["github.com/octo/tool", "gitea.example.org/team/tool"]
        );
    }

    #[test]
    fn test_bare_ambiguous_name_selects_every_match() {
        let selected = selection(&["tool"]).select(&sample_config()).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_unknown_fails() {
        let err = selection(&["other", "missing"]).select(&sample_config()).unwrap_err();
        assert!(err.to_string().contains("Unknown repository: missing"));
    }

    #[test]
    fn test_select_nothing_fails() {
        assert!(selection(&[]).select(&sample_config()).is_err());
    }

    #[test]
    fn test_contexts_use_configured_directories() {
        let config = sample_config();
        let contexts = contexts(&config, &config.repositories[1..2], RunFlags::default());
        assert_eq!(contexts[0].identifier, "team-tool");
        assert_eq!(
            contexts[0].repo_dir,
            Path::new("/srv/repos/gitea.example.org/team/tool")
        );
        assert_eq!(contexts[0].bin_dir, Path::new("/srv/bin"));
    }

    #[test]
    fn test_missing_config_file() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/pkgmgr.yaml")),
        };
        let err = args.load().unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&PipelineReport::default()), "nothing to install");
        let report = PipelineReport {
            ran: vec!["nix-flake"],
            command: Some(ResolvedCommand {
                path: PathBuf::from("/nix/store/x/bin/tool"),
                layer: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            describe(&report),
            "installed via nix-flake (command: /nix/store/x/bin/tool)"
        );
    }

    #[test]
    fn test_run_each_continues_and_keeps_command_failure() {
        let config = sample_config();
        let contexts = contexts(&config, &config.repositories, RunFlags::default());
        let output = OutputConfig {
            use_color: false,
            quiet: true,
        };
        let mut seen = Vec::new();

        let err = run_each(contexts, &output, |ctx| {
            seen.push(ctx.identifier.clone());
            match ctx.repo.repository.as_str() {
                "other" => Ok(PipelineReport::default()),
                _ if ctx.identifier == "team-tool" => Err(Error::CommandFailed {
                    command: "make install".to_string(),
                    code: 7,
                    stderr: String::new(),
                }),
                _ => Err(Error::Installer {
                    installer: "x".to_string(),
                    message: "broken".to_string(),
                }),
            }
        })
        .unwrap_err();

        assert_eq!(seen.len(), 3);
        assert!(err.to_string().starts_with("2 repository(ies) failed"));
        let code = err
            .chain()
            .filter_map(|c| c.downcast_ref::<Error>())
            .find_map(Error::exit_code);
        assert_eq!(code, Some(7));
    }
}
