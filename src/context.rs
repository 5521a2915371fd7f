//! # Repository Context
//!
//! A [`RepoContext`] bundles everything an operation needs to know about one
//! repository: the configuration record, where it lives on disk, where its
//! executable link goes, and the run-mode flags of the current invocation.
//! It is built once per repository per command.
//!
//! The layout helpers in this module are the only place that decides where
//! a repository is cloned and what it is called.

use crate::config::RepositoryRecord;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How a missing repository is cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloneMode {
    /// `git@host:account/name.git`
    #[default]
    Ssh,
    /// `https://host/account/name.git`
    Https,
    /// HTTPS with `--depth 1`
    Shallow,
}

impl FromStr for CloneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ssh" => Ok(CloneMode::Ssh),
            "https" => Ok(CloneMode::Https),
            "shallow" => Ok(CloneMode::Shallow),
            other => Err(format!(
                "unknown clone mode '{}' (expected ssh, https or shallow)",
                other
            )),
        }
    }
}

impl fmt::Display for CloneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CloneMode::Ssh => "ssh",
            CloneMode::Https => "https",
            CloneMode::Shallow => "shallow",
        };
        f.write_str(name)
    }
}

/// Run-mode flags shared by every repository of one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFlags {
    pub no_verification: bool,
    pub preview: bool,
    pub quiet: bool,
    pub clone_mode: CloneMode,
    pub update_dependencies: bool,
}

/// Per-repository operation context.
#[derive(Debug, Clone)]
pub struct RepoContext {
    pub repo: RepositoryRecord,
    pub identifier: String,
    pub repo_dir: PathBuf,
    pub base_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub all_repos: Vec<RepositoryRecord>,
    pub no_verification: bool,
    pub preview: bool,
    pub quiet: bool,
    pub clone_mode: CloneMode,
    pub update_dependencies: bool,
}

impl RepoContext {
    pub fn new(
        repo: RepositoryRecord,
        all_repos: &[RepositoryRecord],
        base_dir: &Path,
        bin_dir: &Path,
        flags: RunFlags,
    ) -> Self {
        Self {
            identifier: repo_identifier(&repo, all_repos),
            repo_dir: repo_dir(base_dir, &repo),
            repo,
            base_dir: base_dir.to_path_buf(),
            bin_dir: bin_dir.to_path_buf(),
            all_repos: all_repos.to_vec(),
            no_verification: flags.no_verification,
            preview: flags.preview,
            quiet: flags.quiet,
            clone_mode: flags.clone_mode,
            update_dependencies: flags.update_dependencies,
        }
    }
}

/// Human identifier: the alias if set, the bare name when it is unique
/// across all repositories, otherwise `provider/account/name`.
pub fn repo_identifier(repo: &RepositoryRecord, all_repos: &[RepositoryRecord]) -> String {
    if let Some(alias) = repo.alias.as_deref().filter(|a| !a.is_empty()) {
        return alias.to_string();
    }
    let same_name = all_repos
        .iter()
        .filter(|other| other.repository == repo.repository)
        .count();
    if same_name > 1 {
        repo.full_name()
    } else {
        repo.repository.clone()
    }
}

/// `<base>/<provider>/<account>/<repository>`
pub fn repo_dir(base_dir: &Path, repo: &RepositoryRecord) -> PathBuf {
    base_dir
        .join(&repo.provider)
        .join(&repo.account)
        .join(&repo.repository)
}

/// Remote URL used to clone `repo` in `mode`.
pub fn clone_url(repo: &RepositoryRecord, mode: CloneMode) -> String {
    match mode {
        CloneMode::Ssh => format!(
            "git@{}:{}/{}.git",
            repo.provider, repo.account, repo.repository
        ),
        CloneMode::Https | CloneMode::Shallow => format!(
            "https://{}/{}/{}.git",
            repo.provider, repo.account, repo.repository
        ),
    }
}
