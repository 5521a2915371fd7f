//! # Git Plumbing
//!
//! Thin wrappers around the system `git` executable. Read-only queries go
//! through [`run_git`], which captures output and maps failures onto
//! [`GitError`]: a missing directory or a "not a git repository" complaint
//! becomes `NotARepository`, anything else becomes `Run`.
//!
//! Mutating operations (clone, fetch, pull) go through the
//! [`CommandRunner`] instead so they honour preview mode and the
//! fatal-by-default policy.
//!
//! Using the system `git` means SSH keys, credential helpers and anything
//! configured in `~/.gitconfig` work without extra setup.

use crate::context::{clone_url, CloneMode, RepoContext};
use crate::error::{GitError, Result};
use crate::runner::{CommandRunner, CommandSpec};
use std::path::Path;
use std::process::Command;

/// Run `git <args>` in `cwd` and return trimmed stdout.
pub fn run_git(args: &[&str], cwd: &Path) -> std::result::Result<String, GitError> {
    if !cwd.is_dir() {
        return Err(GitError::NotARepository {
            path: cwd.display().to_string(),
        });
    }

    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| GitError::Spawn {
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.to_lowercase().contains("not a git repository") {
            return Err(GitError::NotARepository {
                path: cwd.display().to_string(),
            });
        }
        return Err(GitError::Run {
            command: args.join(" "),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Queries the verifier needs. Mockable in tests.
pub trait GitQueries: Send + Sync {
    /// Commit hash of HEAD.
    fn head_commit(&self, repo_dir: &Path) -> std::result::Result<String, GitError>;

    /// Commit hash the remote's HEAD points at. Talks to the network.
    fn remote_head_commit(&self, repo_dir: &Path) -> std::result::Result<String, GitError>;

    /// Fingerprint of the key that signed `rev`, `None` when unsigned.
    fn signing_key(&self, repo_dir: &Path, rev: &str)
        -> std::result::Result<Option<String>, GitError>;
}

/// [`GitQueries`] backed by the system `git`.
pub struct SystemGit;

impl GitQueries for SystemGit {
    fn head_commit(&self, repo_dir: &Path) -> std::result::Result<String, GitError> {
        run_git(&["rev-parse", "HEAD"], repo_dir)
    }

    fn remote_head_commit(&self, repo_dir: &Path) -> std::result::Result<String, GitError> {
        let output = run_git(&["ls-remote", "origin", "HEAD"], repo_dir)?;
        parse_ls_remote_head(&output).ok_or_else(|| GitError::Run {
            command: "ls-remote origin HEAD".to_string(),
            code: 0,
            stderr: "remote did not report a HEAD commit".to_string(),
        })
    }

    fn signing_key(
        &self,
        repo_dir: &Path,
        rev: &str,
    ) -> std::result::Result<Option<String>, GitError> {
        let key = run_git(&["log", "-1", "--format=%GK", rev], repo_dir)?;
        Ok(Some(key).filter(|k| !k.is_empty()))
    }
}

/// First hash in `git ls-remote` output (`<hash>\t<ref>` per line).
pub fn parse_ls_remote_head(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find(|hash| !hash.is_empty())
        .map(str::to_string)
}

/// True when `dir` already contains a checkout.
pub fn is_checkout(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// Clone the context's repository into its directory.
pub fn clone(ctx: &RepoContext, runner: &CommandRunner) -> Result<()> {
    let url = clone_url(&ctx.repo, ctx.clone_mode);
    let parent = ctx.repo_dir.parent().unwrap_or(&ctx.base_dir);
    if !ctx.preview {
        std::fs::create_dir_all(parent)?;
    }

    let target = ctx.repo_dir.display().to_string();
    let mut args = vec!["git".to_string(), "clone".to_string()];
    if ctx.clone_mode == CloneMode::Shallow {
        args.push("--depth".to_string());
        args.push("1".to_string());
    }
    args.push(url);
    args.push(target);

    runner.run(&CommandSpec::args(args), parent, ctx.preview, false)?;
    Ok(())
}

/// `git fetch origin` in the checkout.
pub fn fetch(ctx: &RepoContext, runner: &CommandRunner) -> Result<()> {
    runner.run(
        &CommandSpec::args(["git", "fetch", "origin"]),
        &ctx.repo_dir,
        ctx.preview,
        false,
    )?;
    Ok(())
}

/// Fast-forward the checkout to its upstream.
pub fn pull(ctx: &RepoContext, runner: &CommandRunner) -> Result<()> {
    runner.run(
        &CommandSpec::args(["git", "pull", "--ff-only"]),
        &ctx.repo_dir,
        ctx.preview,
        false,
    )?;
    Ok(())
}
