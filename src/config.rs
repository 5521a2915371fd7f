//! # Configuration Schema and Loading
//!
//! This module defines the structures that represent the `pkgmgr`
//! configuration file and the logic for loading it.
//!
//! ## Key Components
//!
//! - **`Config`**: The whole file: where repositories and executables live,
//!   and the ordered list of repositories to manage.
//!
//! - **`RepositoryRecord`**: One repository, identified by provider host,
//!   account and name, with an optional alias, an optional explicit command,
//!   and an optional `verified` trust block.
//!
//! - **`TrustBlock`**: Pinned commit and/or accepted signing keys. When the
//!   block is absent, verification is best-effort only.
//!
//! Paths in the `directories` section may start with `~`, which is expanded
//! against the user's home directory.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pinned trust metadata for a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustBlock {
    /// Full commit hash HEAD must point at. Compared exactly, so an
    /// abbreviated hash never matches.
    #[serde(default)]
    pub commit: Option<String>,
    /// Signing key fingerprints accepted for HEAD.
    #[serde(default)]
    pub signing_keys: Option<Vec<String>>,
}

impl TrustBlock {
    /// Pinned commit, ignoring empty strings.
    pub fn pinned_commit(&self) -> Option<&str> {
        self.commit.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Accepted signing keys, ignoring an empty list.
    pub fn pinned_keys(&self) -> Option<&[String]> {
        self.signing_keys.as_deref().filter(|keys| !keys.is_empty())
    }
}

/// A single repository entry from the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Provider host, e.g. `github.com`.
    pub provider: String,
    /// Owner or organisation.
    pub account: String,
    /// Repository name.
    pub repository: String,
    /// Name used for the executable link instead of the repository name.
    #[serde(default)]
    pub alias: Option<String>,
    /// Explicit entry point. Also set by the installation pipeline once a
    /// command has been resolved.
    #[serde(default)]
    pub command: Option<String>,
    /// Pinned trust metadata.
    #[serde(default)]
    pub verified: Option<TrustBlock>,
}

impl RepositoryRecord {
    /// Creates a record with no alias, command or trust block.
    pub fn new(
        provider: impl Into<String>,
        account: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            account: account.into(),
            repository: repository.into(),
            alias: None,
            command: None,
            verified: None,
        }
    }

    /// `provider/account/repository`
    pub fn full_name(&self) -> String {
        format!("{}/{}/{}", self.provider, self.account, self.repository)
    }

    /// True when the record carries at least one strict trust check.
    pub fn has_trust_checks(&self) -> bool {
        self.verified
            .as_ref()
            .is_some_and(|v| v.pinned_commit().is_some() || v.pinned_keys().is_some())
    }
}

/// Directory layout section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directories {
    /// Base directory under which repositories are cloned.
    #[serde(default = "default_repositories_dir")]
    pub repositories: PathBuf,
    /// Directory receiving executable links.
    #[serde(default = "default_binaries_dir")]
    pub binaries: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            repositories: default_repositories_dir(),
            binaries: default_binaries_dir(),
        }
    }
}

fn default_repositories_dir() -> PathBuf {
    PathBuf::from("~/Repositories")
}

fn default_binaries_dir() -> PathBuf {
    PathBuf::from("~/.local/bin")
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub directories: Directories,
    #[serde(default)]
    pub repositories: Vec<RepositoryRecord>,
}

impl Config {
    /// Base directory with `~` expanded.
    pub fn repositories_dir(&self) -> PathBuf {
        expand_home(&self.directories.repositories)
    }

    /// Binaries directory with `~` expanded.
    pub fn binaries_dir(&self) -> PathBuf {
        expand_home(&self.directories.binaries)
    }
}

/// Parse a configuration from YAML text.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(yaml_content)?;
    validate(&config)?;
    Ok(config)
}

/// Load and parse a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
        hint: Some("Pass --config or set PKGMGR_CONFIG".to_string()),
    })?;
    parse(&content)
}

fn validate(config: &Config) -> Result<()> {
    for (index, repo) in config.repositories.iter().enumerate() {
        for (field, value) in [
            ("provider", &repo.provider),
            ("account", &repo.account),
            ("repository", &repo.repository),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("Repository #{} has an empty '{}'", index + 1, field),
                    hint: None,
                });
            }
        }
    }
    Ok(())
}

/// Expand a leading `~` against the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
