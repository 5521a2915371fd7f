//! # pkgmgr Library
//!
//! Core of the `pkgmgr` command-line tool, which keeps a declarative list of
//! source repositories cloned, verified and runnable.
//!
//! ## Quick Example
//!
//! ```
//! use pkgmgr::config;
//! use pkgmgr::context::{repo_identifier, CloneMode, clone_url};
//!
//! let config = config::parse(r#"
//! repositories:
//!   - provider: github.com
//!     account: octo
//!     repository: tool
//!     verified:
//!       commit: 0123456789abcdef0123456789abcdef01234567
//! "#).unwrap();
//!
//! let repo = &config.repositories[0];
//! assert!(repo.has_trust_checks());
//! assert_eq!(repo.verified.as_ref().and_then(|v| v.pinned_commit()).map(str::len), Some(40));
//! assert_eq!(repo_identifier(repo, &config.repositories), "tool");
//! assert_eq!(clone_url(repo, CloneMode::Https), "https://github.com/octo/tool.git");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`, `context`)**: the YAML repository list and
//!   the per-repository [`context::RepoContext`] built from it.
//! - **Command Runner (`runner`)**: every external command goes through
//!   one runner that honours preview mode and makes failures fatal.
//! - **Retry (`retry`)**: Fibonacci backoff for rate-limited network
//!   commands.
//! - **Installers (`installers`)**: OS packages, Nix flakes, Python and
//!   Makefiles, ordered by priority and deduplicated by capability.
//! - **Verification (`verify`, `git`)**: pinned commits and signing keys.
//! - **Credentials (`credentials`)**: API tokens from the environment, `gh`,
//!   the OS keyring or a prompt.
//!
//! ## Execution Flow
//!
//! For each selected repository, [`operations::Workflow`]:
//!
//! 1.  **Clones** (install) or **fetches** (update) the checkout.
//! 2.  **Verifies** the commit that is about to be used against its trust
//!     block, stopping the repository on a mismatch.
//! 3.  **Installs** through the [`installers::InstallationPipeline`].
//! 4.  **Links** the resolved entry point into the bin directory.

pub mod command;
pub mod config;
pub mod context;
pub mod credentials;
pub mod defaults;
pub mod error;
pub mod git;
pub mod installers;
pub mod link;
pub mod operations;
pub mod output;
pub mod retry;
pub mod runner;
pub mod suggestions;
pub mod verify;
