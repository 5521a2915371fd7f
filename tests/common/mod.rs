//! Shared test utilities for CLI E2E tests.
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let fixture = TestFixture::new().with_repositories(configs::TWO_REPOS);
//! fixture.command().arg("list").assert().success();
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// `repositories:` list bodies, indented for [`TestFixture::with_repositories`].
#[allow(dead_code)]
pub mod configs {
    /// Two repositories, one pinned to a commit.
    pub const TWO_REPOS: &str = r#"
  - provider: github.com
    account: octo
    repository: tool
    alias: t
  - provider: codeberg.org
    account: someone
    repository: notes
    verified:
      commit: 0123456789abcdef0123456789abcdef01234567
"#;

    /// Same repository name under two accounts.
    pub const AMBIGUOUS: &str = r#"
  - provider: github.com
    account: octo
    repository: tool
  - provider: github.com
    account: other
    repository: tool
"#;
}

/// Temporary directory holding a config file plus the repository and
/// binary directories it points at.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write a config whose directories live inside the fixture.
    pub fn with_repositories(self, repositories: &str) -> Self {
        let body = if repositories.trim().is_empty() {
            " []\n".to_string()
        } else {
            repositories.to_string()
        };
        let content = format!(
            "directories:\n  repositories: {}\n  binaries: {}\nrepositories:{}",
            self.repos_dir().display(),
            self.bin_dir().display(),
            body
        );
        self.with_raw_config(&content)
    }

    /// Write `content` to the config file as-is.
    pub fn with_raw_config(self, content: &str) -> Self {
        self.temp_dir
            .child("config.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.yaml")
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.path().join("repos")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    /// Checkout directory for `provider/account/name`.
    pub fn checkout(&self, provider: &str, account: &str, name: &str) -> PathBuf {
        self.repos_dir().join(provider).join(account).join(name)
    }

    /// `pkgmgr` running in the fixture with colour off and the config
    /// passed through the environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("pkgmgr");
        cmd.current_dir(self.path())
            .env("PKGMGR_CONFIG", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
