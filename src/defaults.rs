//! Default values for pkgmgr configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Service name under which tokens are stored in the OS keyring.
pub const KEYRING_SERVICE: &str = "pkgmgr";

/// Environment variable that disables the Nix flake installer.
pub const DISABLE_NIX_ENV: &str = "PKGMGR_DISABLE_NIX_FLAKE_INSTALLER";

/// Environment variable overriding the pip invocation.
pub const PIP_ENV: &str = "PKGMGR_PIP";

/// Returns the default configuration file path.
///
/// Uses the platform-appropriate config directory:
/// - Linux: `~/.config/pkgmgr/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/pkgmgr/config.yaml`
///
/// Falls back to `pkgmgr.yaml` in the current directory if the platform
/// config directory cannot be determined.
///
/// This can be overridden by the `--config` CLI flag or the
/// `PKGMGR_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("pkgmgr").join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from("pkgmgr.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_file_name() {
        let path = default_config_path();
        assert!(path.ends_with("pkgmgr/config.yaml") || path.ends_with("pkgmgr.yaml"));
    }
}
