//! Token sources: environment, `gh`, OS keyring and terminal prompt.

use super::ProviderKind;
use crate::defaults::KEYRING_SERVICE;
use crate::error::Result;
use std::io::IsTerminal;
use std::process::Command;

/// Reads environment variables.
pub trait EnvReader: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl EnvReader for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A provider CLI that can hand out the token it is logged in with.
pub trait CredentialHelper: Send + Sync {
    fn token(&self, host: &str) -> Option<String>;
}

/// `gh auth token --hostname <host>`.
pub struct GhCli;

impl CredentialHelper for GhCli {
    fn token(&self, host: &str) -> Option<String> {
        let output = Command::new("gh")
            .args(["auth", "token", "--hostname", host])
            .output()
            .map_err(|e| log::debug!("gh not available: {}", e))
            .ok()?;
        if !output.status.success() {
            log::debug!("gh has no token for {}", host);
            return None;
        }
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!token.is_empty()).then_some(token)
    }
}

/// Persistent per-host token storage.
pub trait SecretStore: Send + Sync {
    /// The stored token, or `None` when there is no entry.
    fn get(&self, host: &str) -> Result<Option<String>>;
    fn set(&self, host: &str, token: &str) -> Result<()>;
}

/// OS keyring, one entry per host under a fixed service name.
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, host: &str) -> keyring::Result<keyring::Entry> {
        keyring::Entry::new(&self.service, host)
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, host: &str) -> Result<Option<String>> {
        match self.entry(host)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, host: &str, token: &str) -> Result<()> {
        self.entry(host)?.set_password(token)?;
        log::info!("saved token for {} to the keyring", host);
        Ok(())
    }
}

/// Asks the user for a token.
pub trait Prompter: Send + Sync {
    /// `Ok(None)` when nobody can be asked.
    fn prompt(&self, provider: ProviderKind, host: &str) -> Result<Option<String>>;
}

/// Hidden-input prompt on the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, provider: ProviderKind, host: &str) -> Result<Option<String>> {
        if !std::io::stdin().is_terminal() {
            log::debug!("stdin is not a terminal, not prompting for a token");
            return Ok(None);
        }
        let token = dialoguer::Password::new()
            .with_prompt(format!("{} token for {}", provider, host))
            .allow_empty_password(true)
            .interact()?;
        Ok(Some(token))
    }
}
