//! # Error Handling
//!
//! This module defines the centralized error types for `pkgmgr`. It uses the
//! `thiserror` library to build two enums:
//!
//! - **`GitError`**: Errors raised by the git query layer. The distinction
//!   between `NotARepository` (the checkout is missing, an environment
//!   problem) and `Run` (a git command failed) drives the verifier's
//!   propagate-versus-report policy.
//!
//! - **`Error`**: The main enum for every other failure mode, including the
//!   fatal `CommandFailed` variant that the binary translates into the
//!   child's exit code.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.

use thiserror::Error;

/// Errors from the git query layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    /// The directory does not exist or is not a git checkout.
    #[error("Not a git repository: {path}")]
    NotARepository { path: String },

    /// A git command ran but exited non-zero.
    #[error("git {command} failed with exit code {code}: {stderr}")]
    Run {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The git executable could not be started.
    #[error("Failed to start git: {message}")]
    Spawn { message: String },
}

/// Main error type for pkgmgr operations
#[derive(Error, Debug)]
pub enum Error {
    /// An external command exited non-zero and the caller did not allow
    /// failure. The top-level binary exits with `code`.
    #[error("Command failed with exit code {code}: {command}{}", if stderr.trim().is_empty() { String::new() } else { format!("\n{}", stderr.trim_end()) })]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Every credential source was unavailable or produced nothing usable.
    #[error("No credentials available for {provider} on {host}: set the environment variable, log in with the provider CLI, or run interactively")]
    CredentialsExhausted { provider: String, host: String },

    /// Output of an external tool could not be parsed.
    ///
    /// The offending payload is kept for diagnostics.
    #[error("Failed to parse {context}: {message}\n--- payload ---\n{payload}")]
    Parse {
        context: String,
        message: String,
        payload: String,
    },

    /// An error from the git query layer.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The configuration file is missing or invalid.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A pinned repository did not match its trust block.
    #[error("Verification failed for {repository}:\n  {}", errors.join("\n  "))]
    VerificationFailed {
        repository: String,
        errors: Vec<String>,
    },

    /// An installer cannot proceed with the repository it was given.
    #[error("Installer {installer} error: {message}")]
    Installer { installer: String, message: String },

    /// The OS keyring rejected a read or write.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Reading the interactive prompt failed.
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// An HTTP request failed to complete.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Exit code the process should terminate with, if this error is a
    /// fatal command failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
