//! # Command Runner
//!
//! Every external command `pkgmgr` executes goes through [`CommandRunner`].
//! The runner prints what it is about to do, honours preview mode, captures
//! output into a [`RunResult`], and turns a non-zero exit into
//! [`Error::CommandFailed`] unless the caller allowed failure.
//!
//! The runner never terminates the process itself. The binary's `main`
//! inspects the error chain and exits with the child's code.
//!
//! Spawning is delegated to a [`ProcessSpawner`], so tests can observe or
//! replace process creation without touching the system.

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;
use std::process::Command;

/// Structured outcome of an external command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunResult {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    /// Synthetic success with empty output.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Result with the given exit code and output.
    pub fn new(returncode: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            returncode,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.returncode == 0
    }

    /// Stdout followed by stderr, for text classification.
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// How the command line is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// A single string interpreted by `sh -c`.
    Shell(String),
    /// An argument vector executed directly.
    Args(Vec<String>),
}

/// A command plus environment overrides. Everything not overridden is
/// inherited from the parent process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub line: CommandLine,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            line: CommandLine::Shell(command.into()),
            env: Vec::new(),
        }
    }

    pub fn args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            line: CommandLine::Args(args.into_iter().map(Into::into).collect()),
            env: Vec::new(),
        }
    }

    /// Adds an environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.line {
            CommandLine::Shell(command) => write!(f, "{}", command),
            CommandLine::Args(args) => {
                let rendered: Vec<String> = args
                    .iter()
                    .map(|arg| {
                        if arg.is_empty() || arg.contains(char::is_whitespace) {
                            format!("'{}'", arg.replace('\'', r"'\''"))
                        } else {
                            arg.clone()
                        }
                    })
                    .collect();
                write!(f, "{}", rendered.join(" "))
            }
        }
    }
}

/// Process primitive used by the runner.
pub trait ProcessSpawner: Send + Sync {
    /// Run `command` in `cwd` to completion, capturing its output.
    fn spawn(&self, command: &CommandSpec, cwd: &Path) -> std::io::Result<RunResult>;
}

/// Spawns real processes with `std::process::Command`.
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, command: &CommandSpec, cwd: &Path) -> std::io::Result<RunResult> {
        let mut process = match &command.line {
            CommandLine::Shell(line) => {
                let mut process = Command::new("sh");
                process.arg("-c").arg(line);
                process
            }
            CommandLine::Args(args) => {
                let Some((program, rest)) = args.split_first() else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "empty argument vector",
                    ));
                };
                let mut process = Command::new(program);
                process.args(rest);
                process
            }
        };
        process.current_dir(cwd);
        for (key, value) in &command.env {
            process.env(key, value);
        }

        let output = process.output()?;
        Ok(RunResult {
            // Killed by a signal: no exit code.
            returncode: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Executes commands with preview and fatal-by-default semantics.
pub struct CommandRunner {
    spawner: Box<dyn ProcessSpawner>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner {
    /// Runner that spawns real processes.
    pub fn new() -> Self {
        Self {
            spawner: Box::new(SystemSpawner),
        }
    }

    /// Runner with a custom process primitive.
    pub fn with_spawner(spawner: Box<dyn ProcessSpawner>) -> Self {
        Self { spawner }
    }

    /// Run `command` in `cwd`.
    ///
    /// In preview mode the command is only printed and a synthetic success
    /// is returned. Otherwise a non-zero exit is returned as
    /// `Error::CommandFailed` unless `allow_failure` is set, in which case
    /// the failing result is handed back for inspection.
    pub fn run(
        &self,
        command: &CommandSpec,
        cwd: &Path,
        preview: bool,
        allow_failure: bool,
    ) -> Result<RunResult> {
        if preview {
            println!("[preview] {} (in {})", command, cwd.display());
            return Ok(RunResult::ok());
        }

        println!("→ {} (in {})", command, cwd.display());
        let result = self.spawner.spawn(command, cwd)?;
        log::debug!(
            "`{}` exited with {} ({} bytes stdout, {} bytes stderr)",
            command,
            result.returncode,
            result.stdout.len(),
            result.stderr.len()
        );

        if !result.success() && !allow_failure {
            eprintln!(
                "Command `{}` failed in {} with exit code {}",
                command,
                cwd.display(),
                result.returncode
            );
            return Err(Error::CommandFailed {
                command: command.to_string(),
                code: result.returncode,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }
}
