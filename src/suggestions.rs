//! # Error Suggestions
//!
//! Helpers for errors that tell the user what went wrong AND how to fix it.
//!
//! ```rust,ignore
//! use pkgmgr::suggestions;
//!
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

/// The configuration file does not exist.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create it with a 'repositories:' list\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set the PKGMGR_CONFIG environment variable",
        path = path.display()
    )
}

/// Identifiers on the command line that match no configured repository.
pub fn unknown_repositories(unknown: &[String], known: &[String]) -> anyhow::Error {
    let listing = if known.is_empty() {
        "hint: The configuration has no repositories yet".to_string()
    } else {
        format!("hint: Known repositories: {}", known.join(", "))
    };
    anyhow::anyhow!(
        "Unknown repository: {unknown}\n\n\
         {listing}\n\
         hint: Run 'pkgmgr list' to see identifiers and aliases",
        unknown = unknown.join(", ")
    )
}

/// A command that needs a selection was run without one.
pub fn nothing_selected() -> anyhow::Error {
    anyhow::anyhow!(
        "No repositories selected\n\n\
         hint: Name one or more repositories by identifier or alias\n\
         hint: Use --all to select every configured repository"
    )
}

/// Summary error after a multi-repository run.
pub fn repositories_failed(failed: &[String]) -> anyhow::Error {
    anyhow::anyhow!(
        "{count} repository(ies) failed: {names}\n\n\
         hint: Re-run with --log-level debug for details\n\
         hint: Use --preview to see the commands without running them",
        count = failed.len(),
        names = failed.join(", ")
    )
}
