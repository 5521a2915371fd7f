//! Parsing `nix profile install` conflict failures.
//!
//! When a new element provides a file an installed one already provides,
//! nix refuses and suggests the fix:
//!
//! ```text
//! error: An existing package already provides the following file:
//!          /nix/store/...-tool-1.0/bin/tool
//!        ...
//!        To remove the existing package:
//!          nix profile remove tool
//! ```
//!
//! The entries named in those hints are what has to go before a retry.

use crate::error::{Error, Result};
use regex::Regex;

const REMOVE_HINT: &str = r#"nix profile remove\s+(?:'([^']+)'|"([^"]+)"|(\S+))"#;

/// True when `output` is a file-conflict failure.
pub fn is_conflict(output: &str) -> bool {
    output.contains("already provides the following file")
        || output.contains("conflicting file")
        || output.contains("nix profile remove")
}

/// Profile entries nix asks to remove, in order of appearance, without
/// duplicates.
pub fn conflicting_entries(output: &str) -> Result<Vec<String>> {
    let hint = Regex::new(REMOVE_HINT).map_err(Error::Regex)?;
    let mut entries: Vec<String> = Vec::new();
    for captures in hint.captures_iter(output) {
        let Some(entry) = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3))
        else {
            continue;
        };
        let entry = entry.as_str().trim_end_matches(['.', ',', ';', '`']);
        if !entry.is_empty() && !entries.iter().any(|e| e == entry) {
            entries.push(entry.to_string());
        }
    }
    Ok(entries)
}
