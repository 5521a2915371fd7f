//! # Repository Verification
//!
//! Compares a checkout against the trust metadata pinned in its
//! configuration record.
//!
//! Two error categories are kept apart:
//!
//! - **Environment-fatal**: [`GitError::NotARepository`] means the checkout
//!   is missing. It is returned as `Err` and never folded into the outcome.
//! - **Verification failure**: any other git error, a commit mismatch, or an
//!   unaccepted signing key. These are collected into
//!   [`VerificationOutcome::errors`] and set `ok` to false.
//!
//! Repositories without a `verified` block are checked best-effort only:
//! commit and key are read when possible and nothing can fail.

use crate::config::RepositoryRecord;
use crate::error::GitError;
use crate::git::GitQueries;
use std::path::Path;

/// Which commit the trust checks apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// The local HEAD.
    Local,
    /// The remote's HEAD, before pulling it.
    Pull,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationOutcome {
    pub ok: bool,
    pub errors: Vec<String>,
    pub commit: String,
    pub signing_key: String,
}

/// Check `repo_dir` against the trust block of `repo`.
pub fn verify_repository(
    repo: &RepositoryRecord,
    repo_dir: &Path,
    mode: VerifyMode,
    git: &dyn GitQueries,
) -> Result<VerificationOutcome, GitError> {
    let Some(trust) = repo.verified.as_ref().filter(|_| repo.has_trust_checks()) else {
        return Ok(best_effort(repo_dir, git));
    };

    let mut outcome = VerificationOutcome {
        ok: true,
        ..Default::default()
    };

    let commit = match mode {
        VerifyMode::Local => git.head_commit(repo_dir),
        VerifyMode::Pull => git.remote_head_commit(repo_dir),
    };
    match commit {
        Ok(commit) => outcome.commit = commit,
        Err(e @ GitError::NotARepository { .. }) => return Err(e),
        Err(e) => outcome.errors.push(format!("Could not determine commit: {}", e)),
    }

    if let Some(expected) = trust.pinned_commit() {
        if outcome.commit != expected {
            outcome.errors.push(format!(
                "Expected commit: {}, found: {}",
                expected, outcome.commit
            ));
        }
    }

    if let Some(keys) = trust.pinned_keys() {
        let rev = match mode {
            VerifyMode::Local => "HEAD",
            VerifyMode::Pull if outcome.commit.is_empty() => "FETCH_HEAD",
            VerifyMode::Pull => outcome.commit.as_str(),
        };
        match git.signing_key(repo_dir, rev) {
            Ok(key) => {
                outcome.signing_key = key.unwrap_or_default();
                if !keys.iter().any(|k| key_matches(k, &outcome.signing_key)) {
                    let found = if outcome.signing_key.is_empty() {
                        "none"
                    } else {
                        outcome.signing_key.as_str()
                    };
                    outcome.errors.push(format!(
                        "Expected one of signing keys: {}, found: {}",
                        keys.join(", "),
                        found
                    ));
                }
            }
            Err(e @ GitError::NotARepository { .. }) => return Err(e),
            Err(e) => outcome
                .errors
                .push(format!("Could not read signing key: {}", e)),
        }
    }

    outcome.ok = outcome.errors.is_empty();
    Ok(outcome)
}

fn best_effort(repo_dir: &Path, git: &dyn GitQueries) -> VerificationOutcome {
    let commit = git.head_commit(repo_dir).unwrap_or_default();
    let signing_key = git
        .signing_key(repo_dir, "HEAD")
        .ok()
        .flatten()
        .unwrap_or_default();
    VerificationOutcome {
        ok: true,
        errors: Vec::new(),
        commit,
        signing_key,
    }
}

// Git reports the long key id; configs often pin the full fingerprint.
fn key_matches(pinned: &str, actual: &str) -> bool {
    if actual.is_empty() {
        return false;
    }
    let pinned = pinned.replace(' ', "").to_uppercase();
    let actual = actual.to_uppercase();
    pinned == actual || pinned.ends_with(&actual) || actual.ends_with(&pinned)
}
