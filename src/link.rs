//! Executable links.
//!
//! The resolved command of a repository is exposed as
//! `<bin_dir>/<identifier>`. The bin directory is shared by every
//! repository, so it is created on demand and an existing link is replaced
//! rather than treated as an error. Regular files are never overwritten.

use crate::command::ResolvedCommand;
use crate::context::RepoContext;
use crate::error::Result;
use crate::installers::Layer;
use std::path::{Path, PathBuf};

/// File name of the link for `identifier`. Identifiers of the form
/// `provider/account/name` are flattened.
pub fn link_file_name(identifier: &str) -> String {
    identifier.replace('/', "-")
}

/// Link `command` into the bin directory.
///
/// Returns the link path, or `None` when no link is needed (system
/// binaries, commands already in the bin directory) or possible.
pub fn create_link(ctx: &RepoContext, command: &ResolvedCommand) -> Result<Option<PathBuf>> {
    if command.layer == Some(Layer::OsPackages) {
        log::debug!("{} is a system binary, not linking", command.path.display());
        return Ok(None);
    }

    let link = ctx.bin_dir.join(link_file_name(&ctx.identifier));
    if command.path == link || command.path.parent() == Some(ctx.bin_dir.as_path()) {
        return Ok(None);
    }

    if ctx.preview {
        println!(
            "[preview] link {} -> {}",
            link.display(),
            command.path.display()
        );
        return Ok(Some(link));
    }

    std::fs::create_dir_all(&ctx.bin_dir)?;

    if let Ok(meta) = std::fs::symlink_metadata(&link) {
        if !meta.file_type().is_symlink() {
            log::warn!(
                "{} exists and is not a link, leaving it alone",
                link.display()
            );
            return Ok(None);
        }
        std::fs::remove_file(&link)?;
    }

    if command.path.starts_with(&ctx.repo_dir) {
        make_executable(&command.path)?;
    }
    symlink(&command.path, &link)?;
    log::info!("linked {} -> {}", link.display(), command.path.display());
    Ok(Some(link))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::fs::copy(target, link).map(|_| ())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if !path.is_file() {
        return Ok(());
    }
    let mut permissions = std::fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0o111 {
        permissions.set_mode(mode | 0o755);
        std::fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
