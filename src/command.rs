//! # Command Resolution
//!
//! Finds the entry point that makes a repository runnable, if one already
//! exists, and works out which installer layer produced it. The pipeline
//! uses that layer to avoid re-installing through a lower-priority
//! mechanism what a higher one already provides.
//!
//! Candidates are checked in this order:
//!
//! 1. the `command` set in the repository record
//! 2. a system binary (`/usr/bin`, `/usr/local/bin`, `/bin`)
//! 3. the Nix profile (`~/.nix-profile/bin`)
//! 4. a user-level Python script (`~/.local/bin`)
//! 5. a repository-local `main.sh`, `main.py` or `main`
//!
//! Links in the bin directory are followed before classifying, so a link
//! `pkgmgr` created earlier does not count as a Python install.
//!
//! A system binary only counts as an OS package when the checkout has
//! native packaging. Anything else found there, such as a `make install`
//! into `/usr/local` or an unrelated tool with the same name, is not
//! attributed to the repository and is ignored.

use crate::config::expand_home;
use crate::context::RepoContext;
use crate::installers::{capability, Layer};
use std::path::{Path, PathBuf};

/// An entry point and the layer it came from, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub path: PathBuf,
    pub layer: Option<Layer>,
}

/// Looks up an existing entry point for a repository.
pub trait CommandResolver: Send + Sync {
    fn resolve(&self, ctx: &RepoContext) -> Option<ResolvedCommand>;
}

/// Directories the filesystem resolver searches.
#[derive(Debug, Clone)]
pub struct SearchRoots {
    pub home: PathBuf,
    pub system_dirs: Vec<PathBuf>,
    pub nix_store: PathBuf,
}

impl SearchRoots {
    pub fn system() -> Self {
        Self {
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root")),
            system_dirs: vec![
                PathBuf::from("/usr/bin"),
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/bin"),
            ],
            nix_store: PathBuf::from("/nix/store"),
        }
    }

    fn nix_profile_bin(&self) -> PathBuf {
        self.home.join(".nix-profile").join("bin")
    }

    fn user_bin(&self) -> PathBuf {
        self.home.join(".local").join("bin")
    }
}

/// [`CommandResolver`] that inspects the filesystem.
pub struct FilesystemResolver {
    roots: SearchRoots,
}

impl Default for FilesystemResolver {
    fn default() -> Self {
        Self::new(SearchRoots::system())
    }
}

impl FilesystemResolver {
    pub fn new(roots: SearchRoots) -> Self {
        Self { roots }
    }

    /// Which layer installed `path`, judged by where it really lives.
    pub fn classify(&self, path: &Path, ctx: &RepoContext) -> Option<Layer> {
        let real = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let roots = &self.roots;

        if real.starts_with(&roots.nix_store) || real.starts_with(roots.home.join(".nix-profile")) {
            return Some(Layer::Nix);
        }
        if real.starts_with(&ctx.repo_dir) {
            return None;
        }
        let in_venv = real
            .components()
            .any(|c| matches!(c.as_os_str().to_str(), Some("venv" | ".venv" | ".venvs")));
        if real.starts_with(roots.home.join(".local")) || in_venv {
            return Some(Layer::Python);
        }
        let in_system = roots.system_dirs.iter().any(|dir| real.starts_with(dir))
            || real.starts_with("/usr")
            || real.starts_with("/opt");
        if in_system && capability::has_native_packaging(&ctx.repo_dir) {
            return Some(Layer::OsPackages);
        }
        None
    }

    fn candidate_names(ctx: &RepoContext) -> Vec<String> {
        let mut names = vec![ctx.identifier.clone(), ctx.repo.repository.clone()];
        names.retain(|n| !n.contains('/'));
        names.dedup();
        names
    }
}

impl CommandResolver for FilesystemResolver {
    fn resolve(&self, ctx: &RepoContext) -> Option<ResolvedCommand> {
        if let Some(command) = ctx.repo.command.as_deref().filter(|c| !c.trim().is_empty()) {
            let path = expand_home(Path::new(command));
            return Some(ResolvedCommand {
                layer: self.classify(&path, ctx),
                path,
            });
        }

        let names = Self::candidate_names(ctx);
        let mut dirs: Vec<PathBuf> = self.roots.system_dirs.clone();
        dirs.push(self.roots.nix_profile_bin());
        dirs.push(self.roots.user_bin());

        for dir in &dirs {
            for name in &names {
                let candidate = dir.join(name);
                if !candidate.is_file() {
                    continue;
                }
                // Unattributed, or our own link into the checkout which the
                // repository-local lookup below finds anyway.
                let Some(layer) = self.classify(&candidate, ctx) else {
                    continue;
                };
                return Some(ResolvedCommand {
                    path: candidate,
                    layer: Some(layer),
                });
            }
        }

        ["main.sh", "main.py", "main"]
            .iter()
            .map(|name| ctx.repo_dir.join(name))
            .find(|path| path.is_file())
            .map(|path| ResolvedCommand { path, layer: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::context_in;
    use std::fs;
    use tempfile::TempDir;

    struct Sandbox {
        _temp: TempDir,
        root: PathBuf,
        resolver: FilesystemResolver,
        ctx: RepoContext,
    }

    fn sandbox() -> Sandbox {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        for dir in ["home", "usr/bin", "nix/store"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        let roots = SearchRoots {
            home: root.join("home"),
            system_dirs: vec![root.join("usr/bin")],
            nix_store: root.join("nix/store"),
        };
        let ctx = context_in(&root, "tool");
        Sandbox {
            _temp: temp,
            root,
            resolver: FilesystemResolver::new(roots),
            ctx,
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
    }

    #[test]
    fn test_nothing_found() {
        let sb = sandbox();
        assert_eq!(sb.resolver.resolve(&sb.ctx), None);
    }

    #[test]
    fn test_explicit_command_wins() {
        let mut sb = sandbox();
        let script = sb.ctx.repo_dir.join("run.sh");
        touch(&script);
        touch(&sb.root.join("usr/bin/tool"));
        sb.ctx.repo.command = Some(script.display().to_string());

        assert_eq!(
            sb.resolver.resolve(&sb.ctx),
            Some(ResolvedCommand {
                path: script,
                layer: None
            })
        );
    }

    #[test]
    fn test_system_binary_of_packaged_repository_is_os_layer() {
        let sb = sandbox();
        touch(&sb.ctx.repo_dir.join("PKGBUILD"));
        touch(&sb.root.join("usr/bin/tool"));

        let resolved = sb.resolver.resolve(&sb.ctx).unwrap();
        assert_eq!(resolved.layer, Some(Layer::OsPackages));
    }

    #[test]
    fn test_system_binary_without_packaging_is_ignored() {
        let sb = sandbox();
        touch(&sb.root.join("usr/bin/tool"));

        assert_eq!(
            sb.resolver.classify(&sb.root.join("usr/bin/tool"), &sb.ctx),
            None
        );
        assert_eq!(sb.resolver.resolve(&sb.ctx), None);
    }

    #[test]
    fn test_layered_install_beats_unattributed_system_binary() {
        let sb = sandbox();
        touch(&sb.root.join("usr/bin/tool"));
        touch(&sb.root.join("home/.local/bin/tool"));

        let resolved = sb.resolver.resolve(&sb.ctx).unwrap();
        assert_eq!(resolved.path, sb.root.join("home/.local/bin/tool"));
        assert_eq!(resolved.layer, Some(Layer::Python));
    }

    #[test]
    fn test_repository_entry_point_used_despite_system_binary() {
        let sb = sandbox();
        touch(&sb.root.join("usr/bin/tool"));
        touch(&sb.ctx.repo_dir.join("main.sh"));

        let resolved = sb.resolver.resolve(&sb.ctx).unwrap();
        assert!(resolved.path.ends_with("main.sh"));
        assert_eq!(resolved.layer, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_nix_profile_link_is_nix_layer() {
        let sb = sandbox();
        let store_bin = sb.root.join("nix/store/abc-tool/bin/tool");
        touch(&store_bin);
        let profile_bin = sb.root.join("home/.nix-profile/bin");
        fs::create_dir_all(&profile_bin).unwrap();
        std::os::unix::fs::symlink(&store_bin, profile_bin.join("tool")).unwrap();

        let resolved = sb.resolver.resolve(&sb.ctx).unwrap();
        assert_eq!(resolved.layer, Some(Layer::Nix));
        assert_eq!(resolved.path, profile_bin.join("tool"));
    }

    #[test]
    fn test_user_script_is_python_layer() {
        let sb = sandbox();
        touch(&sb.root.join("home/.local/bin/tool"));

        let resolved = sb.resolver.resolve(&sb.ctx).unwrap();
        assert_eq!(resolved.layer, Some(Layer::Python));
    }

    #[cfg(unix)]
    #[test]
    fn test_own_link_resolves_to_repository_script() {
        let sb = sandbox();
        let main = sb.ctx.repo_dir.join("main.py");
        touch(&main);
        let user_bin = sb.root.join("home/.local/bin");
        fs::create_dir_all(&user_bin).unwrap();
        std::os::unix::fs::symlink(&main, user_bin.join("tool")).unwrap();

        let resolved = sb.resolver.resolve(&sb.ctx).unwrap();
        assert_eq!(resolved.path, main);
        assert_eq!(resolved.layer, None);
    }

    #[test]
    fn test_repository_local_entry_point() {
        let sb = sandbox();
        touch(&sb.ctx.repo_dir.join("main.sh"));

        let resolved = sb.resolver.resolve(&sb.ctx).unwrap();
        assert!(resolved.path.ends_with("main.sh"));
        assert_eq!(resolved.layer, None);
    }
}
