//! Capability discovery.
//!
//! Each layer inspects the repository's own build files to say what its
//! installer would provide. The same capability can be discovered at
//! several layers (a PKGBUILD that runs `make install` and a Makefile both
//! provide `make-install`); the pipeline then runs only the highest layer.

use super::{Capability, Layer};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

struct Matcher {
    layer: Layer,
    capability: &'static str,
    probe: fn(&Path) -> bool,
}

const MATCHERS: &[Matcher] = &[
    Matcher {
        layer: Layer::OsPackages,
        capability: Capability::CLI,
        probe: has_native_packaging,
    },
    Matcher {
        layer: Layer::OsPackages,
        capability: Capability::PYTHON_RUNTIME,
        probe: packaging_mentions_python,
    },
    Matcher {
        layer: Layer::OsPackages,
        capability: Capability::MAKE_INSTALL,
        probe: packaging_runs_make_install,
    },
    Matcher {
        layer: Layer::Nix,
        capability: Capability::NIX_FLAKE,
        probe: has_flake,
    },
    Matcher {
        layer: Layer::Nix,
        capability: Capability::CLI,
        probe: flake_declares_apps,
    },
    Matcher {
        layer: Layer::Nix,
        capability: Capability::PYTHON_RUNTIME,
        probe: flake_mentions_python,
    },
    Matcher {
        layer: Layer::Nix,
        capability: Capability::MAKE_INSTALL,
        probe: flake_runs_make_install,
    },
    Matcher {
        layer: Layer::Python,
        capability: Capability::PYTHON_RUNTIME,
        probe: has_python_project,
    },
    Matcher {
        layer: Layer::Python,
        capability: Capability::CLI,
        probe: python_declares_scripts,
    },
    Matcher {
        layer: Layer::Makefile,
        capability: Capability::MAKE_INSTALL,
        probe: makefile_has_install_target,
    },
];

/// True when the checkout carries a PKGBUILD, `debian/` packaging or a
/// top-level `*.spec`.
pub fn has_native_packaging(dir: &Path) -> bool {
    packaging_text(dir).is_some()
}

fn packaging_mentions_python(dir: &Path) -> bool {
    packaging_text(dir).is_some_and(|t| t.contains("python"))
}

fn packaging_runs_make_install(dir: &Path) -> bool {
    packaging_text(dir).is_some_and(|t| mentions_make_install(&t))
}

fn has_flake(dir: &Path) -> bool {
    dir.join("flake.nix").is_file()
}

fn flake_declares_apps(dir: &Path) -> bool {
    flake_text(dir).is_some_and(|t| t.contains("apps") || t.contains("mainprogram"))
}

fn flake_mentions_python(dir: &Path) -> bool {
    flake_text(dir).is_some_and(|t| t.contains("python"))
}

fn flake_runs_make_install(dir: &Path) -> bool {
    flake_text(dir).is_some_and(|t| mentions_make_install(&t))
}

fn has_python_project(dir: &Path) -> bool {
    dir.join("pyproject.toml").is_file() || dir.join("setup.py").is_file()
}

/// Capabilities `layer` would provide for the checkout in `repo_dir`.
pub fn discover(layer: Layer, repo_dir: &Path) -> BTreeSet<Capability> {
    MATCHERS
        .iter()
        .filter(|m| m.layer == layer && (m.probe)(repo_dir))
        .map(|m| Capability::new(m.capability))
        .collect()
}

/// `*.spec` files at the top of the checkout.
pub fn spec_files(repo_dir: &Path) -> Vec<PathBuf> {
    let pattern = repo_dir.join("*.spec");
    let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
    files.sort();
    files
}

/// Lowercased contents of every OS packaging file, or `None` when the
/// repository has none.
fn packaging_text(repo_dir: &Path) -> Option<String> {
    let mut files = vec![
        repo_dir.join("PKGBUILD"),
        repo_dir.join("debian").join("control"),
        repo_dir.join("debian").join("rules"),
    ];
    files.extend(spec_files(repo_dir));

    let texts: Vec<String> = files
        .iter()
        .filter_map(|f| std::fs::read_to_string(f).ok())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n").to_lowercase())
    }
}

fn flake_text(repo_dir: &Path) -> Option<String> {
    std::fs::read_to_string(repo_dir.join("flake.nix"))
        .ok()
        .map(|t| t.to_lowercase())
}

fn mentions_make_install(text: &str) -> bool {
    text.contains("make install") || text.contains("make destdir") || text.contains("installflags")
}

/// True when a Makefile in `repo_dir` defines an `install` target.
pub fn makefile_has_install_target(repo_dir: &Path) -> bool {
    let Ok(target) = Regex::new(r"(?m)^install\s*:([^=]|$)") else {
        return false;
    };
    ["GNUmakefile", "makefile", "Makefile"]
        .iter()
        .filter_map(|name| std::fs::read_to_string(repo_dir.join(name)).ok())
        .any(|text| target.is_match(&text))
}

/// True when the Python project declares console entry points.
fn python_declares_scripts(repo_dir: &Path) -> bool {
    if let Ok(text) = std::fs::read_to_string(repo_dir.join("pyproject.toml")) {
        if let Ok(pyproject) = toml::from_str::<toml::Value>(&text) {
            let non_empty = |v: Option<&toml::Value>| {
                v.and_then(|s| s.as_table()).is_some_and(|t| !t.is_empty())
            };
            let project_scripts = pyproject.get("project").and_then(|p| p.get("scripts"));
            let poetry_scripts = pyproject
                .get("tool")
                .and_then(|t| t.get("poetry"))
                .and_then(|p| p.get("scripts"));
            if non_empty(project_scripts) || non_empty(poetry_scripts) {
                return true;
            }
        }
    }
    std::fs::read_to_string(repo_dir.join("setup.py"))
        .is_ok_and(|text| text.contains("console_scripts"))
}
