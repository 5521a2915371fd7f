//! OS package installer.
//!
//! Builds and installs a native package from packaging files kept in the
//! repository. The format is picked from what the checkout contains and
//! which build tool this host has, so a repository carrying both a
//! PKGBUILD and `debian/` installs with whichever the distribution uses.

use super::{capability, Capability, Installer, Layer, ToolLocator};
use crate::context::RepoContext;
use crate::error::{Error, Result};
use crate::runner::{CommandRunner, CommandSpec};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

/// Native packaging formats, in detection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageFormat {
    /// `PKGBUILD`, built with `makepkg`.
    ArchPkgbuild,
    /// `debian/control`, built with `dpkg-buildpackage`. Holds the binary
    /// package names it declares.
    DebianControl(Vec<String>),
    /// A top-level `*.spec`, built with `rpmbuild`.
    RpmSpec(String),
}

impl PackageFormat {
    fn build_tool(&self) -> &'static str {
        match self {
            PackageFormat::ArchPkgbuild => "makepkg",
            PackageFormat::DebianControl(_) => "dpkg-buildpackage",
            PackageFormat::RpmSpec(_) => "rpmbuild",
        }
    }
}

pub struct OsPackageInstaller {
    tools: Box<dyn ToolLocator>,
}

impl OsPackageInstaller {
    pub fn new(tools: Box<dyn ToolLocator>) -> Self {
        Self { tools }
    }

    /// The first packaging format present in `repo_dir` whose build tool
    /// is installed.
    pub fn detect(&self, repo_dir: &Path) -> Option<PackageFormat> {
        let mut present = Vec::new();
        if repo_dir.join("PKGBUILD").is_file() {
            present.push(PackageFormat::ArchPkgbuild);
        }
        if let Ok(control) = std::fs::read_to_string(repo_dir.join("debian").join("control")) {
            let packages = debian_packages(&control);
            if !packages.is_empty() {
                present.push(PackageFormat::DebianControl(packages));
            }
        }
        if let Some(spec) = capability::spec_files(repo_dir).first() {
            if let Some(name) = spec.file_name() {
                present.push(PackageFormat::RpmSpec(name.to_string_lossy().into_owned()));
            }
        }
        present
            .into_iter()
            .find(|format| self.tools.has(format.build_tool()))
    }

    fn privileged(&self, command: &str) -> String {
        if self.tools.has("sudo") {
            format!("sudo {}", command)
        } else {
            command.to_string()
        }
    }

    /// Commands that build and install `format`, in order.
    pub fn commands(&self, format: &PackageFormat) -> Vec<CommandSpec> {
        match format {
            PackageFormat::ArchPkgbuild => {
                vec![CommandSpec::args(["makepkg", "-si", "--noconfirm"])]
            }
            PackageFormat::DebianControl(packages) => {
                // dpkg-buildpackage writes into the parent directory, which
                // other checkouts of the same account share.
                let debs: Vec<String> = packages
                    .iter()
                    .map(|p| format!("../{}_*.deb", p))
                    .collect();
                let install = format!("apt install -y {}", debs.join(" "));
                vec![
                    CommandSpec::args(["dpkg-buildpackage", "-us", "-uc", "-b"]),
                    CommandSpec::shell(self.privileged(&install)),
                ]
            }
            PackageFormat::RpmSpec(spec) => vec![
                CommandSpec::args([
                    "rpmbuild",
                    "-bb",
                    "--build-in-place",
                    "--define",
                    "_rpmdir dist",
                    spec.as_str(),
                ]),
                CommandSpec::shell(self.privileged("dnf install -y dist/*/*.rpm")),
            ],
        }
    }
}

/// Binary package names declared in a `debian/control` file, falling back
/// to the source package name when no `Package:` stanza is present.
fn debian_packages(control: &str) -> Vec<String> {
    let field = |name: &str| -> Vec<String> {
        let Ok(re) = Regex::new(&format!(r"(?m)^{}:[ \t]*(\S+)", name)) else {
            return Vec::new();
        };
        re.captures_iter(control).map(|c| c[1].to_string()).collect()
    };
    let mut packages = field("Package");
    if packages.is_empty() {
        packages = field("Source");
    }
    packages.dedup();
    packages
}

impl Installer for OsPackageInstaller {
    fn name(&self) -> &'static str {
        "os-packages"
    }

    fn layer(&self) -> Layer {
        Layer::OsPackages
    }

    fn supports(&self, ctx: &RepoContext) -> bool {
        self.detect(&ctx.repo_dir).is_some()
    }

    fn discover_capabilities(&self, ctx: &RepoContext) -> BTreeSet<Capability> {
        capability::discover(Layer::OsPackages, &ctx.repo_dir)
    }

    fn run(&self, ctx: &RepoContext, runner: &CommandRunner) -> Result<()> {
        let format = self.detect(&ctx.repo_dir).ok_or_else(|| Error::Installer {
            installer: self.name().to_string(),
            message: format!(
                "no buildable packaging found in {}",
                ctx.repo_dir.display()
            ),
        })?;
        log::info!("{}: building {:?} package", ctx.identifier, format);
        for command in self.commands(&format) {
            runner.run(&command, &ctx.repo_dir, ctx.preview, false)?;
        }
        Ok(())
    }
}
