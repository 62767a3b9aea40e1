//! Installer for the legacy `tools.toml` lists.
//!
//! Each group maps to one toolchain command, executed directly rather than
//! through a shell, so entries such as `black[jupyter]` need no quoting.
//! Groups whose toolchain is not on PATH are skipped with a warning instead of
//! failing the run.

use crate::concurrency::shutdown_requested;
use crate::installer::{
    run_with_retries, InstallObserver, InstallOptions, InstallReport, InstallResult,
    InstallStatus,
};
use crate::shell::CommandRunner;
use pkgplan_schema::{PackageId, PackageName, SourceName, ToolsManifest};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    Cargo,
    Go,
    Python,
}

impl Toolchain {
    pub const ALL: [Self; 3] = [Self::Cargo, Self::Go, Self::Python];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Go => "go",
            Self::Python => "python",
        }
    }

    /// Executable that must be on PATH for the group to install.
    pub fn binary(self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Go => "go",
            Self::Python => "uv",
        }
    }

    fn entries(self, manifest: &ToolsManifest) -> &[String] {
        match self {
            Self::Cargo => &manifest.cargo.packages,
            Self::Go => &manifest.go.packages,
            Self::Python => &manifest.python.tools,
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolSelection {
    pub cargo: bool,
    pub go: bool,
    pub python: bool,
}

impl ToolSelection {
    pub fn all() -> Self {
        Self {
            cargo: true,
            go: true,
            python: true,
        }
    }

    pub fn is_empty(self) -> bool {
        !(self.cargo || self.go || self.python)
    }

    pub fn includes(self, toolchain: Toolchain) -> bool {
        match toolchain {
            Toolchain::Cargo => self.cargo,
            Toolchain::Go => self.go,
            Toolchain::Python => self.python,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInstall {
    pub toolchain: Toolchain,
    pub name: String,
    pub argv: Vec<String>,
    /// `argv` joined with spaces, for display.
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolPlan {
    pub installs: Vec<ToolInstall>,
    /// Selected, non-empty groups whose toolchain binary was not found.
    pub missing_toolchains: Vec<Toolchain>,
}

impl ToolPlan {
    pub fn group(&self, toolchain: Toolchain) -> Vec<&ToolInstall> {
        self.installs
            .iter()
            .filter(|i| i.toolchain == toolchain)
            .collect()
    }
}

fn tool_argv(toolchain: Toolchain, name: &str, binstall: bool) -> Vec<String> {
    let (prefix, target): (&[&str], String) = match toolchain {
        Toolchain::Cargo if binstall => (
            &["cargo", "binstall", "--force", "--no-confirm", "--locked"],
            name.to_owned(),
        ),
        Toolchain::Cargo => (&["cargo", "install", "--locked"], name.to_owned()),
        Toolchain::Go => (&["go", "install"], format!("{name}@latest")),
        Toolchain::Python => (&["uv", "tool", "install"], name.to_owned()),
    };
    prefix
        .iter()
        .map(|s| (*s).to_owned())
        .chain(std::iter::once(target))
        .collect()
}

/// Build install commands for every selected group, in cargo, go, python order.
pub fn plan_tools(
    manifest: &ToolsManifest,
    selection: ToolSelection,
    shell: &dyn CommandRunner,
) -> ToolPlan {
    let mut plan = ToolPlan::default();
    for toolchain in Toolchain::ALL {
        if !selection.includes(toolchain) {
            continue;
        }
        let entries = toolchain.entries(manifest);
        if entries.is_empty() {
            info!("no {toolchain} tools listed");
            continue;
        }
        if !shell.has_binary(toolchain.binary()) {
            warn!(
                "{} not found, skipping {} {toolchain} tools",
                toolchain.binary(),
                entries.len()
            );
            plan.missing_toolchains.push(toolchain);
            continue;
        }
        let binstall = toolchain == Toolchain::Cargo && shell.has_binary("cargo-binstall");
        plan.installs.extend(entries.iter().map(|name| {
            let argv = tool_argv(toolchain, name, binstall);
            ToolInstall {
                toolchain,
                name: name.clone(),
                command: argv.join(" "),
                argv,
            }
        }));
    }
    plan
}

/// Run every planned tool install sequentially, best effort.
pub fn install_tools(
    plan: &ToolPlan,
    shell: &dyn CommandRunner,
    options: &InstallOptions,
    observer: &mut dyn InstallObserver,
) -> InstallReport {
    let mut report = InstallReport::default();
    for toolchain in Toolchain::ALL {
        let group = plan.group(toolchain);
        if group.is_empty() {
            continue;
        }
        let source = SourceName::new(toolchain.as_str());
        observer.group_started(&source, group.len());
        for install in group {
            let mut result = InstallResult {
                package: PackageName::new(install.name.clone()),
                source: source.clone(),
                package_id: PackageId::new(install.name.clone()),
                command: install.command.clone(),
                attempts: 0,
                status: InstallStatus::NotAttempted,
            };
            if report.interrupted || shutdown_requested() {
                report.interrupted = true;
                report.results.push(result);
                continue;
            }
            observer.install_started(&result.package, &result.command);
            let (attempts, status) = run_with_retries(
                || shell.run_program(&install.argv, &options.env, None),
                options.retries,
                shutdown_requested,
            );
            result.attempts = attempts;
            result.status = status;
            if let InstallStatus::Failed { error } = &result.status {
                warn!("failed to install {}: {error}", install.name);
            }
            observer.install_finished(&result);
            report.results.push(result);
        }
    }
    report
}
