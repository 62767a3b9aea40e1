//! Planning and installation engine for pkgplan.
//!
//! This crate ties together manifest data and the host system: the
//! `CommandRunner` seam over shell commands (`SystemShell`, `MockShell`),
//! parallel source availability probing, the per-run list cache and
//! installed-state checks, the package resolver, the `Planner` that turns a
//! profile into a `Plan`, and the best-effort `Installer` that executes it.
//! It also carries the legacy `tools.toml` installer and interrupt handling.

pub mod concurrency;
pub mod credentials;
pub mod detect;
pub mod installer;
pub mod mock;
pub mod plan;
pub mod planner;
pub mod probe;
pub mod resolver;
pub mod shell;
pub mod tools;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use credentials::{github_token, install_env, GITHUB_TOKEN_VAR};
pub use detect::{is_installed, ListCache};
pub use installer::{
    InstallObserver, InstallOptions, InstallReport, InstallResult, InstallStatus, Installer,
    SilentObserver,
};
pub use mock::MockShell;
pub use plan::{InstalledPackage, Plan, PlannedInstall, SkippedPackage};
pub use planner::{PlanRequest, Planner};
pub use probe::{probe_sources, Availability, SourceProbe};
pub use resolver::{Outcome, Resolution, ResolveContext, SkipReason};
pub use shell::{CommandRunner, ShellError, SystemShell, DEFAULT_PROBE_TIMEOUT};
pub use tools::{install_tools, plan_tools, ToolInstall, ToolPlan, ToolSelection, Toolchain};

use pkgplan_schema::{HostOs, ManifestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("unknown profile: {name} (available: {available})")]
    UnknownProfile { name: String, available: String },
    #[error("no source preferences for OS '{os}' in profile '{profile}'")]
    NoPreference { profile: String, os: HostOs },
    #[error("unknown source: {0}")]
    UnknownSource(String),
    #[error("no package sources available")]
    NoSourcesAvailable,
}
