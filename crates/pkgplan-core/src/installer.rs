//! Sequential, best-effort execution of a plan.
//!
//! Installs run one at a time, grouped by source in preference order. A
//! failure is recorded and the run moves on; nothing is rolled back. An
//! interrupt stops the run between packages and marks the remainder as not
//! attempted. A terminal Ctrl-C also reaches the running install command,
//! which then usually exits non-zero and is recorded as failed.

use crate::concurrency::shutdown_requested;
use crate::plan::Plan;
use crate::shell::{CommandRunner, ShellError};
use pkgplan_schema::{PackageId, PackageName, Source, SourceName};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Extra attempts after a failed install. Zero means a single attempt.
    pub retries: u32,
    /// Variables added to every install command's environment.
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum InstallStatus {
    Succeeded,
    Failed { error: String },
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    pub package: PackageName,
    pub source: SourceName,
    pub package_id: PackageId,
    pub command: String,
    pub attempts: u32,
    #[serde(flatten)]
    pub status: InstallStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub results: Vec<InstallResult>,
    pub interrupted: bool,
}

impl InstallReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &InstallResult> {
        self.results
            .iter()
            .filter(|r| r.status == InstallStatus::Succeeded)
    }

    /// Failed and not-attempted installs.
    pub fn failures(&self) -> impl Iterator<Item = &InstallResult> {
        self.results
            .iter()
            .filter(|r| r.status != InstallStatus::Succeeded)
    }

    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failures().next().is_none()
    }
}

/// Progress callbacks for rendering. Every method defaults to a no-op.
pub trait InstallObserver {
    fn group_started(&mut self, _source: &SourceName, _count: usize) {}
    fn install_started(&mut self, _package: &PackageName, _command: &str) {}
    fn install_finished(&mut self, _result: &InstallResult) {}
}

pub struct SilentObserver;

impl InstallObserver for SilentObserver {}

/// Call `attempt` up to `1 + retries` times, giving up early once `stop`
/// reports an interrupt. Returns the attempt count and the final status.
pub(crate) fn run_with_retries(
    mut attempt: impl FnMut() -> Result<(), ShellError>,
    retries: u32,
    stop: fn() -> bool,
) -> (u32, InstallStatus) {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt() {
            Ok(()) => return (attempts, InstallStatus::Succeeded),
            Err(e) => {
                if attempts > retries || stop() {
                    return (
                        attempts,
                        InstallStatus::Failed {
                            error: e.to_string(),
                        },
                    );
                }
                warn!("attempt {attempts} failed: {e}, retrying");
            }
        }
    }
}

pub struct Installer<'a> {
    sources: &'a BTreeMap<SourceName, Source>,
    shell: &'a dyn CommandRunner,
    options: InstallOptions,
    stop: fn() -> bool,
}

impl<'a> Installer<'a> {
    pub fn new(
        sources: &'a BTreeMap<SourceName, Source>,
        shell: &'a dyn CommandRunner,
        options: InstallOptions,
    ) -> Self {
        Self {
            sources,
            shell,
            options,
            stop: shutdown_requested,
        }
    }

    /// Replace the interrupt check, which defaults to the Ctrl-C flag.
    #[must_use]
    pub fn with_stop_check(mut self, stop: fn() -> bool) -> Self {
        self.stop = stop;
        self
    }

    pub fn install(&self, plan: &Plan, observer: &mut dyn InstallObserver) -> InstallReport {
        let mut report = InstallReport::default();
        for (source_name, group) in plan.by_source() {
            observer.group_started(source_name, group.len());
            let source = self.sources.get(source_name);
            for planned in group {
                let command = source
                    .map(|s| s.install.render(&planned.package_id))
                    .unwrap_or_default();
                let mut result = InstallResult {
                    package: planned.package.clone(),
                    source: planned.source.clone(),
                    package_id: planned.package_id.clone(),
                    command,
                    attempts: 0,
                    status: InstallStatus::NotAttempted,
                };

                if report.interrupted || (self.stop)() {
                    report.interrupted = true;
                    report.results.push(result);
                    continue;
                }

                match source {
                    Some(source) => {
                        info!("installing {} via {}", planned.package, source_name);
                        observer.install_started(&result.package, &result.command);
                        let (attempts, status) = run_with_retries(
                            || {
                                self.shell.run_inherited(
                                    &result.command,
                                    &self.options.env,
                                    source.timeout,
                                )
                            },
                            self.options.retries,
                            self.stop,
                        );
                        result.attempts = attempts;
                        result.status = status;
                    }
                    None => {
                        result.status = InstallStatus::Failed {
                            error: format!("unknown source: {source_name}"),
                        };
                    }
                }
                if let InstallStatus::Failed { error } = &result.status {
                    warn!("failed to install {}: {error}", result.package);
                }
                observer.install_finished(&result);
                report.results.push(result);
            }
        }
        report
    }
}
