//! Human-readable rendering of plans and install progress.

use super::{colorize_availability, fail_mark, ok_mark, warn_mark};
use console::Style;
use pkgplan_core::{InstallObserver, InstallReport, InstallResult, InstallStatus, Plan};
use pkgplan_schema::{PackageName, SourceName};
use std::fmt::Write;

/// OS, profile, preference and probe results.
pub fn render_header(plan: &Plan) -> String {
    let mut out = String::new();
    let preference: Vec<&str> = plan.preference.iter().map(SourceName::as_str).collect();
    let _ = writeln!(out, "🖥  OS: {} | Profile: {}", plan.os, plan.profile);
    let _ = writeln!(out, "📋 Source preference: {}\n", preference.join(" > "));
    for probe in &plan.sources {
        let mark = if probe.available { ok_mark() } else { fail_mark() };
        let _ = writeln!(
            out,
            "  {mark} {} {}",
            probe.source,
            colorize_availability(probe.available)
        );
    }
    let available: Vec<&str> = plan.available_sources().map(SourceName::as_str).collect();
    let _ = writeln!(out, "\n🔍 Available sources: {}\n", available.join(", "));
    out
}

/// Counts per outcome, planned installs grouped by source, and skip reasons.
/// Detection reasons for installed packages are only listed when `verbose`.
pub fn render_summary(plan: &Plan, verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} Already installed: {}", ok_mark(), plan.installed.len());
    if verbose {
        for p in &plan.installed {
            let _ = writeln!(out, "    {}: {}", p.package, p.reason);
        }
    }
    let _ = writeln!(out, "📦 To install: {}", plan.to_install.len());
    for (source, group) in plan.by_source() {
        let _ = writeln!(out, "  [{source}]");
        for p in group {
            let _ = writeln!(out, "    {} ({})", p.package, p.package_id);
        }
    }
    if !plan.skipped.is_empty() {
        let _ = writeln!(out, "{} Skipped: {}", warn_mark(), plan.skipped.len());
        for p in &plan.skipped {
            let _ = writeln!(out, "    {}: {}", p.package, p.reason);
        }
    }
    out
}

/// Final lines after an install run.
pub fn render_outcome(report: &InstallReport) -> String {
    let mut out = String::new();
    let failures: Vec<&InstallResult> = report.failures().collect();
    if failures.is_empty() {
        let _ = writeln!(out, "\n✅ All packages installed!");
        return out;
    }
    if report.interrupted {
        let skipped = failures
            .iter()
            .filter(|r| r.status == InstallStatus::NotAttempted)
            .count();
        let _ = writeln!(out, "\n{} interrupted, {skipped} package(s) not attempted", warn_mark());
    }
    let _ = writeln!(
        out,
        "\n{} {} package(s) failed to install:",
        warn_mark(),
        failures.len()
    );
    for r in failures {
        let _ = writeln!(out, "    {} ({})", r.package, r.source);
    }
    out
}

/// Prints group headers, the command about to run and per-package results.
pub struct ConsoleObserver {
    heading: fn(&SourceName, usize) -> String,
}

impl ConsoleObserver {
    pub fn for_plan() -> Self {
        Self {
            heading: |source, count| format!("📦 Installing from {source} ({count} packages):\n"),
        }
    }

    pub fn for_tools() -> Self {
        Self {
            heading: |source, count| {
                let icon = match source.as_str() {
                    "cargo" => "🦀",
                    "go" => "🐹",
                    _ => "🐍",
                };
                format!("\n{icon} Installing {count} {source} tools...\n")
            },
        }
    }
}

impl InstallObserver for ConsoleObserver {
    fn group_started(&mut self, source: &SourceName, count: usize) {
        println!("{}", (self.heading)(source, count));
    }

    fn install_started(&mut self, package: &PackageName, command: &str) {
        println!("  [{package}]");
        println!("  {} {command}", Style::new().dim().apply_to("→"));
    }

    fn install_finished(&mut self, result: &InstallResult) {
        match &result.status {
            InstallStatus::Succeeded => println!("    {} Done\n", ok_mark()),
            InstallStatus::Failed { error } => println!("    {} Failed: {error}\n", fail_mark()),
            InstallStatus::NotAttempted => {}
        }
    }
}
