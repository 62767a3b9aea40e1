pub mod completions;
pub mod install;
pub mod man_pages;
pub mod profiles;
pub mod report;
pub mod sources;
pub mod tools;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use pkgplan_schema::{load_manifest, NormalizedManifest};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Global output switches shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub verbose: bool,
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn load(path: &Path) -> Result<NormalizedManifest, String> {
    load_manifest(path).map_err(|e| e.to_string())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn plain_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn ok_mark() -> String {
    Style::new().green().apply_to("✓").to_string()
}

pub fn fail_mark() -> String {
    Style::new().red().apply_to("✗").to_string()
}

pub fn warn_mark() -> String {
    Style::new().yellow().apply_to("⚠").to_string()
}

pub fn colorize_availability(available: bool) -> String {
    if available {
        Style::new().green().apply_to("available").to_string()
    } else {
        Style::new().dim().apply_to("not available").to_string()
    }
}
