use pkgplan_core::{
    InstallOptions, Installer, MockShell, Outcome, PlanRequest, Planner, SilentObserver,
    SkipReason,
};
use pkgplan_schema::{load_manifest, HostOs, NormalizedManifest, PackageId, SourceName};
use std::fs;
use std::path::{Path, PathBuf};

fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("packages.yaml");
    fs::write(&path, content).unwrap();
    path
}

fn dev_manifest(dir: &Path) -> NormalizedManifest {
    let path = write_manifest(
        dir,
        r#"
profiles:
  dev:
    description: development workstation
    source_preference:
      linux: [cargo, apt]
sources:
  cargo:
    available: command -v cargo
    install: cargo install --locked {pkg}
    check_cmd: cargo install --list
    check_grep: "^{pkg} "
  apt:
    available: command -v apt-get
    install: sudo apt-get install -y {pkg}
    check: dpkg -s {pkg}
  winget:
    available: where winget
    install: winget install {pkg}
packages:
  ripgrep:
    binary: rg
    profiles: [dev]
    sources:
      cargo: ripgrep
      apt: ripgrep
  bat:
    profiles: [dev]
    sources:
      cargo: bat
  fd:
    profiles: [dev]
    sources:
      cargo: fd-find
  powertoys:
    profiles: [dev]
    sources:
      winget: Microsoft.PowerToys
  docker:
    profiles: [dev]
    sources:
      apt: docker.io
  slack:
    profiles: [work]
    sources:
      apt: slack
"#,
    );
    load_manifest(path).unwrap()
}

fn dev_request() -> PlanRequest {
    PlanRequest::new("dev", HostOs::Linux)
}

// cargo available with an empty list, apt unavailable, rg not on PATH.
#[test]
fn not_installed_package_goes_to_first_preferred_source() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_output("cargo install --list", "bat v0.24.0:\n    bat\n");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();

    assert_eq!(
        plan.outcome_of("ripgrep"),
        Some(Outcome::ToInstall {
            source: SourceName::new("cargo"),
            package_id: PackageId::new("ripgrep"),
        })
    );
}

#[test]
fn listed_package_is_detected_via_cached_output() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_output("cargo install --list", "ripgrep v14.0.0:\n    rg\n");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();

    assert_eq!(
        plan.outcome_of("ripgrep"),
        Some(Outcome::Installed {
            reason: "detected via cargo".to_owned()
        })
    );
}

#[test]
fn source_outside_preference_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_success("where winget")
        .with_output("cargo install --list", "");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();

    assert_eq!(
        plan.outcome_of("powertoys"),
        Some(Outcome::Skipped {
            reason: SkipReason::NotInPreference
        })
    );
    // winget is not in the preference list, so it is never probed.
    assert_eq!(shell.call_count("where winget"), 0);
}

#[test]
fn unavailable_preferred_source_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_output("cargo install --list", "");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();

    assert_eq!(
        plan.outcome_of("docker"),
        Some(Outcome::Skipped {
            reason: SkipReason::NoAvailableSource
        })
    );
}

#[test]
fn list_command_runs_once_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_output("cargo install --list", "bat v0.24.0:\n    bat\n");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();

    // ripgrep, bat and fd all consult cargo's list.
    assert_eq!(plan.to_install.len(), 2);
    assert_eq!(plan.installed.len(), 1);
    assert_eq!(shell.call_count("cargo install --list"), 1);
    assert_eq!(shell.call_count("command -v cargo"), 1);
}

#[test]
fn packages_outside_the_profile_are_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_success("command -v apt-get")
        .with_output("cargo install --list", "");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();

    assert!(plan.outcome_of("slack").is_none());
    assert_eq!(plan.package_count(), 5);
}

#[test]
fn binary_on_path_wins_regardless_of_sources() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_output("cargo install --list", "")
        .with_binary("rg")
        .with_binary("powertoys");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();

    assert!(matches!(
        plan.outcome_of("ripgrep"),
        Some(Outcome::Installed { .. })
    ));
    assert!(matches!(
        plan.outcome_of("powertoys"),
        Some(Outcome::Installed { .. })
    ));
}

#[test]
fn dry_planning_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_success("command -v apt-get")
        .with_output("cargo install --list", "bat v0.24.0:\n")
        .with_success("dpkg -s docker.io");
    let planner = Planner::new(&m, &shell);
    let first = planner.plan(&dev_request()).unwrap();
    let second = planner.plan(&dev_request()).unwrap();
    assert_eq!(first, second);
    assert!(shell.installs().is_empty());
}

#[test]
fn plan_then_install_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let m = dev_manifest(dir.path());
    let shell = MockShell::new()
        .with_success("command -v cargo")
        .with_success("command -v apt-get")
        .with_output("cargo install --list", "")
        .with_failing_install("sudo apt-get install -y docker.io");
    let plan = Planner::new(&m, &shell).plan(&dev_request()).unwrap();
    let report = Installer::new(&m.sources, &shell, InstallOptions::default())
        .with_stop_check(|| false)
        .install(&plan, &mut SilentObserver);

    assert_eq!(
        shell.installs(),
        vec![
            "cargo install --locked bat",
            "cargo install --locked fd-find",
            "cargo install --locked ripgrep",
            "sudo apt-get install -y docker.io",
        ]
    );
    assert!(!report.is_success());
    assert_eq!(report.failures().count(), 1);
}
