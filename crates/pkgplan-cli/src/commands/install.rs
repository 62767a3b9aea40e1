use super::report::{render_header, render_outcome, render_summary, ConsoleObserver};
use super::{json_pretty, load, spin_fail, spin_ok, spinner, Output, EXIT_FAILURE, EXIT_SUCCESS};
use pkgplan_core::{
    github_token, install_env, InstallObserver, InstallOptions, Installer, PlanRequest, Planner,
    SilentObserver, SystemShell,
};
use pkgplan_schema::HostOs;
use std::path::Path;

pub struct InstallArgs<'a> {
    pub profile: &'a str,
    pub source: Option<&'a str>,
    pub dry_run: bool,
    pub retries: u32,
    pub github_token: bool,
}

pub fn run(manifest_path: &Path, args: &InstallArgs<'_>, output: Output) -> Result<u8, String> {
    let manifest = load(manifest_path)?;
    let shell = SystemShell::new();
    let request = PlanRequest::new(args.profile, HostOs::current())
        .with_source_filter(args.source.map(str::to_owned));

    let pb = if output.json {
        None
    } else {
        Some(spinner("probing sources..."))
    };
    let plan = match Planner::new(&manifest, &shell).plan(&request) {
        Ok(plan) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("resolved {} packages", plan.package_count()));
            }
            plan
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "planning failed");
            }
            return Err(e.to_string());
        }
    };

    if !output.json {
        print!("{}", render_header(&plan));
        println!("{}", render_summary(&plan, output.verbose));
    }

    if plan.is_satisfied() || args.dry_run {
        if output.json {
            let payload = serde_json::json!({ "plan": plan, "install": null });
            println!("{}", json_pretty(&payload)?);
        } else if plan.is_satisfied() {
            println!("✅ Everything is installed!");
        }
        return Ok(EXIT_SUCCESS);
    }

    let token = if args.github_token {
        github_token(&shell)
    } else {
        None
    };
    let options = InstallOptions {
        retries: args.retries,
        env: install_env(token),
    };
    let installer = Installer::new(&manifest.sources, &shell, options);
    let mut console = ConsoleObserver::for_plan();
    let mut silent = SilentObserver;
    let observer: &mut dyn InstallObserver = if output.json {
        &mut silent
    } else {
        &mut console
    };
    let report = installer.install(&plan, observer);

    if output.json {
        let payload = serde_json::json!({ "plan": plan, "install": report });
        println!("{}", json_pretty(&payload)?);
    } else {
        print!("{}", render_outcome(&report));
    }

    if report.is_success() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
