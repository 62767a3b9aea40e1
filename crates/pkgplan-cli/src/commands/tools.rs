use super::report::ConsoleObserver;
use super::{json_pretty, warn_mark, Output, EXIT_FAILURE, EXIT_SUCCESS};
use pkgplan_core::{
    github_token, install_env, install_tools, plan_tools, InstallObserver, InstallOptions,
    SilentObserver, SystemShell, ToolSelection,
};
use pkgplan_schema::parse_tools_file;
use std::path::Path;

pub fn run(
    tools_path: &Path,
    selection: ToolSelection,
    retries: u32,
    use_token: bool,
    output: Output,
) -> Result<u8, String> {
    if selection.is_empty() {
        return Err("no tool group selected (use --cargo, --go, --python or --all)".to_owned());
    }
    let manifest = parse_tools_file(tools_path).map_err(|e| e.to_string())?;
    let shell = SystemShell::new();
    let plan = plan_tools(&manifest, selection, &shell);

    if !output.json {
        for toolchain in &plan.missing_toolchains {
            println!(
                "{} {} not found, skipping {toolchain} tools",
                warn_mark(),
                toolchain.binary()
            );
        }
    }

    let token = if use_token { github_token(&shell) } else { None };
    let options = InstallOptions {
        retries,
        env: install_env(token),
    };
    let mut console = ConsoleObserver::for_tools();
    let mut silent = SilentObserver;
    let observer: &mut dyn InstallObserver = if output.json {
        &mut silent
    } else {
        &mut console
    };
    let report = install_tools(&plan, &shell, &options, observer);

    if output.json {
        let payload = serde_json::json!({ "plan": plan, "install": report });
        println!("{}", json_pretty(&payload)?);
    } else {
        let failed: Vec<&str> = report.failures().map(|r| r.package.as_str()).collect();
        if failed.is_empty() {
            println!("\n✅ Done!");
        } else {
            eprintln!("\n{} Failed to install: {}", warn_mark(), failed.join(", "));
        }
    }

    if report.is_success() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILURE)
    }
}
