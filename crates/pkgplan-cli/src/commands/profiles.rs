use super::{json_pretty, load, Output, EXIT_SUCCESS};
use console::Style;
use pkgplan_schema::{HostOs, SourceName};
use std::path::Path;

pub fn run(manifest_path: &Path, active: &str, output: Output) -> Result<u8, String> {
    let manifest = load(manifest_path)?;
    let os = HostOs::current();

    if output.json {
        let entries: Vec<serde_json::Value> = manifest
            .profiles
            .values()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "description": p.description,
                    "active": p.name == active,
                    "preference": p.preference_for(os),
                    "packages": manifest.packages_for(&p.name).len(),
                })
            })
            .collect();
        println!("{}", json_pretty(&entries)?);
        return Ok(EXIT_SUCCESS);
    }

    if manifest.profiles.is_empty() {
        println!("no profiles defined");
        return Ok(EXIT_SUCCESS);
    }

    for profile in manifest.profiles.values() {
        let marker = if profile.name == active { "*" } else { " " };
        let name = Style::new().bold().apply_to(&profile.name);
        let count = manifest.packages_for(&profile.name).len();
        match &profile.description {
            Some(desc) => println!("{marker} {name} ({count} packages) - {desc}"),
            None => println!("{marker} {name} ({count} packages)"),
        }
        match profile.preference_for(os) {
            Some(order) if !order.is_empty() => {
                let order: Vec<&str> = order.iter().map(SourceName::as_str).collect();
                println!("    {os}: {}", order.join(" > "));
            }
            _ => println!("    {os}: {}", Style::new().dim().apply_to("no preference")),
        }
    }
    Ok(EXIT_SUCCESS)
}
