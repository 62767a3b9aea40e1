use super::{colorize_availability, fail_mark, json_pretty, load, ok_mark, Output, EXIT_SUCCESS};
use pkgplan_core::{probe_sources, PlanRequest, Planner, SystemShell};
use pkgplan_schema::HostOs;
use std::path::Path;

pub fn run(manifest_path: &Path, profile: &str, output: Output) -> Result<u8, String> {
    let manifest = load(manifest_path)?;
    let shell = SystemShell::new();
    let request = PlanRequest::new(profile, HostOs::current());
    let preference = Planner::new(&manifest, &shell)
        .preference(&request)
        .map_err(|e| e.to_string())?;
    let availability = probe_sources(&preference, &manifest.sources, &shell);

    let rows: Vec<_> = availability
        .probes()
        .iter()
        .filter_map(|probe| manifest.source(&probe.source).map(|s| (probe, s)))
        .collect();

    if output.json {
        let entries: Vec<serde_json::Value> = rows
            .iter()
            .map(|(probe, source)| {
                serde_json::json!({
                    "source": probe.source,
                    "available": probe.available,
                    "detection": source.detection,
                    "description": source.description,
                })
            })
            .collect();
        println!("{}", json_pretty(&entries)?);
        return Ok(EXIT_SUCCESS);
    }

    for (rank, (probe, source)) in rows.iter().enumerate() {
        let mark = if probe.available { ok_mark() } else { fail_mark() };
        println!(
            "{mark} {}. {} [{}] {}",
            rank + 1,
            probe.source,
            source.detection.kind(),
            colorize_availability(probe.available)
        );
        if output.verbose {
            if let Some(desc) = &source.description {
                println!("      {desc}");
            }
            println!("      install: {}", source.install);
        }
    }
    Ok(EXIT_SUCCESS)
}
