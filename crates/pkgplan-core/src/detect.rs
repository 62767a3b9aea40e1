//! Installed-state detection.

use crate::probe::timeout_for;
use crate::shell::CommandRunner;
use pkgplan_schema::{render_pattern, Detection, Package, PackageId, Source, SourceName};
use rayon::prelude::*;
use regex::RegexBuilder;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Output of every list command, captured once per run.
///
/// `None` records a list command that failed; lookups against it report
/// "not installed" and the command is not retried.
#[derive(Debug, Clone, Default)]
pub struct ListCache {
    outputs: BTreeMap<SourceName, Option<String>>,
}

impl ListCache {
    /// Run the list command of every list-matching source concurrently.
    ///
    /// Returns once all commands have finished, so resolution never observes
    /// a partially built cache.
    pub fn populate<'a>(
        sources: impl IntoIterator<Item = &'a Source>,
        shell: &dyn CommandRunner,
    ) -> Self {
        let listed: Vec<(&Source, &str)> = sources
            .into_iter()
            .filter_map(|s| match &s.detection {
                Detection::ListMatch { list_cmd, .. } => Some((s, list_cmd.as_str())),
                _ => None,
            })
            .collect();

        let outputs = listed
            .par_iter()
            .map(|(source, list_cmd)| {
                let output = match shell.capture(list_cmd, timeout_for(source)) {
                    Ok(out) => Some(out),
                    Err(e) => {
                        warn!("list command for {} failed: {e}", source.name);
                        None
                    }
                };
                (source.name.clone(), output)
            })
            .collect();
        Self { outputs }
    }

    /// Cached output for `source`; `None` if it failed or was never listed.
    pub fn output(&self, source: &str) -> Option<&str> {
        self.outputs.get(source).and_then(Option::as_deref)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.outputs.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Whether `package` is already installed through `source` under `id`.
pub fn is_installed(
    package: &Package,
    id: &PackageId,
    source: &Source,
    cache: &ListCache,
    shell: &dyn CommandRunner,
) -> bool {
    match &source.detection {
        Detection::ListMatch { pattern, .. } => {
            let Some(output) = cache.output(&source.name) else {
                return false;
            };
            match RegexBuilder::new(&render_pattern(pattern, id))
                .multi_line(true)
                .build()
            {
                Ok(re) => re.is_match(output),
                Err(e) => {
                    warn!("pattern for {} does not compile for {id}: {e}", source.name);
                    false
                }
            }
        }
        Detection::Binary => shell.has_binary(package.binary_for_id(id)),
        Detection::Command { check } => {
            let line = check.render(id);
            match shell.run_quiet(&line, timeout_for(source)) {
                Ok(()) => true,
                Err(e) => {
                    debug!("check for {} via {}: {e}", package.name, source.name);
                    false
                }
            }
        }
        Detection::DefaultBinary => shell.has_binary(package.fallback_binary(id)),
    }
}
