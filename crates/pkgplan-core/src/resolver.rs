use crate::detect::{is_installed, ListCache};
use crate::probe::Availability;
use crate::shell::CommandRunner;
use pkgplan_schema::{Package, PackageId, PackageName, Source, SourceName};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Installed { reason: String },
    ToInstall { source: SourceName, package_id: PackageId },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Some preferred source provides the package, but none of them is available.
    NoAvailableSource,
    /// None of the package's sources appear in the preference list.
    NotInPreference,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoAvailableSource => "no available source",
            Self::NotInPreference => "not in source preference",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub package: PackageName,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Everything resolution reads; nothing in it changes while packages resolve.
pub struct ResolveContext<'a> {
    pub preference: &'a [SourceName],
    pub availability: &'a Availability,
    pub sources: &'a BTreeMap<SourceName, Source>,
    pub cache: &'a ListCache,
    pub shell: &'a dyn CommandRunner,
}

impl ResolveContext<'_> {
    /// Classify one package.
    ///
    /// The package's default binary on PATH settles it as installed before
    /// any source is consulted. Otherwise candidates are the preferred
    /// sources that are available and carry an id for the package, in
    /// preference order: the package is installed if any candidate detects
    /// it, else the first candidate installs it.
    pub fn resolve(&self, package: &Package) -> Outcome {
        let binary = package.default_binary();
        if self.shell.has_binary(binary) {
            return Outcome::Installed {
                reason: format!("binary '{binary}' in PATH"),
            };
        }

        let candidates: Vec<(&Source, &PackageId)> = self
            .preference
            .iter()
            .filter(|name| self.availability.is_available(name))
            .filter_map(|name| Some((self.sources.get(name)?, package.sources.get(name)?)))
            .collect();

        for (source, id) in &candidates {
            if is_installed(package, id, source, self.cache, self.shell) {
                return Outcome::Installed {
                    reason: format!("detected via {}", source.name),
                };
            }
        }

        if let Some((source, id)) = candidates.first() {
            return Outcome::ToInstall {
                source: source.name.clone(),
                package_id: (*id).clone(),
            };
        }

        let preferred = package
            .sources
            .keys()
            .any(|name| self.preference.contains(name));
        Outcome::Skipped {
            reason: if preferred {
                SkipReason::NoAvailableSource
            } else {
                SkipReason::NotInPreference
            },
        }
    }

    /// Classify `packages` concurrently. Output order matches input order.
    pub fn resolve_all(&self, packages: &[&Package]) -> Vec<Resolution> {
        packages
            .par_iter()
            .map(|package| {
                let outcome = self.resolve(package);
                debug!("{}: {outcome:?}", package.name);
                Resolution {
                    package: package.name.clone(),
                    outcome,
                }
            })
            .collect()
    }
}
