use crate::probe::{Availability, SourceProbe};
use crate::resolver::{Outcome, Resolution, SkipReason};
use pkgplan_schema::{HostOs, PackageId, PackageName, ProfileName, SourceName};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledPackage {
    pub package: PackageName,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedInstall {
    pub package: PackageName,
    pub source: SourceName,
    pub package_id: PackageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPackage {
    pub package: PackageName,
    pub reason: SkipReason,
}

/// Aggregated outcome of one planning run.
///
/// Each requested package appears in exactly one of `installed`,
/// `to_install` and `skipped`, in package name order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub os: HostOs,
    pub profile: ProfileName,
    pub preference: Vec<SourceName>,
    pub sources: Vec<SourceProbe>,
    pub installed: Vec<InstalledPackage>,
    pub to_install: Vec<PlannedInstall>,
    pub skipped: Vec<SkippedPackage>,
}

impl Plan {
    pub fn new(
        os: HostOs,
        profile: ProfileName,
        preference: Vec<SourceName>,
        availability: &Availability,
        resolutions: Vec<Resolution>,
    ) -> Self {
        let mut plan = Self {
            os,
            profile,
            preference,
            sources: availability.probes().to_vec(),
            installed: Vec::new(),
            to_install: Vec::new(),
            skipped: Vec::new(),
        };
        for Resolution { package, outcome } in resolutions {
            match outcome {
                Outcome::Installed { reason } => {
                    plan.installed.push(InstalledPackage { package, reason });
                }
                Outcome::ToInstall { source, package_id } => {
                    plan.to_install.push(PlannedInstall {
                        package,
                        source,
                        package_id,
                    });
                }
                Outcome::Skipped { reason } => {
                    plan.skipped.push(SkippedPackage { package, reason });
                }
            }
        }
        plan
    }

    pub fn available_sources(&self) -> impl Iterator<Item = &SourceName> {
        self.sources.iter().filter(|p| p.available).map(|p| &p.source)
    }

    pub fn unavailable_sources(&self) -> impl Iterator<Item = &SourceName> {
        self.sources.iter().filter(|p| !p.available).map(|p| &p.source)
    }

    /// Planned installs grouped by source, groups in preference order and
    /// packages in name order within each group. Empty groups are omitted.
    pub fn by_source(&self) -> Vec<(&SourceName, Vec<&PlannedInstall>)> {
        self.preference
            .iter()
            .map(|source| {
                let group: Vec<&PlannedInstall> = self
                    .to_install
                    .iter()
                    .filter(|p| &p.source == source)
                    .collect();
                (source, group)
            })
            .filter(|(_, group)| !group.is_empty())
            .collect()
    }

    pub fn package_count(&self) -> usize {
        self.installed.len() + self.to_install.len() + self.skipped.len()
    }

    pub fn is_satisfied(&self) -> bool {
        self.to_install.is_empty()
    }

    /// Outcome recorded for `package`, if it was requested.
    pub fn outcome_of(&self, package: &str) -> Option<Outcome> {
        if let Some(p) = self.installed.iter().find(|p| p.package == package) {
            return Some(Outcome::Installed {
                reason: p.reason.clone(),
            });
        }
        if let Some(p) = self.to_install.iter().find(|p| p.package == package) {
            return Some(Outcome::ToInstall {
                source: p.source.clone(),
                package_id: p.package_id.clone(),
            });
        }
        self.skipped
            .iter()
            .find(|p| p.package == package)
            .map(|p| Outcome::Skipped { reason: p.reason })
    }
}
