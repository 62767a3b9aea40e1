use crate::shell::{CommandRunner, DEFAULT_PROBE_TIMEOUT};
use pkgplan_schema::{Source, SourceName};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceProbe {
    pub source: SourceName,
    pub available: bool,
}

/// Probe results for one run, in preference order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Availability {
    probes: Vec<SourceProbe>,
}

impl Availability {
    pub fn from_probes(probes: Vec<SourceProbe>) -> Self {
        Self { probes }
    }

    pub fn probes(&self) -> &[SourceProbe] {
        &self.probes
    }

    pub fn is_available(&self, source: &str) -> bool {
        self.probes
            .iter()
            .any(|p| p.available && p.source == source)
    }

    pub fn available(&self) -> impl Iterator<Item = &SourceName> {
        self.probes
            .iter()
            .filter(|p| p.available)
            .map(|p| &p.source)
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &SourceName> {
        self.probes
            .iter()
            .filter(|p| !p.available)
            .map(|p| &p.source)
    }

    pub fn any_available(&self) -> bool {
        self.probes.iter().any(|p| p.available)
    }
}

pub(crate) fn timeout_for(source: &Source) -> Duration {
    source.timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT)
}

/// Run the `available` probe of every source in `order`, concurrently.
///
/// A source without a probe, or one missing from `sources`, is unavailable.
/// A probe that fails to start or exceeds its timeout counts as failed.
pub fn probe_sources(
    order: &[SourceName],
    sources: &BTreeMap<SourceName, Source>,
    shell: &dyn CommandRunner,
) -> Availability {
    let probes = order
        .par_iter()
        .map(|name| {
            let available = match sources.get(name) {
                Some(source) => match &source.available {
                    Some(probe) => match shell.run_quiet(probe.as_str(), timeout_for(source)) {
                        Ok(()) => true,
                        Err(e) => {
                            debug!("source {name} unavailable: {e}");
                            false
                        }
                    },
                    None => {
                        debug!("source {name} has no availability probe");
                        false
                    }
                },
                None => false,
            };
            SourceProbe {
                source: name.clone(),
                available,
            }
        })
        .collect();
    Availability { probes }
}
