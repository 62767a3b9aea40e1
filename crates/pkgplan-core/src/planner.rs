use crate::detect::ListCache;
use crate::plan::Plan;
use crate::probe::probe_sources;
use crate::resolver::ResolveContext;
use crate::shell::CommandRunner;
use crate::CoreError;
use pkgplan_schema::{HostOs, NormalizedManifest, ProfileName, SourceName};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub profile: String,
    pub os: HostOs,
    /// Restrict the preference list to this one source.
    pub source_filter: Option<String>,
}

impl PlanRequest {
    pub fn new(profile: impl Into<String>, os: HostOs) -> Self {
        Self {
            profile: profile.into(),
            os,
            source_filter: None,
        }
    }

    #[must_use]
    pub fn with_source_filter(mut self, source: Option<String>) -> Self {
        self.source_filter = source;
        self
    }
}

pub struct Planner<'a> {
    manifest: &'a NormalizedManifest,
    shell: &'a dyn CommandRunner,
}

impl<'a> Planner<'a> {
    pub fn new(manifest: &'a NormalizedManifest, shell: &'a dyn CommandRunner) -> Self {
        Self { manifest, shell }
    }

    /// Effective preference order for `request`, checked before any probing.
    ///
    /// With a source filter the order shrinks to that one source, or to
    /// nothing when the profile does not prefer it on this OS.
    pub fn preference(&self, request: &PlanRequest) -> Result<Vec<SourceName>, CoreError> {
        let profile = self
            .manifest
            .profile(&request.profile)
            .ok_or_else(|| CoreError::UnknownProfile {
                name: request.profile.clone(),
                available: self.manifest.profile_names().join(", "),
            })?;

        let order = profile
            .preference_for(request.os)
            .filter(|order| !order.is_empty())
            .ok_or_else(|| CoreError::NoPreference {
                profile: request.profile.clone(),
                os: request.os,
            })?;

        let Some(filter) = &request.source_filter else {
            return Ok(order.to_vec());
        };
        if self.manifest.source(filter).is_none() {
            return Err(CoreError::UnknownSource(filter.clone()));
        }
        let filtered: Vec<SourceName> = order
            .iter()
            .filter(|s| *s == filter)
            .cloned()
            .collect();
        if filtered.is_empty() {
            debug!("source {filter} is not preferred by {} on {}", request.profile, request.os);
        }
        Ok(filtered)
    }

    /// Probe sources, fill the list cache and resolve every package the
    /// profile requests.
    pub fn plan(&self, request: &PlanRequest) -> Result<Plan, CoreError> {
        let preference = self.preference(request)?;
        info!(
            "planning profile {} on {} with preference [{}]",
            request.profile,
            request.os,
            preference
                .iter()
                .map(SourceName::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let availability = probe_sources(&preference, &self.manifest.sources, self.shell);
        if !availability.any_available() {
            return Err(CoreError::NoSourcesAvailable);
        }

        let cache = ListCache::populate(
            availability
                .available()
                .filter_map(|name| self.manifest.sources.get(name)),
            self.shell,
        );
        debug!("cached {} list outputs", cache.len());

        let packages = self.manifest.packages_for(&request.profile);
        let ctx = ResolveContext {
            preference: &preference,
            availability: &availability,
            sources: &self.manifest.sources,
            cache: &cache,
            shell: self.shell,
        };
        let resolutions = ctx.resolve_all(&packages);

        let plan = Plan::new(
            request.os,
            ProfileName::new(request.profile.clone()),
            preference,
            &availability,
            resolutions,
        );
        info!(
            "{} installed, {} to install, {} skipped",
            plan.installed.len(),
            plan.to_install.len(),
            plan.skipped.len()
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockShell;
    use pkgplan_schema::{parse_manifest_str, ManifestFormat};

    const MANIFEST: &str = r#"
profiles:
  dev:
    source_preference:
      linux: [cargo, apt]
      darwin: []
  work:
    source_preference:
      linux: [apt]
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
  brew:
    available: command -v brew
    install: brew install {pkg}
packages:
  ripgrep:
    binary: rg
    profiles: [dev]
    sources:
      cargo: ripgrep
      apt: ripgrep
"#;

    fn manifest() -> NormalizedManifest {
        parse_manifest_str(MANIFEST, ManifestFormat::Yaml)
            .unwrap()
            .normalize()
            .unwrap()
    }

    #[test]
    fn unknown_profile_lists_alternatives() {
        let m = manifest();
        let shell = MockShell::new();
        let err = Planner::new(&m, &shell)
            .plan(&PlanRequest::new("gaming", HostOs::Linux))
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown profile: gaming (available: dev, work)");
        assert!(shell.calls().is_empty());
    }

    #[test]
    fn missing_or_empty_os_preference_is_an_error() {
        let m = manifest();
        let shell = MockShell::new();
        let planner = Planner::new(&m, &shell);
        assert!(matches!(
            planner.plan(&PlanRequest::new("dev", HostOs::Windows)),
            Err(CoreError::NoPreference { .. })
        ));
        assert!(matches!(
            planner.plan(&PlanRequest::new("dev", HostOs::Darwin)),
            Err(CoreError::NoPreference { .. })
        ));
    }

    #[test]
    fn source_filter_narrows_preference() {
        let m = manifest();
        let shell = MockShell::new();
        let planner = Planner::new(&m, &shell);
        let request =
            PlanRequest::new("dev", HostOs::Linux).with_source_filter(Some("apt".to_owned()));
        assert_eq!(planner.preference(&request).unwrap(), vec![SourceName::new("apt")]);

        let unknown =
            PlanRequest::new("dev", HostOs::Linux).with_source_filter(Some("nix".to_owned()));
        assert!(matches!(
            planner.preference(&unknown),
            Err(CoreError::UnknownSource(ref s)) if s == "nix"
        ));

        let unpreferred =
            PlanRequest::new("dev", HostOs::Linux).with_source_filter(Some("brew".to_owned()));
        assert!(planner.preference(&unpreferred).unwrap().is_empty());
        assert!(matches!(
            planner.plan(&unpreferred),
            Err(CoreError::NoSourcesAvailable)
        ));
    }

    #[test]
    fn no_available_source_is_an_error() {
        let m = manifest();
        let shell = MockShell::new();
        let err = Planner::new(&m, &shell)
            .plan(&PlanRequest::new("dev", HostOs::Linux))
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSourcesAvailable));
    }

    #[test]
    fn list_cache_only_covers_available_sources() {
        let m = manifest();
        let shell = MockShell::new()
            .with_success("command -v apt-get")
            .with_output("cargo install --list", "ripgrep v14.0.0:\n");
        let plan = Planner::new(&m, &shell)
            .plan(&PlanRequest::new("dev", HostOs::Linux))
            .unwrap();
        assert_eq!(shell.call_count("cargo install --list"), 0);
        assert_eq!(plan.to_install.len(), 1);
        assert_eq!(plan.to_install[0].source, "apt");
    }
}
