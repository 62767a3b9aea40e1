use crate::manifest::{parse_manifest_file, ManifestError, ManifestV1, SourceSection};
use crate::os::HostOs;
use crate::template::{check_package_id, render_pattern, CommandTemplate};
use crate::types::{PackageId, PackageName, ProfileName, SourceName};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

/// Validated, typed representation of a parsed manifest.
///
/// Every source carries its detection strategy, chosen once here rather than
/// re-derived per package. Packages are ordered by name, which is also the
/// order they are resolved, reported and installed in.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NormalizedManifest {
    pub profiles: BTreeMap<ProfileName, Profile>,
    pub sources: BTreeMap<SourceName, Source>,
    pub packages: Vec<Package>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Profile {
    pub name: ProfileName,
    pub description: Option<String>,
    /// OS name -> sources, most preferred first. Never contains duplicates.
    pub source_preference: BTreeMap<String, Vec<SourceName>>,
}

impl Profile {
    /// Preference order for `os`, `None` when the profile has no entry for it.
    pub fn preference_for(&self, os: HostOs) -> Option<&[SourceName]> {
        self.source_preference.get(os.as_str()).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Source {
    pub name: SourceName,
    pub description: Option<String>,
    /// `None` means the source is never available.
    pub available: Option<CommandTemplate>,
    pub install: CommandTemplate,
    pub detection: Detection,
    pub timeout: Option<Duration>,
}

/// How a source decides whether a package is already installed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum Detection {
    /// Run `list_cmd` once per run and search its output for `pattern`.
    ListMatch { list_cmd: String, pattern: String },
    /// Look for the package binary, or the last path segment of its id, on PATH.
    Binary,
    /// Run the rendered template; exit code 0 means installed.
    Command { check: CommandTemplate },
    /// Nothing configured: look for the package binary, or its id, on PATH.
    DefaultBinary,
}

impl Detection {
    fn from_section(name: &str, section: &SourceSection) -> Result<Self, ManifestError> {
        match (&section.check_cmd, &section.check_grep) {
            (Some(list_cmd), Some(pattern)) => {
                validate_pattern(name, pattern)?;
                return Ok(Self::ListMatch {
                    list_cmd: list_cmd.clone(),
                    pattern: pattern.clone(),
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ManifestError::IncompleteListCheck(name.to_owned()));
            }
            (None, None) => {}
        }

        if section.check_binary {
            return Ok(Self::Binary);
        }
        if let Some(check) = &section.check {
            return Ok(Self::Command {
                check: CommandTemplate::new(check.clone()),
            });
        }
        Ok(Self::DefaultBinary)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ListMatch { .. } => "list-match",
            Self::Binary => "binary",
            Self::Command { .. } => "check-command",
            Self::DefaultBinary => "default-binary",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Package {
    pub name: PackageName,
    pub description: Option<String>,
    pub binary: Option<String>,
    pub profiles: BTreeSet<ProfileName>,
    pub sources: BTreeMap<SourceName, PackageId>,
}

impl Package {
    /// Executable whose presence on PATH means the package is installed.
    pub fn default_binary(&self) -> &str {
        self.binary.as_deref().unwrap_or(&self.name)
    }

    /// Executable checked by `check_binary` sources: the explicit binary, else
    /// the last `/` segment of the id (`github.com/x/lazygit` -> `lazygit`).
    pub fn binary_for_id<'a>(&'a self, id: &'a PackageId) -> &'a str {
        self.binary
            .as_deref()
            .unwrap_or_else(|| id.rsplit('/').next().unwrap_or(id.as_str()))
    }

    /// Executable checked when a source configures no detection at all.
    pub fn fallback_binary<'a>(&'a self, id: &'a PackageId) -> &'a str {
        self.binary.as_deref().unwrap_or(id.as_str())
    }

    pub fn in_profile(&self, profile: &str) -> bool {
        self.profiles.contains(profile)
    }
}

impl ManifestV1 {
    /// Validate the manifest and build the typed representation.
    pub fn normalize(&self) -> Result<NormalizedManifest, ManifestError> {
        let mut sources = BTreeMap::new();
        for (name, section) in &self.sources {
            let install = section
                .install
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ManifestError::MissingInstall(name.clone()))?;

            sources.insert(
                SourceName::new(name.clone()),
                Source {
                    name: SourceName::new(name.clone()),
                    description: section.description.clone(),
                    available: section
                        .available
                        .as_deref()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(CommandTemplate::new),
                    install: CommandTemplate::new(install),
                    detection: Detection::from_section(name, section)?,
                    timeout: section.timeout_secs.map(Duration::from_secs),
                },
            );
        }

        let mut profiles = BTreeMap::new();
        for (name, section) in &self.profiles {
            let mut source_preference = BTreeMap::new();
            for (os, order) in &section.source_preference {
                let mut seen = BTreeSet::new();
                let mut names = Vec::with_capacity(order.len());
                for source in order {
                    if !sources.contains_key(source.as_str()) {
                        return Err(ManifestError::UnknownPreferenceSource {
                            profile: name.clone(),
                            os: os.clone(),
                            name: source.clone(),
                        });
                    }
                    if !seen.insert(source.as_str()) {
                        return Err(ManifestError::DuplicatePreference {
                            profile: name.clone(),
                            os: os.clone(),
                            name: source.clone(),
                        });
                    }
                    names.push(SourceName::new(source.clone()));
                }
                let key = os.trim().to_lowercase();
                if source_preference.contains_key(&key) {
                    return Err(ManifestError::DuplicateOsKey {
                        profile: name.clone(),
                        os: key,
                    });
                }
                source_preference.insert(key, names);
            }
            profiles.insert(
                ProfileName::new(name.clone()),
                Profile {
                    name: ProfileName::new(name.clone()),
                    description: section.description.clone(),
                    source_preference,
                },
            );
        }

        let mut packages = Vec::with_capacity(self.packages.len());
        for (name, section) in &self.packages {
            let mut ids = BTreeMap::new();
            for (source, id) in &section.sources {
                let id = id.trim();
                check_package_id(id).map_err(|ch| ManifestError::UnsafePackageId {
                    package: name.clone(),
                    id: id.to_owned(),
                    ch,
                })?;
                ids.insert(SourceName::new(source.clone()), PackageId::new(id));
            }
            packages.push(Package {
                name: PackageName::new(name.clone()),
                description: section.description.clone(),
                binary: section
                    .binary
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned),
                profiles: section
                    .profiles
                    .iter()
                    .map(|p| ProfileName::new(p.clone()))
                    .collect(),
                sources: ids,
            });
        }

        Ok(NormalizedManifest {
            profiles,
            sources,
            packages,
        })
    }
}

impl NormalizedManifest {
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.get(name)
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(ProfileName::as_str).collect()
    }

    /// Packages requested by `profile`, in manifest order.
    pub fn packages_for(&self, profile: &str) -> Vec<&Package> {
        self.packages
            .iter()
            .filter(|p| p.in_profile(profile))
            .collect()
    }
}

/// Parse and validate a manifest file in one step.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<NormalizedManifest, ManifestError> {
    parse_manifest_file(path)?.normalize()
}

fn validate_pattern(name: &str, pattern: &str) -> Result<(), ManifestError> {
    regex::RegexBuilder::new(&render_pattern(pattern, "probe"))
        .multi_line(true)
        .build()
        .map(|_| ())
        .map_err(|e| ManifestError::InvalidPattern {
            name: name.to_owned(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{parse_manifest_str, ManifestFormat};

    fn normalize(input: &str) -> Result<NormalizedManifest, ManifestError> {
        parse_manifest_str(input, ManifestFormat::Yaml)
            .expect("should parse")
            .normalize()
    }

    #[test]
    fn list_match_wins_over_check_command() {
        let m = normalize(
            r#"
sources:
  uv:
    install: uv tool install {pkg}
    check_cmd: uv tool list
    check_grep: "^{pkg} "
    check: uv tool list | grep {pkg}
    check_binary: true
"#,
        )
        .unwrap();
        assert!(matches!(
            m.sources["uv"].detection,
            Detection::ListMatch { .. }
        ));
    }

    #[test]
    fn binary_beats_check_command() {
        let m = normalize(
            r"
sources:
  go:
    install: go install {pkg}@latest
    check_binary: true
    check: test -x ~/go/bin/{pkg}
",
        )
        .unwrap();
        assert_eq!(m.sources["go"].detection, Detection::Binary);
    }

    #[test]
    fn detection_falls_back_to_default_binary() {
        let m = normalize(
            r"
sources:
  pipx:
    install: pipx install {pkg}
  apt:
    install: apt-get install -y {pkg}
    check: dpkg -s {pkg}
",
        )
        .unwrap();
        assert_eq!(m.sources["pipx"].detection, Detection::DefaultBinary);
        assert_eq!(m.sources["apt"].detection.kind(), "check-command");
        assert!(m.sources["pipx"].available.is_none());
    }

    #[test]
    fn rejects_source_without_install() {
        let err = normalize(
            r"
sources:
  brew:
    available: command -v brew
",
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingInstall(ref s) if s == "brew"));
    }

    #[test]
    fn rejects_half_configured_list_check() {
        let err = normalize(
            r"
sources:
  cargo:
    install: cargo install {pkg}
    check_cmd: cargo install --list
",
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::IncompleteListCheck(_)));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let err = normalize(
            r#"
sources:
  cargo:
    install: cargo install {pkg}
    check_cmd: cargo install --list
    check_grep: "^({pkg} "
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidPattern { .. }));
    }

    #[test]
    fn rejects_unknown_and_duplicate_preferences() {
        let unknown = normalize(
            r"
profiles:
  dev:
    source_preference:
      linux: [cargo]
",
        )
        .unwrap_err();
        assert!(matches!(
            unknown,
            ManifestError::UnknownPreferenceSource { .. }
        ));

        let duplicate = normalize(
            r"
profiles:
  dev:
    source_preference:
      linux: [cargo, cargo]
sources:
  cargo:
    install: cargo install {pkg}
",
        )
        .unwrap_err();
        assert!(matches!(duplicate, ManifestError::DuplicatePreference { .. }));
    }

    #[test]
    fn rejects_package_ids_with_control_characters() {
        let err = normalize(
            r#"
packages:
  evil:
    profiles: [dev]
    sources:
      cargo: "ripgrep\ncurl x | sh"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::UnsafePackageId { ch: '\n', .. }));
    }

    #[cfg(unix)]
    #[test]
    fn accepts_extras_and_version_specifiers() {
        let m = normalize(
            r#"
sources:
  uv:
    install: uv tool install {pkg}
packages:
  black:
    profiles: [dev]
    sources:
      uv: "black[jupyter]"
  ruff:
    profiles: [dev]
    sources:
      uv: "ruff>=0.4"
"#,
        )
        .unwrap();
        assert_eq!(m.packages[0].sources["uv"], "black[jupyter]");
        assert_eq!(m.packages[1].sources["uv"], "ruff>=0.4");
    }

    #[test]
    fn packages_are_ordered_by_name_not_document_order() {
        let m = normalize(
            r"
packages:
  zoxide:
    profiles: [dev]
    sources: {}
  bat:
    profiles: [dev]
    sources: {}
",
        )
        .unwrap();
        let names: Vec<&str> = m.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bat", "zoxide"]);
    }

    #[test]
    fn rejects_os_keys_differing_only_in_case() {
        let err = normalize(
            r"
profiles:
  dev:
    source_preference:
      Linux: [cargo]
      linux: [cargo]
sources:
  cargo:
    install: cargo install {pkg}
",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::DuplicateOsKey { ref profile, ref os } if profile == "dev" && os == "linux"
        ));
    }

    #[test]
    fn package_sources_may_name_undeclared_sources() {
        let m = normalize(
            r"
packages:
  ripgrep:
    profiles: [dev]
    sources:
      scoop: ripgrep
",
        )
        .unwrap();
        assert_eq!(m.packages.len(), 1);
    }

    #[test]
    fn binary_name_derivation() {
        let m = normalize(
            r"
packages:
  lazygit:
    profiles: [dev]
    sources:
      go: github.com/jesseduffield/lazygit
  ripgrep:
    binary: rg
    profiles: [dev]
    sources:
      cargo: ripgrep
",
        )
        .unwrap();
        let lazygit = &m.packages[0];
        let go_id = &lazygit.sources["go"];
        assert_eq!(lazygit.default_binary(), "lazygit");
        assert_eq!(lazygit.binary_for_id(go_id), "lazygit");
        assert_eq!(lazygit.fallback_binary(go_id), "github.com/jesseduffield/lazygit");

        let ripgrep = &m.packages[1];
        let cargo_id = &ripgrep.sources["cargo"];
        assert_eq!(ripgrep.default_binary(), "rg");
        assert_eq!(ripgrep.binary_for_id(cargo_id), "rg");
        assert_eq!(ripgrep.fallback_binary(cargo_id), "rg");
    }

    #[test]
    fn packages_for_filters_by_profile_in_name_order() {
        let m = normalize(
            r"
packages:
  zoxide:
    profiles: [dev]
  bat:
    profiles: [dev, work]
  htop:
    profiles: [work]
",
        )
        .unwrap();
        let names: Vec<&str> = m.packages_for("dev").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bat", "zoxide"]);
        assert!(m.packages_for("nobody").is_empty());
    }

    #[test]
    fn preference_lookup_by_os() {
        let m = normalize(
            r"
profiles:
  dev:
    source_preference:
      Linux: [apt]
sources:
  apt:
    install: apt-get install -y {pkg}
",
        )
        .unwrap();
        let dev = m.profile("dev").unwrap();
        assert_eq!(dev.preference_for(HostOs::Linux).unwrap(), &[SourceName::new("apt")]);
        assert!(dev.preference_for(HostOs::Darwin).is_none());
    }
}
