use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("source '{0}' has no install command")]
    MissingInstall(String),
    #[error("source '{0}': check_cmd and check_grep must be set together")]
    IncompleteListCheck(String),
    #[error("source '{name}': invalid check_grep pattern: {message}")]
    InvalidPattern { name: String, message: String },
    #[error("profile '{profile}' prefers unknown source '{name}' on {os}")]
    UnknownPreferenceSource {
        profile: String,
        os: String,
        name: String,
    },
    #[error("profile '{profile}' declares a source preference for {os} more than once")]
    DuplicateOsKey { profile: String, os: String },
    #[error("profile '{profile}' lists source '{name}' more than once on {os}")]
    DuplicatePreference {
        profile: String,
        os: String,
        name: String,
    },
    #[error("package '{package}': identifier {id:?} contains unsafe character {ch:?}")]
    UnsafePackageId {
        package: String,
        id: String,
        ch: char,
    },
}

/// On-disk document formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Toml,
}

impl ManifestFormat {
    /// `.toml` selects TOML; everything else (`.yaml`, `.yml`, no extension) is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManifestV1 {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileSection>,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSection>,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageSection>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProfileSection {
    #[serde(default)]
    pub description: Option<String>,
    /// OS name -> ordered source names, most preferred first.
    #[serde(default)]
    pub source_preference: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    #[serde(default)]
    pub description: Option<String>,
    /// Probe command; exit code 0 means the source can be used.
    #[serde(default)]
    pub available: Option<String>,
    /// Install template, `{pkg}` is replaced by the package id.
    #[serde(default)]
    pub install: Option<String>,
    /// List command whose output is matched against `check_grep`.
    #[serde(default)]
    pub check_cmd: Option<String>,
    /// Multi-line regex, `{pkg}` is replaced by the escaped package id.
    #[serde(default)]
    pub check_grep: Option<String>,
    /// Detect by looking for the package binary on PATH.
    #[serde(default)]
    pub check_binary: bool,
    /// Check template; exit code 0 means installed.
    #[serde(default)]
    pub check: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub binary: Option<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Source name -> that source's identifier for this package.
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

pub fn parse_manifest_str(input: &str, format: ManifestFormat) -> Result<ManifestV1, ManifestError> {
    match format {
        ManifestFormat::Yaml => {
            // An empty YAML document deserializes as unit, not as an empty map.
            if input.trim().is_empty() {
                return Ok(ManifestV1::default());
            }
            Ok(serde_yaml::from_str(input)?)
        }
        ManifestFormat::Toml => Ok(toml::from_str(input)?),
    }
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ManifestV1, ManifestError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content, ManifestFormat::from_path(path))
}
