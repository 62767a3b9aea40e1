//! The legacy `tools.toml` format: flat per-toolchain package lists.
//!
//! ```toml
//! [cargo]
//! packages = ["ripgrep", "fd-find"]
//!
//! [go]
//! packages = ["github.com/jesseduffield/lazygit"]
//!
//! [python]
//! tools = ["ruff"]
//! ```

use crate::manifest::ManifestError;
use crate::template::check_package_id;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ToolsManifest {
    #[serde(default)]
    pub cargo: PackageGroup,
    #[serde(default)]
    pub go: PackageGroup,
    #[serde(default)]
    pub python: ToolGroup,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackageGroup {
    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ToolGroup {
    #[serde(default)]
    pub tools: Vec<String>,
}

impl ToolsManifest {
    fn validate(&self) -> Result<(), ManifestError> {
        let groups = [
            ("cargo", &self.cargo.packages),
            ("go", &self.go.packages),
            ("python", &self.python.tools),
        ];
        for (group, names) in groups {
            for name in names {
                check_package_id(name).map_err(|ch| ManifestError::UnsafePackageId {
                    package: group.to_owned(),
                    id: name.clone(),
                    ch,
                })?;
            }
        }
        Ok(())
    }
}

pub fn parse_tools_str(input: &str) -> Result<ToolsManifest, ManifestError> {
    let manifest: ToolsManifest = toml::from_str(input)?;
    manifest.validate()?;
    Ok(manifest)
}

pub fn parse_tools_file(path: impl AsRef<Path>) -> Result<ToolsManifest, ManifestError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    parse_tools_str(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_groups() {
        let tools = parse_tools_str(
            r#"
[cargo]
packages = ["ripgrep", "fd-find"]

[go]
packages = ["github.com/jesseduffield/lazygit"]

[python]
tools = ["ruff"]
"#,
        )
        .unwrap();
        assert_eq!(tools.cargo.packages, vec!["ripgrep", "fd-find"]);
        assert_eq!(tools.go.packages.len(), 1);
        assert_eq!(tools.python.tools, vec!["ruff"]);
    }

    #[test]
    fn missing_groups_default_to_empty() {
        let tools = parse_tools_str("[go]\npackages = []\n").unwrap();
        assert!(tools.cargo.packages.is_empty());
        assert!(tools.python.tools.is_empty());
    }

    #[test]
    fn rejects_names_with_control_characters() {
        let err = parse_tools_str("[python]\ntools = [\"ruff\\nreboot\"]\n").unwrap_err();
        assert!(matches!(err, ManifestError::UnsafePackageId { ch: '\n', .. }));
    }

    #[test]
    fn accepts_extras_and_version_specifiers() {
        let tools = parse_tools_str("[python]\ntools = [\"black[jupyter]\", \"ruff>=0.4\"]\n").unwrap();
        assert_eq!(tools.python.tools, vec!["black[jupyter]", "ruff>=0.4"]);
    }
}
