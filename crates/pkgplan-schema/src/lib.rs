//! Manifest parsing, validation, and command templates for pkgplan.
//!
//! This crate defines the schema layer: YAML/TOML manifest parsing
//! (`ManifestV1`), validated and typed representations (`NormalizedManifest`)
//! with the detection strategy of every source chosen at load time, the
//! `{pkg}` command templating rules, host OS naming, and the legacy
//! `tools.toml` format.

pub mod manifest;
pub mod normalize;
pub mod os;
pub mod template;
pub mod tools;
pub mod types;

pub use manifest::{
    parse_manifest_file, parse_manifest_str, ManifestError, ManifestFormat, ManifestV1,
    PackageSection, ProfileSection, SourceSection,
};
pub use normalize::{load_manifest, Detection, NormalizedManifest, Package, Profile, Source};
pub use os::HostOs;
pub use template::{
    check_package_id, quote_word, render_pattern, CommandTemplate, PKG_PLACEHOLDER,
};
pub use tools::{parse_tools_file, parse_tools_str, ToolsManifest};
pub use types::{PackageId, PackageName, ProfileName, SourceName};
