//! Newtype wrappers for manifest identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<String> for $name {
            fn eq(&self, other: &String) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Name of a package source as declared under `sources:` (e.g. `cargo`).
    SourceName
);

string_newtype!(
    /// Logical package name as declared under `packages:` (e.g. `ripgrep`).
    PackageName
);

string_newtype!(
    /// Name of a profile as declared under `profiles:` (e.g. `dev`).
    ProfileName
);

string_newtype!(
    /// Identifier a specific source uses for a package. Substituted for `{pkg}`.
    PackageId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn source_name_display_and_as_ref() {
        let name = SourceName::new("cargo");
        assert_eq!(name.to_string(), "cargo");
        assert_eq!(name.as_str(), "cargo");
        assert_eq!(AsRef::<str>::as_ref(&name), "cargo");
    }

    #[test]
    fn package_id_serializes_as_plain_string() {
        let id = PackageId::new("github.com/junegunn/fzf");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"github.com/junegunn/fzf\"");
        let back: PackageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn borrow_allows_str_lookups_in_maps() {
        let mut map = BTreeMap::new();
        map.insert(SourceName::from("apt"), 1);
        assert_eq!(map.get("apt"), Some(&1));
        assert_eq!(map.get("brew"), None);
    }

    #[test]
    fn compares_against_str_and_string() {
        let profile = ProfileName::from(String::from("dev"));
        assert_eq!(profile, "dev");
        assert_eq!(profile, String::from("dev"));
        assert_eq!(profile.into_inner(), "dev");
    }
}
