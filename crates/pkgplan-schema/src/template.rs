//! `{pkg}` command templates.
//!
//! A template is a shell command line with at most one kind of placeholder,
//! `{pkg}`, replaced by a source-specific package identifier quoted as a
//! single shell word. Match patterns for list-and-match detection use the same
//! placeholder, but the identifier is regex-escaped before substitution.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// The only placeholder recognized in command templates and match patterns.
pub const PKG_PLACEHOLDER: &str = "{pkg}";

/// `cmd /C` has no quoting that neutralizes these, so Windows identifiers may
/// not contain them.
const CMD_METACHARACTERS: &[char] = &['&', '|', '<', '>', '^', '"', '%'];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_placeholder(&self) -> bool {
        self.0.contains(PKG_PLACEHOLDER)
    }

    /// Substitute `pkg`, quoted for the shell, for every `{pkg}` occurrence.
    pub fn render(&self, pkg: &str) -> String {
        self.0.replace(PKG_PLACEHOLDER, &quote_word(pkg))
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quote `word` so `sh -c` sees it as one literal argument. Plain words come
/// back unchanged.
pub fn quote_word(word: &str) -> Cow<'_, str> {
    if cfg!(windows) {
        Cow::Borrowed(word)
    } else {
        shell_words::quote(word)
    }
}

/// Substitute a regex-escaped `pkg` into a list-and-match pattern.
pub fn render_pattern(pattern: &str, pkg: &str) -> String {
    pattern.replace(PKG_PLACEHOLDER, &regex::escape(pkg))
}

/// Reject identifiers that no quoting makes safe: control characters such as
/// newline or NUL, and on Windows the `cmd` metacharacters. Returns the first
/// offending character.
pub fn check_package_id(id: &str) -> Result<(), char> {
    let unsafe_char = |c: &char| c.is_control() || (cfg!(windows) && CMD_METACHARACTERS.contains(c));
    match id.chars().find(unsafe_char) {
        Some(c) => Err(c),
        None => Ok(()),
    }
}
