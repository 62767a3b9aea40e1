//! GitHub token lookup for install commands.
//!
//! Several installers (cargo-binstall, `go install` through proxies, release
//! downloads) hit the GitHub API and are rate limited without a token. The
//! token is only ever placed in the install environment, never logged.

use crate::shell::{CommandRunner, DEFAULT_PROBE_TIMEOUT};
use tracing::debug;

pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Token from `GITHUB_TOKEN`, else from `gh auth token` when `gh` is installed.
pub fn github_token(shell: &dyn CommandRunner) -> Option<String> {
    github_token_from(std::env::var(GITHUB_TOKEN_VAR).ok(), shell)
}

fn github_token_from(env_value: Option<String>, shell: &dyn CommandRunner) -> Option<String> {
    if let Some(token) = env_value.filter(|t| !t.trim().is_empty()) {
        debug!("using GitHub token from {GITHUB_TOKEN_VAR}");
        return Some(token);
    }
    if !shell.has_binary("gh") {
        return None;
    }
    let token = shell
        .capture("gh auth token", DEFAULT_PROBE_TIMEOUT)
        .ok()
        .map(|out| out.trim().to_owned())
        .filter(|t| !t.is_empty());
    if token.is_some() {
        debug!("using GitHub token from gh auth");
    }
    token
}

/// Extra environment for install commands.
pub fn install_env(token: Option<String>) -> Vec<(String, String)> {
    token
        .map(|t| vec![(GITHUB_TOKEN_VAR.to_owned(), t)])
        .unwrap_or_default()
}
