use crate::shell::{CommandRunner, ShellError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Scripted `CommandRunner` for tests and dry planning.
///
/// Quiet commands fail unless registered with `with_success`, captures fail
/// unless registered with `with_output`, and PATH lookups only find binaries
/// added with `with_binary`. Installs succeed unless listed as failing. Every
/// command line is recorded so tests can assert on call counts and order.
#[derive(Debug, Default)]
pub struct MockShell {
    succeeding: BTreeSet<String>,
    outputs: BTreeMap<String, String>,
    binaries: BTreeSet<String>,
    hanging: BTreeSet<String>,
    failing_installs: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
    installs: Mutex<Vec<String>>,
    install_env: Mutex<Vec<(String, String)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockShell {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_success(mut self, line: &str) -> Self {
        self.succeeding.insert(line.to_owned());
        self
    }

    #[must_use]
    pub fn with_output(mut self, line: &str, stdout: &str) -> Self {
        self.outputs.insert(line.to_owned(), stdout.to_owned());
        self
    }

    #[must_use]
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binaries.insert(binary.to_owned());
        self
    }

    /// Make `line` behave as if it exceeded its timeout.
    #[must_use]
    pub fn with_hang(mut self, line: &str) -> Self {
        self.hanging.insert(line.to_owned());
        self
    }

    #[must_use]
    pub fn with_failing_install(mut self, line: &str) -> Self {
        self.failing_installs.insert(line.to_owned());
        self
    }

    /// Every quiet and captured command line, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, line: &str) -> usize {
        lock(&self.calls).iter().filter(|c| *c == line).count()
    }

    /// Install command lines, in execution order.
    pub fn installs(&self) -> Vec<String> {
        lock(&self.installs).clone()
    }

    /// Environment passed to the most recent install.
    pub fn last_install_env(&self) -> Vec<(String, String)> {
        lock(&self.install_env).clone()
    }

    fn record(&self, line: &str, timeout: Duration) -> Result<(), ShellError> {
        lock(&self.calls).push(line.to_owned());
        if self.hanging.contains(line) {
            return Err(ShellError::TimedOut {
                command: line.to_owned(),
                timeout,
            });
        }
        Ok(())
    }
}

fn exit_failure(line: &str) -> ShellError {
    ShellError::Exit {
        command: line.to_owned(),
        code: Some(1),
    }
}

impl CommandRunner for MockShell {
    fn run_quiet(&self, line: &str, timeout: Duration) -> Result<(), ShellError> {
        self.record(line, timeout)?;
        if self.succeeding.contains(line) {
            Ok(())
        } else {
            Err(exit_failure(line))
        }
    }

    fn capture(&self, line: &str, timeout: Duration) -> Result<String, ShellError> {
        self.record(line, timeout)?;
        self.outputs
            .get(line)
            .cloned()
            .ok_or_else(|| exit_failure(line))
    }

    fn has_binary(&self, binary: &str) -> bool {
        self.binaries.contains(binary)
    }

    fn run_inherited(
        &self,
        line: &str,
        env: &[(String, String)],
        _timeout: Option<Duration>,
    ) -> Result<(), ShellError> {
        lock(&self.installs).push(line.to_owned());
        *lock(&self.install_env) = env.to_vec();
        if self.failing_installs.contains(line) {
            Err(exit_failure(line))
        } else {
            Ok(())
        }
    }

    /// Recorded with the installs, arguments joined by single spaces.
    fn run_program(
        &self,
        argv: &[String],
        env: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<(), ShellError> {
        self.run_inherited(&argv.join(" "), env, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::DEFAULT_PROBE_TIMEOUT;

    #[test]
    fn unregistered_commands_fail() {
        let shell = MockShell::new();
        assert!(shell.run_quiet("command -v brew", DEFAULT_PROBE_TIMEOUT).is_err());
        assert!(shell.capture("brew list", DEFAULT_PROBE_TIMEOUT).is_err());
        assert!(!shell.has_binary("brew"));
        assert_eq!(shell.calls(), vec!["command -v brew", "brew list"]);
    }

    #[test]
    fn scripted_commands_succeed() {
        let shell = MockShell::new()
            .with_success("true")
            .with_output("cargo install --list", "ripgrep v14.0.0:\n")
            .with_binary("rg");
        assert!(shell.run_quiet("true", DEFAULT_PROBE_TIMEOUT).is_ok());
        assert_eq!(
            shell.capture("cargo install --list", DEFAULT_PROBE_TIMEOUT).unwrap(),
            "ripgrep v14.0.0:\n"
        );
        assert!(shell.has_binary("rg"));
        assert_eq!(shell.call_count("true"), 1);
    }

    #[test]
    fn hanging_commands_time_out() {
        let shell = MockShell::new().with_success("sleep 60").with_hang("sleep 60");
        let err = shell.run_quiet("sleep 60", DEFAULT_PROBE_TIMEOUT).unwrap_err();
        assert!(matches!(err, ShellError::TimedOut { .. }));
    }

    #[test]
    fn installs_are_recorded_in_order() {
        let shell = MockShell::new().with_failing_install("apt-get install -y bat");
        let env = vec![("GITHUB_TOKEN".to_owned(), "t".to_owned())];
        assert!(shell.run_inherited("apt-get install -y jq", &env, None).is_ok());
        assert!(shell.run_inherited("apt-get install -y bat", &[], None).is_err());
        assert_eq!(
            shell.installs(),
            vec!["apt-get install -y jq", "apt-get install -y bat"]
        );
        assert!(shell.last_install_env().is_empty());
    }
}
