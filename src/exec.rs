//! Shell command execution.
use anyhow::{Context as _, Result};
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Outcome of a command whose standard streams were inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// A successful result with exit code zero.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    /// A failed result with the given exit code.
    #[must_use]
    pub const fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }

    /// Short description of the exit status (`exit 0`, `signal`).
    #[must_use]
    pub fn describe(&self) -> String {
        self.code
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit {c}"))
    }
}

impl From<ExitStatus> for ExecResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Runs shell commands on behalf of the engine.
///
/// Injected through the run context so tests can observe or stub command
/// execution without spawning processes.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `script` with `bash -c` in `dir`, adding `env` to the inherited
    /// environment.  Standard streams are inherited.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be spawned; a non-zero
    /// exit is reported through [`ExecResult::success`].
    fn run_shell(&self, dir: &Path, script: &str, env: &[(String, String)]) -> Result<ExecResult>;
}

#[cfg(test)]
mockall::mock! {
    /// Mock [`Executor`] for unit tests.
    pub Executor {}

    impl Executor for Executor {
        fn run_shell(&self, dir: &Path, script: &str, env: &[(String, String)]) -> Result<ExecResult>;
    }
}

#[cfg(test)]
impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor").finish_non_exhaustive()
    }
}

/// Production [`Executor`] that spawns `bash`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_shell(&self, dir: &Path, script: &str, env: &[(String, String)]) -> Result<ExecResult> {
        let status = Command::new("bash")
            .arg("-c")
            .arg(script)
            .current_dir(dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()
            .with_context(|| format!("failed to execute: bash -c {script:?} in {}", dir.display()))?;
        Ok(ExecResult::from(status))
    }
}
