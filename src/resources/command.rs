//! Shell command resource.
use std::path::Path;

use super::{Applicable, ResourceChange};
use crate::error::ResourceError;
use crate::exec::Executor;

/// A declared shell command, run through an [`Executor`].
#[derive(Debug)]
pub struct CommandResource<'a> {
    /// Command text passed to `bash -c`.
    text: &'a str,
    /// Working directory (the declaration's directory).
    dir: &'a Path,
    /// Declared environment added to the process.
    env: &'a [(String, String)],
    /// Executor for running system commands.
    executor: &'a dyn Executor,
}

impl<'a> CommandResource<'a> {
    /// Create a new command resource.
    #[must_use]
    pub const fn new(
        text: &'a str,
        dir: &'a Path,
        env: &'a [(String, String)],
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            text,
            dir,
            env,
            executor,
        }
    }
}

impl Applicable for CommandResource<'_> {
    fn description(&self) -> String {
        format!("$ {}", self.text)
    }

    fn apply(&self) -> Result<ResourceChange, ResourceError> {
        let result = self
            .executor
            .run_shell(self.dir, self.text, self.env)
            .map_err(|e| ResourceError::CommandExecution {
                command: self.text.to_string(),
                status: format!("spawn failed: {e:#}"),
            })?;

        if !result.success {
            return Err(ResourceError::CommandExecution {
                command: self.text.to_string(),
                status: result.describe(),
            });
        }
        Ok(ResourceChange::Applied)
    }
}
