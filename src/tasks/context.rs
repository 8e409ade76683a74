use std::path::PathBuf;
use std::sync::Arc;

use crate::exec::Executor;
use crate::logging::Log;
use crate::machine::Machine;
use crate::resources::symlink::LinkOptions;

/// Which kinds of entries a run applies, and how links replace what is there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Apply queued links.
    pub links: bool,
    /// Run queued commands.
    pub commands: bool,
    /// Create missing parent directories of link destinations.
    pub parents: bool,
    /// Replace real files and directories at link destinations.
    pub clobber: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            links: true,
            commands: true,
            parents: false,
            clobber: false,
        }
    }
}

impl ApplyOptions {
    /// Symlink replacement policy derived from these options.
    #[must_use]
    pub const fn link_options(&self) -> LinkOptions {
        LinkOptions {
            parents: self.parents,
            clobber: self.clobber,
        }
    }
}

/// Immutable context shared by every step of a run.
pub struct Context {
    /// Machine name, used as the snapshot key.
    pub machine: String,
    /// Declaration directory; working directory of every command.
    pub root: PathBuf,
    /// User's home directory path.
    pub home: PathBuf,
    /// Declared environment (already expanded) added to every command.
    pub environment: Vec<(String, String)>,
    /// What to apply and how.
    pub options: ApplyOptions,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("machine", &self.machine)
            .field("root", &self.root)
            .field("home", &self.home)
            .field("environment", &self.environment)
            .field("options", &self.options)
            .field("dry_run", &self.dry_run)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .finish()
    }
}

impl Context {
    /// Creates a context for running `machine`.
    #[must_use]
    pub fn new(
        machine: &Machine,
        root: PathBuf,
        home: PathBuf,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            machine: machine.name.clone(),
            root,
            home,
            environment: machine
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            options: ApplyOptions::default(),
            dry_run: false,
            log,
            executor,
        }
    }

    /// Replace the apply options.
    #[must_use]
    pub fn with_options(mut self, options: ApplyOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
