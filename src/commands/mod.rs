//! Top-level subcommand orchestration.
pub mod clean;
pub mod provision;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::machine::Machine;
use crate::snapshot::SnapshotStore;
use crate::tasks::Context;

/// Shared state produced by the common command setup sequence.
///
/// Resolves the declaration, home and snapshot paths and loads the machine
/// so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// The loaded machine.
    pub machine: Machine,
    /// Directory holding the declaration.
    pub root: PathBuf,
    /// The user's home directory.
    pub home: PathBuf,
    /// Where the snapshot lives.
    pub store: SnapshotStore,
}

impl CommandSetup {
    /// Resolve paths and load the machine declaration.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration cannot be found, parsed or
    /// resolved, or if no home or cache directory can be determined.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let home = home_dir()?;
        let file = declaration_path(global)?;
        let root = config::declaration_dir(&file);

        log.stage("Loading declaration");
        log.debug(&format!("declaration: {}", file.display()));
        let machine = config::load(&file, global.machine.as_deref(), &home)
            .with_context(|| format!("failed to load {}", file.display()))?;
        log.info(&format!(
            "machine {}: {} tasks",
            machine.name,
            machine.tasks.len()
        ));
        log.debug(&format!("order: {}", machine.order.join(", ")));

        let store = match &global.snapshot {
            Some(path) => SnapshotStore::new(path.clone()),
            None => SnapshotStore::new(
                SnapshotStore::default_path().context("cannot determine the cache directory")?,
            ),
        };
        log.debug(&format!("snapshot: {}", store.path().display()));

        Ok(Self {
            machine,
            root,
            home,
            store,
        })
    }

    /// Build the run context over the loaded machine.
    #[must_use]
    pub fn context(&self, log: &Arc<Logger>, dry_run: bool) -> Context {
        Context::new(
            &self.machine,
            self.root.clone(),
            self.home.clone(),
            Arc::clone(log) as Arc<dyn Log>,
            Arc::new(SystemExecutor) as Arc<dyn Executor>,
        )
        .with_dry_run(dry_run)
    }
}

/// Resolve the declaration file from `--file`, or `machine.toml` under
/// `--root` (default: the current directory).
///
/// # Errors
///
/// Returns an error if the file does not exist.
pub fn declaration_path(global: &GlobalOpts) -> Result<PathBuf> {
    let path = match (&global.file, &global.root) {
        (Some(file), _) => file.clone(),
        (None, Some(root)) => root.join(config::DECLARATION_FILE),
        (None, None) => std::env::current_dir()
            .context("cannot determine the current directory")?
            .join(config::DECLARATION_FILE),
    };
    std::fs::canonicalize(&path)
        .with_context(|| format!("declaration not found: {}", path.display()))
}

/// The user's home directory.
///
/// # Errors
///
/// Returns an error if neither `HOME` nor `USERPROFILE` is set.
pub fn home_dir() -> Result<PathBuf> {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .filter_map(std::env::var_os)
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
        .context("cannot determine the home directory: HOME is not set")
}

/// Print the summary and turn recorded failures into an error.
///
/// # Errors
///
/// Returns `result` unchanged if it is an error, or an error if any task
/// recorded a failure.
pub fn finish<T>(result: Result<T>, log: &Logger) -> Result<T> {
    log.print_summary();
    let value = result?;
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(value)
}
