//! Loading the machine declaration into the provisioning model.
//!
//! Loading is split into a structural parse ([`declaration`]) and a
//! normalization pass ([`normalize`]); the dependency order is resolved last,
//! so every error in this module is raised before any side effect.
pub mod declaration;
pub mod normalize;

use std::path::{Path, PathBuf};

use crate::error::AlterError;
use crate::machine::Machine;
use crate::tasks::graph;

pub use declaration::Declaration;
pub use normalize::Environment;

/// Default declaration file name inside the root directory.
pub const DECLARATION_FILE: &str = "machine.toml";

/// Environment variable naming the machine when `--machine` is not given.
pub const MACHINE_ENV: &str = "ALTER_MACHINE";

/// Machine name used when nothing else names one.
pub const DEFAULT_MACHINE: &str = "default";

/// Pick the machine name: command line, then `ALTER_MACHINE`, then the
/// declaration's `machine` key, then [`DEFAULT_MACHINE`].
#[must_use]
pub fn machine_name(
    cli: Option<&str>,
    env: Option<&str>,
    declared: Option<&str>,
) -> String {
    [cli, env, declared]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(DEFAULT_MACHINE)
        .to_string()
}

/// Directory that relative link targets and commands are resolved against.
#[must_use]
pub fn declaration_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Read the declaration at `path` and build the machine.
///
/// # Errors
///
/// Returns [`AlterError::Config`] for unreadable or malformed declarations
/// and [`AlterError::Task`] for unknown dependencies or cycles.
pub fn load(path: &Path, machine: Option<&str>, home: &Path) -> Result<Machine, AlterError> {
    let decl = Declaration::read(path)?;
    let env_name = std::env::var(MACHINE_ENV).ok();
    let name = machine_name(machine, env_name.as_deref(), decl.machine.as_deref());
    let env = Environment::capture(&name, &declaration_dir(path), home);
    build(&decl, &env)
}

/// Normalize a parsed declaration and resolve its task order.
///
/// # Errors
///
/// Returns [`AlterError::Config`] if normalization fails and
/// [`AlterError::Task`] if the dependency graph cannot be ordered.
pub fn build(decl: &Declaration, env: &Environment) -> Result<Machine, AlterError> {
    let normalized = normalize::normalize(decl, env)?;
    let order = graph::resolve(&graph::of_tasks(normalized.tasks.values()))?;
    Ok(Machine {
        name: env.machine.clone(),
        environment: normalized.environment,
        tasks: normalized.tasks,
        order,
    })
}
