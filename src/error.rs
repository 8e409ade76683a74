//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors (e.g. [`ConfigError`], [`TaskError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! AlterError
//! ├── Config(ConfigError): unreadable or malformed machine declaration
//! ├── Task(TaskError): unknown references, dependency cycles
//! ├── Resource(ResourceError): symlink and command failures
//! └── Snapshot(SnapshotError): snapshot file could not be written
//! ```
//!
//! Resolution-phase errors ([`ConfigError`], [`TaskError`]) are raised before
//! any side effect.  Execution-phase errors ([`ResourceError`]) abort the run
//! and leave the snapshot untouched.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum AlterError {
    /// The machine declaration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task resolution failed.
    #[error("Task resolution error: {0}")]
    Task(#[from] TaskError),

    /// A link or command failed while being applied.
    #[error("Provisioning error: {0}")]
    Resource(#[from] ResourceError),

    /// The snapshot of applied state could not be persisted.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Errors that arise while loading the machine declaration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The declaration file could not be read.
    #[error("cannot read declaration {path}: {source}")]
    Io {
        /// Path of the declaration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The declaration is not valid TOML or does not match the schema.
    #[error("malformed declaration {path}: {source}")]
    Parse {
        /// Path of the declaration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A declared value is structurally valid but unusable.
    #[error("invalid declaration: {0}")]
    Invalid(String),
}

/// Errors that arise while resolving the task graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A task depends on a name that is not a declared task.
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownTaskReference {
        /// Task declaring the dependency.
        task: String,
        /// The dependency name that could not be found.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    ///
    /// Holds the sorted names of every task that could not be ordered, which
    /// includes the cycle itself and anything depending on it.
    #[error("circular dependency between tasks: {}", .0.join(", "))]
    CircularDependency(Vec<String>),

    /// A task was requested by name but is not declared.
    #[error("requested task '{0}' is not declared")]
    UnknownTask(String),
}

/// Errors that arise while applying links and commands.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A symlink could not be created or removed.
    #[error("{path}: {reason}")]
    FileSystem {
        /// Path of the link destination involved.
        path: PathBuf,
        /// Human-readable reason, including the underlying cause.
        reason: String,
    },

    /// A command exited non-zero or could not be spawned.
    #[error("command failed ({status}): {command}")]
    CommandExecution {
        /// The command text as declared.
        command: String,
        /// Exit status description (`exit 1`, `signal`, `spawn failed: …`).
        status: String,
    },
}

/// Errors that arise while persisting the snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The snapshot file or its temporary sibling could not be written.
    #[error("cannot write snapshot {path}: {source}")]
    Write {
        /// Path of the snapshot file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("cannot serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}
