//! Content-addressed incremental machine provisioning.
//!
//! A machine is declared as named tasks, each a list of symlinks to create and
//! shell commands to run, with dependencies between tasks.  Every task, link
//! and command is fingerprinted; a run compares the fingerprints against the
//! snapshot of the last successful run and applies only what changed, in
//! dependency order.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: parse the TOML declaration and normalize it into a [`machine::Machine`]
//! - **[`hasher`]**: canonical encoding and SHA-256 fingerprints
//! - **[`snapshot`]**: the persisted record of the last successful run
//! - **[`resources`]**: idempotent `check + apply` primitives (symlinks, commands)
//! - **[`tasks`]**: diffing, ordered application and cleanup
//! - **[`commands`]**: top-level subcommand orchestration (`provision`, `clean`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod hasher;
pub mod logging;
pub mod machine;
pub mod resources;
pub mod snapshot;
pub mod tasks;
