//! Provisioning runs over a loaded [`Machine`](crate::machine::Machine).
//!
//! A run compares the machine against its snapshot ([`diff`]), applies the
//! queued links and commands in dependency order ([`apply`]), and commits a
//! new snapshot once everything succeeded ([`provision`]).  [`clean`]
//! removes the links a machine declares.
pub mod apply;
pub mod clean;
mod context;
pub mod diff;
pub mod graph;
pub mod provision;

pub use context::{ApplyOptions, Context};
