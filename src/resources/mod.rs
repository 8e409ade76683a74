//! Side-effecting primitives (check + apply pattern).
pub mod command;
pub(crate) mod helpers {
    pub(crate) mod fs;
}
pub mod symlink;

use crate::error::ResourceError;

/// Minimal interface for resources that can be described, applied, and removed.
///
/// Resources whose state cannot be observed (shell commands) implement only
/// this trait.  Resources that can determine their own state implement the
/// richer [`Resource`] super-trait.
pub trait Applicable {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Apply the resource change.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] describing the filesystem or command
    /// failure.
    fn apply(&self) -> Result<ResourceChange, ResourceError>;

    /// Undo a previous `apply()`.
    ///
    /// The default implementation reports the resource as skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] if removal was attempted and failed.
    fn remove(&self) -> Result<ResourceChange, ResourceError> {
        Ok(ResourceChange::Skipped {
            reason: format!("'{}' cannot be removed", self.description()),
        })
    }
}

/// State of a resource on the machine.
///
/// # Examples
///
/// ```
/// use alter_cli::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "points to /other".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// Description of what is there instead.
        current: String,
    },
}

/// Result of applying or removing a resource.
///
/// # Examples
///
/// ```
/// use alter_cli::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let skipped = ResourceChange::Skipped { reason: "not our link".into() };
///
/// assert_eq!(applied, ResourceChange::Applied);
/// assert_ne!(applied, skipped);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created, updated or removed.
    Applied,
    /// Nothing was done.
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// Unified interface for resources that can be checked and applied.
pub trait Resource: Applicable {
    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState, ResourceError>;

    /// Determine if the resource needs to be changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`current_state`](Self::current_state).
    fn needs_change(&self) -> Result<bool, ResourceError> {
        Ok(self.current_state()? != ResourceState::Correct)
    }
}
