//! Core logging types: task entries, status, and the [`Log`] trait.

/// Tracing target of [`Log::stage`] events, rendered as a stage header.
pub(super) const STAGE_TARGET: &str = "alter::stage";
/// Tracing target of [`Log::dry_run`] events, rendered with a dry-run tag.
pub(super) const DRY_RUN_TARGET: &str = "alter::dry_run";

/// Task result for summary reporting.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    /// Task name as declared.
    pub name: String,
    /// Final status of the task.
    pub status: TaskStatus,
    /// Optional detail message (e.g., previous name or error description).
    pub message: Option<String>,
}

/// Status of a task at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Links or commands were applied (or removed, for `clean`).
    Applied,
    /// Nothing differed from the snapshot.
    UpToDate,
    /// The task matched a snapshot entry stored under another name.
    Renamed,
    /// Changes were detected but not applied because of `--dry-run`.
    DryRun,
    /// A link or command failed.
    Failed,
}

impl TaskStatus {
    /// Short human-readable label used in the summary.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::UpToDate => "up to date",
            Self::Renamed => "renamed",
            Self::DryRun => "dry run",
            Self::Failed => "failed",
        }
    }
}

/// Abstraction over logging backends.
///
/// Engine code logs through this trait so tests can substitute a recorder
/// and the console/file formatting stays in one place.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a task result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}
