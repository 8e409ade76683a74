//! One provisioning run: select, diff, apply, and commit the snapshot.
use std::collections::{BTreeMap, BTreeSet};

use crate::error::AlterError;
use crate::logging::TaskStatus;
use crate::machine::{Machine, Task};
use crate::snapshot::{MachineSnapshot, SnapshotStore, TaskSnapshot};

use super::apply::{ApplyReport, apply_task};
use super::diff::{self, TaskChange, TaskDiff};
use super::{ApplyOptions, Context, graph};

/// What a provisioning run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Per-task changes, in execution order.
    pub diffs: Vec<TaskDiff>,
    /// Totals over every applied task.
    pub applied: ApplyReport,
    /// Whether a new snapshot was written.
    pub snapshot_written: bool,
}

impl ProvisionReport {
    /// Number of tasks in each change class: `(clean, renamed, new, modified)`.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        self.diffs
            .iter()
            .fold((0, 0, 0, 0), |(c, r, n, m), d| match d.change {
                TaskChange::Clean => (c + 1, r, n, m),
                TaskChange::Renamed { .. } => (c, r + 1, n, m),
                TaskChange::New => (c, r, n + 1, m),
                TaskChange::Modified => (c, r, n, m + 1),
            })
    }
}

/// Resolve `only` to the set of tasks a run touches.
///
/// An empty list selects every task (`None`).
///
/// # Errors
///
/// Returns [`AlterError::Task`] if a requested task is not declared.
pub fn selection(machine: &Machine, only: &[String]) -> Result<Option<BTreeSet<String>>, AlterError> {
    if only.is_empty() {
        return Ok(None);
    }
    Ok(Some(graph::select(
        &graph::of_tasks(machine.tasks.values()),
        only,
    )?))
}

/// Apply `machine`, touching only what changed since the last snapshot.
///
/// The snapshot is written only after every queued entry succeeded, and
/// never in a dry run.
///
/// # Errors
///
/// Returns [`AlterError::Task`] for an unknown `only` name (before any side
/// effect), [`AlterError::Resource`] for the first failing link or command,
/// and [`AlterError::Snapshot`] if the new snapshot cannot be written.
pub fn provision(
    machine: &mut Machine,
    ctx: &Context,
    store: &SnapshotStore,
    only: &[String],
) -> Result<ProvisionReport, AlterError> {
    let selected = selection(machine, only)?;
    let prior = store.load(&machine.name, ctx.log.as_ref());
    let diffs = diff::mark(machine, &prior, selected.as_ref());

    let mut applied = ApplyReport::default();
    for d in &diffs {
        let Some(task) = machine.tasks.get(&d.name) else {
            continue;
        };
        match &d.change {
            TaskChange::Clean => {
                ctx.log.debug(&format!("{}: up to date", d.name));
                ctx.log.record_task(&d.name, TaskStatus::UpToDate, None);
            }
            TaskChange::Renamed { from } => {
                ctx.log
                    .info(&format!("{}: renamed from {from}, nothing to apply", d.name));
                ctx.log
                    .record_task(&d.name, TaskStatus::Renamed, Some(&format!("from {from}")));
            }
            TaskChange::New | TaskChange::Modified => {
                ctx.log.stage(&d.name);
                match apply_task(task, ctx) {
                    Ok(report) => {
                        applied.add(report);
                        let status = if ctx.dry_run {
                            TaskStatus::DryRun
                        } else {
                            TaskStatus::Applied
                        };
                        ctx.log.record_task(&d.name, status, None);
                    }
                    Err(e) => {
                        ctx.log.error(&format!("{}: {e}", d.name));
                        ctx.log
                            .record_task(&d.name, TaskStatus::Failed, Some(&e.to_string()));
                        return Err(e.into());
                    }
                }
            }
        }
    }

    let mut report = ProvisionReport {
        diffs,
        applied,
        snapshot_written: false,
    };

    if ctx.dry_run {
        ctx.log.debug("dry run: snapshot not written");
        return Ok(report);
    }

    let next = next_snapshot(
        machine,
        &prior,
        &report.diffs,
        ctx.options,
        selected.as_ref(),
    );
    if next == prior {
        ctx.log.debug("snapshot unchanged");
        return Ok(report);
    }

    store
        .save(&machine.name, next, ctx.log.as_ref())
        .inspect_err(|_| {
            ctx.log
                .warn("everything was applied but the snapshot could not be saved; the next run may re-apply entries");
        })?;
    ctx.log
        .debug(&format!("snapshot written to {}", store.path().display()));
    report.snapshot_written = true;
    Ok(report)
}

/// Build the snapshot recording this run.
///
/// Tasks outside the run keep their prior entry; tasks in the run record
/// every entry that is clean or was applied.  A task with disabled queued
/// entries is recorded with an empty task hash so it is compared entry by
/// entry next time.
///
/// Entries of tasks no longer declared are dropped after a full run.  After
/// a run restricted to `selected` they are kept unless a task of the run
/// was renamed from them, so a later full run can still claim them.
#[must_use]
pub fn next_snapshot(
    machine: &Machine,
    prior: &MachineSnapshot,
    diffs: &[TaskDiff],
    options: ApplyOptions,
    selected: Option<&BTreeSet<String>>,
) -> MachineSnapshot {
    let in_run: BTreeSet<&str> = diffs.iter().map(|d| d.name.as_str()).collect();

    let mut tasks: BTreeMap<String, TaskSnapshot> = machine
        .ordered()
        .filter_map(|task| {
            let entry = if in_run.contains(task.name.as_str()) {
                Some(record(task, options))
            } else {
                prior.tasks.get(&task.name).cloned()
            };
            entry.map(|e| (task.name.clone(), e))
        })
        .collect();

    if selected.is_some() {
        let claimed: BTreeSet<&str> = diffs
            .iter()
            .filter_map(|d| match &d.change {
                TaskChange::Renamed { from } => Some(from.as_str()),
                _ => None,
            })
            .collect();
        for (name, entry) in &prior.tasks {
            if !machine.tasks.contains_key(name) && !claimed.contains(name.as_str()) {
                tasks.insert(name.clone(), entry.clone());
            }
        }
    }

    MachineSnapshot::from_tasks(tasks)
}

fn record(task: &Task, options: ApplyOptions) -> TaskSnapshot {
    let link_done = |queued: bool| !queued || options.links;
    let command_done = |queued: bool| !queued || options.commands;

    let link_hashes: Vec<String> = task
        .links
        .iter()
        .filter(|l| link_done(l.queued))
        .map(|l| l.hash.clone())
        .collect();
    let command_hashes: Vec<String> = task
        .commands
        .iter()
        .filter(|c| command_done(c.queued))
        .map(|c| c.hash.clone())
        .collect();

    let complete =
        link_hashes.len() == task.links.len() && command_hashes.len() == task.commands.len();

    TaskSnapshot {
        task_hash: if complete {
            task.hash.clone()
        } else {
            String::new()
        },
        link_hashes,
        command_hashes,
    }
}
