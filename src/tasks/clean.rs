//! Removal of the links a machine declares.
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AlterError, ResourceError, TaskError};
use crate::logging::TaskStatus;
use crate::machine::{Machine, Task};
use crate::resources::symlink::SymlinkResource;
use crate::resources::{Applicable, Resource, ResourceChange};
use crate::snapshot::{MachineSnapshot, SnapshotStore};

use super::Context;

/// What a clean run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Links removed (or that would be, in a dry run).
    pub removed: usize,
    /// Destinations left alone because they are not our link.
    pub skipped: usize,
    /// Whether snapshot entries were dropped.
    pub snapshot_cleared: bool,
}

/// Remove every declared link that still points at its target, in reverse
/// task order, then forget the snapshot entries of the cleaned tasks.
///
/// `only` names the tasks to clean; dependencies are not included.  An empty
/// list cleans the whole machine and drops its snapshot entry.
///
/// # Errors
///
/// Returns [`AlterError::Task`] for an unknown `only` name,
/// [`AlterError::Resource`] if a link cannot be inspected or removed, and
/// [`AlterError::Snapshot`] if the snapshot cannot be rewritten.
pub fn clean(
    machine: &Machine,
    ctx: &Context,
    store: &SnapshotStore,
    only: &[String],
) -> Result<CleanReport, AlterError> {
    let selected = validate(machine, only)?;
    let mut report = CleanReport::default();

    let tasks = machine
        .order
        .iter()
        .rev()
        .filter_map(|name| machine.tasks.get(name))
        .filter(|t| selected.as_ref().is_none_or(|s| s.contains(&t.name)));
    for task in tasks {
        ctx.log.stage(&task.name);
        match clean_task(task, ctx) {
            Ok((removed, skipped)) => {
                report.removed += removed;
                report.skipped += skipped;
                let status = if ctx.dry_run {
                    TaskStatus::DryRun
                } else if removed == 0 {
                    TaskStatus::UpToDate
                } else {
                    TaskStatus::Applied
                };
                ctx.log.record_task(&task.name, status, None);
            }
            Err(e) => {
                ctx.log.error(&format!("{}: {e}", task.name));
                ctx.log
                    .record_task(&task.name, TaskStatus::Failed, Some(&e.to_string()));
                return Err(e.into());
            }
        }
    }

    if ctx.dry_run {
        ctx.log.debug("dry run: snapshot not modified");
        return Ok(report);
    }

    report.snapshot_cleared = match selected {
        None => store.remove(&machine.name, ctx.log.as_ref())?,
        Some(names) => forget(machine, store, &names, ctx)?,
    };
    Ok(report)
}

fn validate(machine: &Machine, only: &[String]) -> Result<Option<BTreeSet<String>>, TaskError> {
    if only.is_empty() {
        return Ok(None);
    }
    only.iter()
        .map(|name| {
            if machine.tasks.contains_key(name) {
                Ok(name.clone())
            } else {
                Err(TaskError::UnknownTask(name.clone()))
            }
        })
        .collect::<Result<BTreeSet<_>, _>>()
        .map(Some)
}

/// Remove the links of one task in reverse declaration order.
fn clean_task(task: &Task, ctx: &Context) -> Result<(usize, usize), ResourceError> {
    let (mut removed, mut skipped) = (0, 0);
    for link in task.links.iter().rev() {
        let resource = SymlinkResource::from_link(link, ctx.options.link_options());
        if ctx.dry_run {
            if resource.needs_change()? {
                ctx.log
                    .debug(&format!("skipping {}: not linked", resource.description()));
                skipped += 1;
            } else {
                ctx.log
                    .dry_run(&format!("would remove {}", resource.destination.display()));
                removed += 1;
            }
            continue;
        }
        match resource.remove()? {
            ResourceChange::Applied => {
                ctx.log
                    .info(&format!("removed {}", resource.destination.display()));
                removed += 1;
            }
            ResourceChange::Skipped { reason } => {
                ctx.log.debug(&format!(
                    "skipping {}: {reason}",
                    resource.description()
                ));
                skipped += 1;
            }
        }
    }
    Ok((removed, skipped))
}

/// Drop the entries of `names` from the machine's snapshot.
fn forget(
    machine: &Machine,
    store: &SnapshotStore,
    names: &BTreeSet<String>,
    ctx: &Context,
) -> Result<bool, AlterError> {
    let prior = store.load(&machine.name, ctx.log.as_ref());
    let tasks: BTreeMap<_, _> = prior
        .tasks
        .iter()
        .filter(|(name, _)| !names.contains(*name))
        .map(|(name, entry)| (name.clone(), entry.clone()))
        .collect();
    if tasks.len() == prior.tasks.len() {
        return Ok(false);
    }
    store.save(
        &machine.name,
        MachineSnapshot::from_tasks(tasks),
        ctx.log.as_ref(),
    )?;
    Ok(true)
}
