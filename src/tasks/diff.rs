//! Comparison of the declared machine against its last applied snapshot.
//!
//! Marks every link, command and task as queued or clean and detects tasks
//! that were renamed without changing content.
use std::collections::BTreeSet;

use crate::machine::{Machine, Task};
use crate::snapshot::{MachineSnapshot, TaskSnapshot};

/// How a task differs from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskChange {
    /// Identical to the stored entry of the same name.
    Clean,
    /// Identical to a stored entry under another name.
    Renamed {
        /// Name the entry was stored under.
        from: String,
    },
    /// No stored entry matched; everything is queued.
    New,
    /// Stored under the same name with different content; only the links
    /// and commands missing from the stored entry are queued.
    Modified,
}

/// Diff result for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDiff {
    /// Task name.
    pub name: String,
    /// How it differs from the snapshot.
    pub change: TaskChange,
}

/// Set the `queued` flags on `machine` and report per-task changes.
///
/// Only tasks in `selection` (every task when `None`) are compared; the
/// result follows the machine's resolved order.
pub fn mark(
    machine: &mut Machine,
    snapshot: &MachineSnapshot,
    selection: Option<&BTreeSet<String>>,
) -> Vec<TaskDiff> {
    for task in machine.tasks.values_mut() {
        task.queue_all(false);
    }

    let selected: Vec<String> = machine
        .order
        .iter()
        .filter(|name| selection.is_none_or(|s| s.contains(*name)))
        .cloned()
        .collect();

    if selection.is_none() && machine.hash() == snapshot.machine_hash {
        return selected
            .into_iter()
            .map(|name| TaskDiff {
                name,
                change: TaskChange::Clean,
            })
            .collect();
    }

    let declared: BTreeSet<String> = machine.tasks.keys().cloned().collect();
    let mut claimed: BTreeSet<&str> = BTreeSet::new();
    let mut diffs = Vec::with_capacity(selected.len());

    for name in selected {
        let Some(task) = machine.tasks.get_mut(&name) else {
            continue;
        };

        let change = match snapshot.tasks.get(&name) {
            Some(entry) if entry.task_hash == task.hash => TaskChange::Clean,
            Some(entry) => {
                mark_modified(task, entry);
                TaskChange::Modified
            }
            None => {
                let renamed = snapshot.tasks.iter().find(|(stored, entry)| {
                    !declared.contains(*stored)
                        && !claimed.contains(stored.as_str())
                        && entry.task_hash == task.hash
                });
                if let Some((from, _)) = renamed {
                    claimed.insert(from.as_str());
                    TaskChange::Renamed { from: from.clone() }
                } else {
                    task.queue_all(true);
                    TaskChange::New
                }
            }
        };

        diffs.push(TaskDiff { name, change });
    }

    diffs
}

fn mark_modified(task: &mut Task, entry: &TaskSnapshot) {
    task.queued = true;
    for link in &mut task.links {
        link.queued = !entry.has_link(&link.hash);
    }
    for command in &mut task.commands {
        command.queued = !entry.has_command(&command.hash);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::machine::{Command, Link};
    use crate::tasks::test_helpers::machine;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn link(name: &str) -> Link {
        Link::new(
            PathBuf::from(format!("/repo/{name}")),
            PathBuf::from(format!("/home/u/.{name}")),
            false,
        )
    }

    fn task(name: &str, links: &[&str], commands: &[&str]) -> Task {
        Task::new(
            name,
            Vec::new(),
            links.iter().map(|l| link(l)).collect(),
            commands.iter().map(|c| Command::new(*c)).collect(),
        )
    }

    /// Snapshot recording every entry of `tasks` as applied.
    fn applied(tasks: &[&Task]) -> MachineSnapshot {
        MachineSnapshot::from_tasks(
            tasks
                .iter()
                .map(|t| {
                    (
                        t.name.clone(),
                        TaskSnapshot {
                            task_hash: t.hash.clone(),
                            link_hashes: t.links.iter().map(|l| l.hash.clone()).collect(),
                            command_hashes: t.commands.iter().map(|c| c.hash.clone()).collect(),
                        },
                    )
                })
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn changes(diffs: &[TaskDiff]) -> Vec<(&str, TaskChange)> {
        diffs
            .iter()
            .map(|d| (d.name.as_str(), d.change.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // fast path and clean
    // -----------------------------------------------------------------------

    #[test]
    fn unchanged_machine_is_clean() {
        let t = task("shell", &["zshrc"], &["echo hi"]);
        let snap = applied(&[&t]);
        let mut m = machine(vec![t]);
        let diffs = mark(&mut m, &snap, None);
        assert_eq!(changes(&diffs), vec![("shell", TaskChange::Clean)]);
        assert_eq!(m.tasks["shell"].queued_count(), 0);
    }

    #[test]
    fn empty_snapshot_queues_everything() {
        let mut m = machine(vec![task("shell", &["zshrc"], &["a", "b"])]);
        let diffs = mark(&mut m, &MachineSnapshot::default(), None);
        assert_eq!(changes(&diffs), vec![("shell", TaskChange::New)]);
        assert!(m.tasks["shell"].queued);
        assert_eq!(m.tasks["shell"].queued_count(), 3);
    }

    #[test]
    fn same_name_same_hash_is_clean_when_others_change() {
        let base = task("base", &[], &["echo base"]);
        let snap = applied(&[&base]);
        let mut m = machine(vec![base, task("extra", &[], &["echo extra"])]);
        let diffs = mark(&mut m, &snap, None);
        assert_eq!(
            changes(&diffs),
            vec![("base", TaskChange::Clean), ("extra", TaskChange::New)]
        );
        assert!(!m.tasks["base"].queued);
    }

    // -----------------------------------------------------------------------
    // modified
    // -----------------------------------------------------------------------

    #[test]
    fn changed_command_queues_only_that_command() {
        let before = task("shell", &["zshrc", "zshenv"], &["echo one", "echo two"]);
        let snap = applied(&[&before]);
        let after = task("shell", &["zshrc", "zshenv"], &["echo one", "echo three"]);
        let mut m = machine(vec![after]);

        let diffs = mark(&mut m, &snap, None);
        assert_eq!(changes(&diffs), vec![("shell", TaskChange::Modified)]);

        let shell = &m.tasks["shell"];
        assert!(shell.queued);
        assert!(shell.links.iter().all(|l| !l.queued));
        assert!(!shell.commands[0].queued);
        assert!(shell.commands[1].queued);
    }

    #[test]
    fn added_link_queues_only_that_link() {
        let before = task("shell", &["zshrc"], &["echo"]);
        let snap = applied(&[&before]);
        let mut m = machine(vec![task("shell", &["zshrc", "vimrc"], &["echo"])]);

        mark(&mut m, &snap, None);
        let shell = &m.tasks["shell"];
        assert!(!shell.links[0].queued);
        assert!(shell.links[1].queued);
        assert!(!shell.commands[0].queued);
    }

    #[test]
    fn partial_entry_requeues_missing_entries() {
        let t = task("shell", &["zshrc"], &["echo"]);
        let mut snap = applied(&[&t]);
        let entry = snap.tasks.get_mut("shell").unwrap();
        entry.task_hash = String::new();
        entry.link_hashes.clear();
        let mut m = machine(vec![t]);

        let diffs = mark(&mut m, &snap, None);
        assert_eq!(changes(&diffs), vec![("shell", TaskChange::Modified)]);
        assert!(m.tasks["shell"].links[0].queued);
        assert!(!m.tasks["shell"].commands[0].queued);
    }

    // -----------------------------------------------------------------------
    // rename detection
    // -----------------------------------------------------------------------

    #[test]
    fn rename_is_detected_by_hash() {
        let old = task("a", &["zshrc"], &["echo"]);
        let snap = applied(&[&old]);
        let mut m = machine(vec![task("b", &["zshrc"], &["echo"])]);

        let diffs = mark(&mut m, &snap, None);
        assert_eq!(
            changes(&diffs),
            vec![(
                "b",
                TaskChange::Renamed {
                    from: "a".to_string()
                }
            )]
        );
        assert_eq!(m.tasks["b"].queued_count(), 0);
    }

    #[test]
    fn still_declared_entry_is_not_a_rename_candidate() {
        let a = task("a", &[], &["echo"]);
        let snap = applied(&[&a]);
        let mut m = machine(vec![a, task("b", &[], &["echo"])]);

        let diffs = mark(&mut m, &snap, None);
        assert_eq!(
            changes(&diffs),
            vec![("a", TaskChange::Clean), ("b", TaskChange::New)]
        );
    }

    #[test]
    fn one_stored_entry_is_claimed_by_one_rename() {
        let old = task("old", &[], &["echo"]);
        let snap = applied(&[&old]);
        let mut m = machine(vec![task("x", &[], &["echo"]), task("y", &[], &["echo"])]);

        let diffs = mark(&mut m, &snap, None);
        assert_eq!(
            changes(&diffs),
            vec![
                (
                    "x",
                    TaskChange::Renamed {
                        from: "old".to_string()
                    }
                ),
                ("y", TaskChange::New),
            ]
        );
    }

    #[test]
    fn rename_picks_first_stored_name() {
        let one = task("one", &[], &["echo"]);
        let two = task("two", &[], &["echo"]);
        let snap = applied(&[&one, &two]);
        let mut m = machine(vec![task("three", &[], &["echo"])]);

        let diffs = mark(&mut m, &snap, None);
        assert_eq!(
            diffs[0].change,
            TaskChange::Renamed {
                from: "one".to_string()
            }
        );
    }

    // -----------------------------------------------------------------------
    // selection
    // -----------------------------------------------------------------------

    #[test]
    fn selection_limits_compared_tasks() {
        let mut m = machine(vec![task("a", &[], &["x"]), task("b", &[], &["y"])]);
        let only = BTreeSet::from(["b".to_string()]);
        let diffs = mark(&mut m, &MachineSnapshot::default(), Some(&only));
        assert_eq!(changes(&diffs), vec![("b", TaskChange::New)]);
        assert!(!m.tasks["a"].queued);
    }

    #[test]
    fn selection_skips_fast_path() {
        let t = task("a", &[], &["x"]);
        let snap = applied(&[&t]);
        let mut m = machine(vec![t]);
        let only = BTreeSet::from(["a".to_string()]);
        let diffs = mark(&mut m, &snap, Some(&only));
        assert_eq!(changes(&diffs), vec![("a", TaskChange::Clean)]);
    }

    #[test]
    fn marking_resets_previous_flags() {
        let t = task("a", &["l"], &["x"]);
        let snap = applied(&[&t]);
        let mut m = machine(vec![t]);
        m.tasks.get_mut("a").unwrap().queue_all(true);
        mark(&mut m, &snap, None);
        assert_eq!(m.tasks["a"].queued_count(), 0);
    }
}
