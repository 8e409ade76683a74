//! Task dependency graph utilities.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::TaskError;
use crate::machine::Task;

/// Dependency graph: task name → names it depends on.
pub type Graph = BTreeMap<String, BTreeSet<String>>;

/// Build the dependency graph of `tasks`.
pub fn of_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Graph {
    tasks
        .into_iter()
        .map(|t| (t.name.clone(), t.dependencies.clone()))
        .collect()
}

/// Resolve a deterministic execution order using Kahn's algorithm.
///
/// Each round removes every task whose remaining dependencies are satisfied,
/// in lexicographic order, so the result is identical across runs.
///
/// # Errors
///
/// Returns [`TaskError::UnknownTaskReference`] if a task depends on a name
/// that is not in the graph, or [`TaskError::CircularDependency`] with the
/// sorted names of every task that could not be ordered.
pub fn resolve(graph: &Graph) -> Result<Vec<String>, TaskError> {
    check_references(graph)?;

    let mut remaining: BTreeMap<&str, BTreeSet<&str>> = graph
        .iter()
        .map(|(name, deps)| (name.as_str(), deps.iter().map(String::as_str).collect()))
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while !remaining.is_empty() {
        let ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if ready.is_empty() {
            return Err(TaskError::CircularDependency(
                remaining.keys().map(ToString::to_string).collect(),
            ));
        }

        for name in &ready {
            remaining.remove(name);
        }
        for deps in remaining.values_mut() {
            for name in &ready {
                deps.remove(name);
            }
        }
        order.extend(ready.into_iter().map(str::to_string));
    }

    Ok(order)
}

/// Close `requested` over transitive dependencies.
///
/// # Errors
///
/// Returns [`TaskError::UnknownTask`] for the first requested name that is
/// not in the graph.
pub fn select<S: AsRef<str>>(graph: &Graph, requested: &[S]) -> Result<BTreeSet<String>, TaskError> {
    let mut selected = BTreeSet::new();
    let mut stack: Vec<&str> = Vec::new();

    for name in requested {
        let name = name.as_ref();
        if !graph.contains_key(name) {
            return Err(TaskError::UnknownTask(name.to_string()));
        }
        stack.push(name);
    }

    while let Some(name) = stack.pop() {
        if !selected.insert(name.to_string()) {
            continue;
        }
        if let Some(deps) = graph.get(name) {
            stack.extend(deps.iter().map(String::as_str));
        }
    }

    Ok(selected)
}

fn check_references(graph: &Graph) -> Result<(), TaskError> {
    for (task, deps) in graph {
        if let Some(dependency) = deps.iter().find(|d| !graph.contains_key(*d)) {
            return Err(TaskError::UnknownTaskReference {
                task: task.clone(),
                dependency: dependency.clone(),
            });
        }
    }
    Ok(())
}
