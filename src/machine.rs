//! Provisioning data model: machines, tasks, links and commands.
//!
//! Entities are built from an already-normalized declaration (see
//! [`crate::config`]).  Each entity's hash is computed once at construction;
//! the `queued` flags are per-run state owned by the diff engine.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::hasher::{self, Field, Fingerprint, MachineDigest};

/// A symbolic link to create: `destination` → `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Absolute path the link points at.
    pub target: PathBuf,
    /// Absolute path where the link is created.
    pub destination: PathBuf,
    /// Whether `target` is managed by the encryption collaborator.
    pub encrypted: bool,
    /// Content fingerprint of `target`, `destination` and `encrypted`.
    pub hash: String,
    /// Whether this run will (re)create the link.
    pub queued: bool,
}

impl Link {
    /// Create a link and compute its hash.
    #[must_use]
    pub fn new(target: PathBuf, destination: PathBuf, encrypted: bool) -> Self {
        let mut link = Self {
            target,
            destination,
            encrypted,
            hash: String::new(),
            queued: false,
        };
        link.hash = hasher::digest(&link);
        link
    }
}

impl Fingerprint for Link {
    const KIND: &'static str = "link";

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("target", path_field(&self.target)),
            ("destination", path_field(&self.destination)),
            ("encrypted", Field::Bool(self.encrypted)),
        ]
    }
}

fn path_field(path: &Path) -> Field<'_> {
    // Non-UTF-8 paths cannot be expressed in the TOML declaration.
    Field::Str(path.to_str().unwrap_or_default())
}

/// A shell command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command text, passed verbatim to the shell.
    pub text: String,
    /// Content fingerprint of `text`.
    pub hash: String,
    /// Whether this run will execute the command.
    pub queued: bool,
}

impl Command {
    /// Create a command and compute its hash.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let mut command = Self {
            text: text.into(),
            hash: String::new(),
            queued: false,
        };
        command.hash = hasher::digest(&command);
        command
    }
}

impl Fingerprint for Command {
    const KIND: &'static str = "command";

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("text", Field::Str(&self.text))]
    }
}

/// A named unit of work: links then commands, after its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique name within the machine.
    pub name: String,
    /// Names of tasks that must be applied first.
    pub dependencies: BTreeSet<String>,
    /// Links in declared order.
    pub links: Vec<Link>,
    /// Commands in declared order.
    pub commands: Vec<Command>,
    /// Fingerprint over dependencies, link hashes and command hashes.
    pub hash: String,
    /// Whether the task is new or modified in this run.
    pub queued: bool,
}

impl Task {
    /// Create a task and compute its hash.
    ///
    /// The name does not participate in the hash, which is what allows a
    /// renamed task to be recognised by content.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        dependencies: impl IntoIterator<Item = String>,
        links: Vec<Link>,
        commands: Vec<Command>,
    ) -> Self {
        let mut task = Self {
            name: name.into(),
            dependencies: dependencies.into_iter().collect(),
            links,
            commands,
            hash: String::new(),
            queued: false,
        };
        task.hash = hasher::digest(&task);
        task
    }

    /// Look up a link by hash.
    #[must_use]
    pub fn link(&self, hash: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.hash == hash)
    }

    /// Look up a command by hash.
    #[must_use]
    pub fn command(&self, hash: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.hash == hash)
    }

    /// Set the `queued` flag on the task and every link and command.
    pub fn queue_all(&mut self, queued: bool) {
        self.queued = queued;
        for link in &mut self.links {
            link.queued = queued;
        }
        for command in &mut self.commands {
            command.queued = queued;
        }
    }

    /// Number of links and commands queued for this run.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.links.iter().filter(|l| l.queued).count()
            + self.commands.iter().filter(|c| c.queued).count()
    }
}

impl Fingerprint for Task {
    const KIND: &'static str = "task";

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        // BTreeSet iteration is sorted and de-duplicated: declaration order of
        // dependencies does not affect the hash.
        let dependencies = self.dependencies.iter().map(|d| Field::Str(d)).collect();
        let links = self.links.iter().map(|l| Field::Str(&l.hash)).collect();
        let commands = self.commands.iter().map(|c| Field::Str(&c.hash)).collect();
        vec![
            ("dependencies", Field::List(dependencies)),
            ("links", Field::List(links)),
            ("commands", Field::List(commands)),
        ]
    }
}

/// A fully loaded machine declaration with its resolved task order.
#[derive(Debug, Clone)]
pub struct Machine {
    /// Machine name, used as the snapshot key.
    pub name: String,
    /// Expanded environment variables exported to every command.
    pub environment: BTreeMap<String, String>,
    /// Tasks by name.
    pub tasks: BTreeMap<String, Task>,
    /// Task names in dependency-respecting execution order.
    pub order: Vec<String>,
}

impl Machine {
    /// Aggregate fingerprint over every task's name and hash.
    #[must_use]
    pub fn hash(&self) -> String {
        hasher::digest(&MachineDigest::new(
            self.tasks
                .values()
                .map(|t| (t.name.as_str(), t.hash.as_str())),
        ))
    }

    /// Tasks in resolved order.
    pub fn ordered(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }
}
